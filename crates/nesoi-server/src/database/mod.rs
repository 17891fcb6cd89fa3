//! # Nesoi Database Handle
//!
//! The [`Database`] is what every connection shares: one KV driver, one
//! read-only system variable table, and the registry of open connections.
//! Everything else is per connection and lives in a
//! [`nesoi_sql::Session`].
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Database                     │
//! │  ┌─────────────┐ ┌───────────┐ ┌───────────┐ │
//! │  │ KvDriver    │ │ SysVars   │ │ Registry  │ │
//! │  └─────────────┘ └───────────┘ └───────────┘ │
//! │         │              │                      │
//! │         └──────┬───────┘                      │
//! │                ▼                              │
//! │   Session (current db, counters)  x N         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let db = Database::open_memory()?;
//! let (id, mut session) = db.open_session(None)?;
//! session.execute("SELECT @@version_comment")?;
//! db.close_session(id);
//! ```

mod engine;
mod error;

pub use engine::{ConnectionId, ConnectionInfo, Database, DatabaseConfig, DatabaseStats};
pub use error::{DatabaseError, DatabaseResult};
