//! # nesoi-server
//!
//! Network server and shared database handle for Nesoi.
//!
//! This crate provides:
//!
//! - **Database**: the KV driver, system variables and connection registry
//!   shared by every client. Each connection gets its own
//!   [`nesoi_sql::Session`].
//!
//! - **Server**: a line-oriented TCP front end. Each line is a statement
//!   batch; results come back as tab-separated rows.
//!
//! # Quick Start
//!
//! ```
//! use nesoi_server::Database;
//!
//! let db = Database::open_memory().unwrap();
//! db.execute("CREATE TABLE users (id INT PRIMARY KEY, name TEXT)").unwrap();
//! db.execute("INSERT INTO users VALUES (1, 'Alice')").unwrap();
//!
//! let results = db.execute("SELECT name FROM users WHERE id = 1").unwrap();
//! assert_eq!(results[0].len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared database handle and connection registry.
pub mod database;

/// Line-oriented TCP front end.
pub mod server;

/// Server configuration.
pub mod config;

pub use config::{ConfigError, ConfigResult, ServerConfig, ServerConfigBuilder};
pub use database::{
    ConnectionId, ConnectionInfo, Database, DatabaseConfig, DatabaseError, DatabaseResult,
    DatabaseStats,
};
pub use server::Server;
