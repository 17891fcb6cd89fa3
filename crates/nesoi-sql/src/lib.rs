//! # nesoi-sql
//!
//! Query resolution, planning and execution for Nesoi, a MySQL-compatible
//! relational front end over a key-value store.
//!
//! This crate implements:
//! - Row, key and index entry encoding over the KV store
//! - Catalog access and DDL
//! - Statement parsing (MySQL dialect) and name resolution
//! - Plan construction with primary key point lookups
//! - Volcano-style execution with secondary index maintenance
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use nesoi_kv::MemoryDriver;
//! use nesoi_sql::{Session, SessionConfig, SystemVariables};
//!
//! let driver = Arc::new(MemoryDriver::new());
//! let mut session = Session::new(driver, Arc::new(SystemVariables::defaults()), SessionConfig::default());
//!
//! session.execute("CREATE DATABASE Nesoi").unwrap();
//! session.execute("CREATE TABLE t (id INT PRIMARY KEY, name STRING)").unwrap();
//! session.execute("INSERT INTO t VALUES (1, 'a')").unwrap();
//!
//! let results = session.execute("SELECT name FROM t WHERE id = 1").unwrap();
//! assert_eq!(results[0].rows.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error taxonomy
pub mod error;

/// Datums, records and table metadata
pub mod types;

/// Binary layout of rows, keys and index entries
pub mod encoding;

/// SQL text to statement tree
pub mod parser;

/// Catalog accessor and DDL
pub mod catalog;

/// Name resolution
pub mod analyzer;

/// Plan construction
pub mod planner;

/// Pull-based operators and index maintenance
pub mod executor;

/// Result streams and column metadata
pub mod result;

/// Per-connection statement pipeline
pub mod session;

/// Read-only system variables
pub mod sysvar;

pub use error::{SqlError, SqlResult};
pub use result::{ColumnMeta, ResultSet};
pub use session::{BatchOutcome, Session, SessionConfig};
pub use sysvar::SystemVariables;
pub use types::{ColumnDef, Datum, Record, ScalarType, TableInfo};
