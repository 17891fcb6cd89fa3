//! Error taxonomy for statement execution.
//!
//! Every component returns the first error it meets and the statement is
//! abandoned at that point. Writes already issued to the KV store stay
//! applied. End of stream is `Ok(None)` from an operator, never an error.

use nesoi_kv::KvError;
use thiserror::Error;

use crate::parser::ParseError;

/// Errors produced while resolving, planning or executing a statement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqlError {
    /// A key the caller required is absent from the KV store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unknown database, table, column, index or variable, or a malformed
    /// catalog entry.
    #[error("schema error: {0}")]
    Schema(String),

    /// A literal does not match the declared column type.
    #[error("type error: {0}")]
    Type(String),

    /// No value for a NOT NULL or primary key column.
    #[error("column '{0}' cannot be null")]
    NullConstraint(String),

    /// A row with the same primary key already exists.
    #[error("duplicate entry for primary key: {0}")]
    DuplicateKey(String),

    /// A unique index already holds the value, or the index itself exists.
    #[error("duplicate index entry: {0}")]
    DuplicateIndex(String),

    /// The statement shape is not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The KV driver failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The statement text could not be parsed.
    #[error("{0}")]
    Parse(String),
}

impl SqlError {
    /// MySQL error number reported to clients for this error.
    pub fn code(&self) -> u16 {
        match self {
            SqlError::NotFound(_) => 1032,
            SqlError::Schema(_) => 1146,
            SqlError::Type(_) => 1366,
            SqlError::NullConstraint(_) => 1048,
            SqlError::DuplicateKey(_) | SqlError::DuplicateIndex(_) => 1062,
            SqlError::Unsupported(_) => 1235,
            SqlError::Storage(_) => 1030,
            SqlError::Parse(_) => 1064,
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        SqlError::Schema(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        SqlError::Unsupported(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        SqlError::Storage(format!("corrupt value: {}", msg.into()))
    }

    pub(crate) fn corrupt(what: impl std::fmt::Display) -> Self {
        SqlError::Schema(format!("malformed catalog entry: {}", what))
    }
}

impl From<KvError> for SqlError {
    fn from(e: KvError) -> Self {
        SqlError::Storage(e.to_string())
    }
}

impl From<ParseError> for SqlError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Unsupported(msg) => SqlError::Unsupported(msg),
            other => SqlError::Parse(other.to_string()),
        }
    }
}

/// Result type for statement execution.
pub type SqlResult<T> = Result<T, SqlError>;
