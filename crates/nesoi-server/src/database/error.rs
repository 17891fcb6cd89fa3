//! Database error types.

use nesoi_sql::SqlError;
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A statement failed.
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// The connection limit is reached.
    #[error("too many connections (limit {0})")]
    TooManyConnections(usize),
}

impl DatabaseError {
    /// MySQL error number reported to clients.
    pub fn code(&self) -> u16 {
        match self {
            DatabaseError::Sql(e) => e.code(),
            DatabaseError::TooManyConnections(_) => 1040,
        }
    }
}

/// Database result type.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
