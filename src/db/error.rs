use thiserror::Error;

/// Errors raised by the data access layer.
///
/// Any of these during a cleanup round is confined to the table being
/// processed; the round moves on to the next table.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not configured")]
    NotConfigured,

    #[error("Invalid timestamp '{value}' in {table}.{column}: {source}")]
    InvalidTimestamp {
        table: String,
        column: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[cfg(any(
        feature = "database-mysql",
        feature = "database-postgres",
        feature = "database-sqlite"
    ))]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;
