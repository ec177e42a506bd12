use thiserror::Error;

use crate::connection::DbError;

/// Failure of a single write operation. Every variant aborts the remainder
/// of the write; nothing is retried.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Rejected before any database interaction.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported value for column '{column}': {found} is not a scalar")]
    UnsupportedScalar { column: String, found: &'static str },

    #[error("Reading schema of table {table} failed: {source}")]
    SchemaRead {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Schema change on table {table} rejected: {source} (statement: {statement})")]
    Ddl {
        table: String,
        statement: String,
        #[source]
        source: DbError,
    },

    #[error("Table {table} doesn't exist.")]
    TableMissing { table: String },

    #[error("Insert into {table} failed: {source}")]
    Insert {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Transaction {action} failed: {source}")]
    Transaction {
        action: &'static str,
        #[source]
        source: DbError,
    },
}

pub type WriteResult<T> = Result<T, WriteError>;
