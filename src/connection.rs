//! Database connection capability consumed by the write pipeline.
//!
//! The pipeline never opens, pools or authenticates connections; it is handed
//! something implementing [`Connection`] and drives it through statements with
//! positional `?` placeholders. [`SqliteConnection`] is the bundled backend.
//! Other engines (e.g. MySQL) plug in by implementing the trait over their
//! driver and reporting the matching [`Dialect`].

use std::path::Path;

use log::debug;
use rusqlite::{
    OpenFlags, ToSql,
    params_from_iter,
    types::{ToSqlOutput, ValueRef},
};
use thiserror::Error;

use crate::{dialect::Dialect, kind::Scalar};

/// One result row or one set of bound parameters.
pub type Row = Vec<Option<Scalar>>;

#[derive(Debug, Error)]
pub enum DbError {
    /// The engine reported that the referenced table does not exist
    /// (MySQL error 1146, SQLite "no such table").
    #[error("{0}")]
    NoSuchTable(String),

    #[error("{0}")]
    Engine(String),
}

pub trait Connection {
    fn dialect(&self) -> Dialect;

    /// Executes one statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Option<Scalar>]) -> Result<usize, DbError>;

    /// Executes one statement once per parameter row.
    fn execute_many(&mut self, sql: &str, rows: &[Row]) -> Result<(), DbError>;

    /// Runs a query and returns every row.
    fn query(&mut self, sql: &str, params: &[Option<Scalar>]) -> Result<Vec<Row>, DbError>;

    /// Runs a query and returns its first row, if any.
    fn query_one(&mut self, sql: &str, params: &[Option<Scalar>]) -> Result<Option<Row>, DbError> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    fn begin(&mut self) -> Result<(), DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;
}

/// SQLite backend over `rusqlite`.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        debug!("Opening SQLite database {path:?}");
        Ok(Self {
            conn: rusqlite::Connection::open(path)?,
        })
    }

    /// Opens an existing database without write access; a missing file is
    /// an error rather than a new empty database.
    pub fn open_read_only(path: &Path) -> Result<Self, DbError> {
        debug!("Opening SQLite database {path:?} read-only");
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(Self {
            conn: rusqlite::Connection::open_with_flags(path, flags)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self {
            conn: rusqlite::Connection::open_in_memory()?,
        })
    }

    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[Option<Scalar>]) -> Result<usize, DbError> {
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    fn execute_many(&mut self, sql: &str, rows: &[Row]) -> Result<(), DbError> {
        let mut statement = self.conn.prepare(sql)?;
        for row in rows {
            statement.execute(params_from_iter(row.iter()))?;
        }
        Ok(())
    }

    fn query(&mut self, sql: &str, params: &[Option<Scalar>]) -> Result<Vec<Row>, DbError> {
        let mut statement = self.conn.prepare(sql)?;
        let width = statement.column_count();
        let mut rows = statement.query(params_from_iter(params.iter()))?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(scalar_from_sqlite(row.get_ref(idx)?));
            }
            collected.push(values);
        }
        Ok(collected)
    }

    fn begin(&mut self) -> Result<(), DbError> {
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if message.contains("no such table") {
            DbError::NoSuchTable(message)
        } else {
            DbError::Engine(message)
        }
    }
}

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Integer(value) => ToSqlOutput::from(*value),
            Scalar::Float(value) => ToSqlOutput::from(*value),
            Scalar::Text(value) => ToSqlOutput::from(value.as_str()),
        })
    }
}

fn scalar_from_sqlite(value: ValueRef<'_>) -> Option<Scalar> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(Scalar::Integer(value)),
        ValueRef::Real(value) => Some(Scalar::Float(value)),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(Scalar::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }
}
