#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use scriba::{
    Connection, DbError, Dialect, Scalar,
    connection::Row,
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a (not yet created) SQLite database inside the workspace.
    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("scriba.db")
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Scripted MySQL-flavoured connection that records every statement.
///
/// The catalog holds at most one table; its layout is what `DESCRIBE`
/// returns. Statements are only recorded, never interpreted, so the layout
/// does not change after DDL.
pub struct RecordingConnection {
    columns: Option<Vec<(String, String)>>,
    fail_containing: Option<String>,
    describe_denied: bool,
    table_missing_at_insert: bool,
    pub log: Vec<String>,
    pub inserted: Vec<Row>,
}

impl RecordingConnection {
    pub fn without_table() -> Self {
        Self {
            columns: None,
            fail_containing: None,
            describe_denied: false,
            table_missing_at_insert: false,
            log: Vec::new(),
            inserted: Vec::new(),
        }
    }

    pub fn with_table(columns: &[(&str, &str)]) -> Self {
        let mut conn = Self::without_table();
        conn.columns = Some(
            columns
                .iter()
                .map(|(name, native)| (name.to_string(), native.to_string()))
                .collect(),
        );
        conn
    }

    /// Rejects any executed statement containing `fragment`, the way MySQL
    /// rejects a conversion it cannot make.
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_containing = Some(fragment.to_string());
        self
    }

    /// Fails `DESCRIBE` with a privilege error while the catalog still
    /// reports the table.
    pub fn denying_describe(mut self) -> Self {
        self.describe_denied = true;
        self
    }

    /// Reports error 1146 from the insert, as if the table was dropped
    /// concurrently.
    pub fn dropping_table_before_insert(mut self) -> Self {
        self.table_missing_at_insert = true;
        self
    }

    fn check(&self, sql: &str) -> Result<(), DbError> {
        match &self.fail_containing {
            Some(fragment) if sql.contains(fragment.as_str()) => Err(DbError::Engine(format!(
                "1366: Incorrect integer value for statement '{sql}'"
            ))),
            _ => Ok(()),
        }
    }
}

impl Connection for RecordingConnection {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn execute(&mut self, sql: &str, _params: &[Option<Scalar>]) -> Result<usize, DbError> {
        self.log.push(sql.to_string());
        self.check(sql)?;
        Ok(0)
    }

    fn execute_many(&mut self, sql: &str, rows: &[Row]) -> Result<(), DbError> {
        self.log.push(sql.to_string());
        if self.table_missing_at_insert {
            return Err(DbError::NoSuchTable(
                "1146: Table 'finance.ticker' doesn't exist".to_string(),
            ));
        }
        self.check(sql)?;
        self.inserted.extend(rows.iter().cloned());
        Ok(())
    }

    fn query(&mut self, sql: &str, _params: &[Option<Scalar>]) -> Result<Vec<Row>, DbError> {
        if sql.contains("information_schema.tables") {
            let count = i64::from(self.columns.is_some());
            return Ok(vec![vec![Some(Scalar::Integer(count))]]);
        }
        if sql.starts_with("DESCRIBE") {
            self.log.push(sql.to_string());
            if self.describe_denied {
                return Err(DbError::Engine(
                    "1142: SELECT command denied to user 'writer'@'%' for table 'ticker'"
                        .to_string(),
                ));
            }
            let columns = self
                .columns
                .as_ref()
                .ok_or_else(|| DbError::NoSuchTable("1146: Table doesn't exist".to_string()))?;
            return Ok(columns
                .iter()
                .map(|(name, native)| {
                    vec![
                        Some(Scalar::Text(name.clone())),
                        Some(Scalar::Text(native.clone())),
                        Some(Scalar::Text("YES".to_string())),
                        Some(Scalar::Text(if name == "id" { "PRI" } else { "" }.to_string())),
                        None,
                        Some(Scalar::Text(String::new())),
                    ]
                })
                .collect());
        }
        Err(DbError::Engine(format!("unexpected query: {sql}")))
    }

    fn begin(&mut self) -> Result<(), DbError> {
        self.log.push("BEGIN".to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.log.push("COMMIT".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.log.push("ROLLBACK".to_string());
        Ok(())
    }
}
