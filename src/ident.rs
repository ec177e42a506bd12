//! Identifier validation and table references.
//!
//! Table and column names are embedded directly into statement text (only
//! data values are bound as parameters), so every identifier has to pass an
//! allow-list before it reaches a dialect.

use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::error::{WriteError, WriteResult};

/// MySQL's limit; SQLite has none but the shorter bound keeps both happy.
pub const MAX_IDENTIFIER_LEN: usize = 64;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier pattern compiles")
    })
}

pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LEN && identifier_pattern().is_match(name)
}

pub fn validate_identifier(name: &str, what: &str) -> WriteResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(WriteError::InvalidInput(format!(
            "{what} '{name}' is not a valid identifier (letters, digits, '_' or '$', \
             not starting with a digit, at most {MAX_IDENTIFIER_LEN} characters)"
        )))
    }
}

/// Destination table, optionally qualified by a schema (MySQL database or
/// attached SQLite database).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    schema: Option<String>,
    name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> WriteResult<Self> {
        let name = name.into();
        validate_identifier(&name, "Table name")?;
        Ok(Self { schema: None, name })
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> WriteResult<Self> {
        let schema = schema.into();
        validate_identifier(&schema, "Schema name")?;
        self.schema = Some(schema);
        Ok(self)
    }

    /// Parses `table` or `schema.table`.
    pub fn parse(value: &str) -> WriteResult<Self> {
        match value.trim().split_once('.') {
            Some((schema, name)) => Self::new(name)?.with_schema(schema),
            None => Self::new(value.trim()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
