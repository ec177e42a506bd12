//! Engine-specific statement shapes.
//!
//! Each supported engine implements [`SqlDialect`] to render the handful of
//! statements the pipeline needs:
//!
//! | Statement       | MySQL                                         | SQLite                                         |
//! |-----------------|-----------------------------------------------|------------------------------------------------|
//! | table exists    | `information_schema.tables` by schema + name  | `sqlite_master` by name                        |
//! | describe        | `DESCRIBE t`                                  | `PRAGMA table_info("t")`                       |
//! | create          | `id INT AUTO_INCREMENT PRIMARY KEY`           | `id INTEGER PRIMARY KEY AUTOINCREMENT`         |
//! | add columns     | one `ALTER TABLE` with many `ADD COLUMN`      | one `ALTER TABLE ... ADD COLUMN` per column    |
//! | modify columns  | one `ALTER TABLE` with many `MODIFY COLUMN`   | table rebuild (create, copy, drop, rename)     |
//! | transactional DDL | no (DDL commits implicitly)                 | yes                                            |
//!
//! Identifiers are validated upstream and quoted here; data values are never
//! part of statement text.

use std::fmt;

use itertools::Itertools;

use crate::{ident::TableRef, introspect::LiveColumn, kind::Scalar, reconcile::ColumnChange};

/// Suffix of the replacement table built while rebuilding a SQLite table.
pub const REBUILD_SUFFIX: &str = "__scriba_new";

/// Column positions in a describe result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescribeLayout {
    pub name: usize,
    pub native_type: usize,
    pub primary_key: usize,
}

pub trait SqlDialect: fmt::Debug {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, ident: &str) -> String;

    fn qualified(&self, table: &TableRef) -> String {
        match table.schema() {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table.name())
            ),
            None => self.quote_identifier(table.name()),
        }
    }

    /// Catalog query returning a single count (0 when the table is absent).
    fn table_exists_query(&self, table: &TableRef) -> (String, Vec<Option<Scalar>>);

    fn describe_query(&self, table: &TableRef) -> String;

    fn describe_layout(&self) -> DescribeLayout;

    /// Query returning the DDL of indexes and triggers attached to the table,
    /// one statement per row. Engines that alter columns in place need none.
    fn dependents_query(&self, _table: &TableRef) -> Option<(String, Vec<Option<Scalar>>)> {
        None
    }

    /// Native type the identity column is declared with.
    fn identity_type(&self) -> &'static str;

    fn create_table(&self, table: &TableRef, identity_column: &str) -> String;

    fn add_columns(&self, table: &TableRef, columns: &[ColumnChange]) -> Vec<String>;

    /// `current` is the full column list of the table at the time the
    /// modification runs (live columns plus any just added); `dependents` is
    /// the index and trigger DDL read alongside it.
    fn modify_columns(
        &self,
        table: &TableRef,
        current: &[LiveColumn],
        dependents: &[String],
        columns: &[ColumnChange],
    ) -> Vec<String>;

    fn insert(&self, table: &TableRef, columns: &[&str]) -> String {
        let column_list = columns
            .iter()
            .map(|column| self.quote_identifier(column))
            .join(", ");
        let placeholders = columns.iter().map(|_| "?").join(", ");
        format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            self.qualified(table)
        )
    }

    /// Whether DDL can share a transaction with the following insert.
    fn supports_transactional_ddl(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn rules(self) -> &'static dyn SqlDialect {
        match self {
            Dialect::MySql => &MySql,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rules().name())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn table_exists_query(&self, table: &TableRef) -> (String, Vec<Option<Scalar>>) {
        let sql = "SELECT COUNT(*) FROM information_schema.tables \
                   WHERE table_schema = COALESCE(?, DATABASE()) AND table_name = ?";
        let params = vec![
            table.schema().map(Scalar::from),
            Some(Scalar::from(table.name())),
        ];
        (sql.to_string(), params)
    }

    fn describe_query(&self, table: &TableRef) -> String {
        format!("DESCRIBE {}", self.qualified(table))
    }

    fn describe_layout(&self) -> DescribeLayout {
        DescribeLayout {
            name: 0,
            native_type: 1,
            primary_key: 3,
        }
    }

    fn identity_type(&self) -> &'static str {
        "INT"
    }

    fn create_table(&self, table: &TableRef, identity_column: &str) -> String {
        format!(
            "CREATE TABLE {} ({} INT AUTO_INCREMENT PRIMARY KEY)",
            self.qualified(table),
            self.quote_identifier(identity_column)
        )
    }

    fn add_columns(&self, table: &TableRef, columns: &[ColumnChange]) -> Vec<String> {
        if columns.is_empty() {
            return Vec::new();
        }
        let clauses = columns
            .iter()
            .map(|column| {
                format!(
                    "ADD COLUMN {} {}",
                    self.quote_identifier(&column.name),
                    column.native_type()
                )
            })
            .join(", ");
        vec![format!("ALTER TABLE {} {clauses}", self.qualified(table))]
    }

    fn modify_columns(
        &self,
        table: &TableRef,
        _current: &[LiveColumn],
        _dependents: &[String],
        columns: &[ColumnChange],
    ) -> Vec<String> {
        if columns.is_empty() {
            return Vec::new();
        }
        let clauses = columns
            .iter()
            .map(|column| {
                format!(
                    "MODIFY COLUMN {} {}",
                    self.quote_identifier(&column.name),
                    column.native_type()
                )
            })
            .join(", ");
        vec![format!("ALTER TABLE {} {clauses}", self.qualified(table))]
    }

    fn supports_transactional_ddl(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl Sqlite {
    fn master_table(&self, table: &TableRef) -> String {
        match table.schema() {
            Some(schema) => format!("{}.sqlite_master", self.quote_identifier(schema)),
            None => "sqlite_master".to_string(),
        }
    }

    fn sibling(&self, table: &TableRef, name: &str) -> String {
        match table.schema() {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(name)
            ),
            None => self.quote_identifier(name),
        }
    }

    /// Column list of a rebuilt table. A lone `INTEGER` key stays the rowid
    /// alias; any other key becomes a table constraint.
    fn table_definition(&self, columns: &[LiveColumn]) -> String {
        let keys: Vec<&LiveColumn> = columns.iter().filter(|c| c.primary_key).collect();
        let rowid_key = match keys.as_slice() {
            [key] if key.native_type.trim().eq_ignore_ascii_case("INTEGER") => {
                Some(key.name.as_str())
            }
            _ => None,
        };
        let mut definitions: Vec<String> = columns
            .iter()
            .map(|column| {
                let name = self.quote_identifier(&column.name);
                if rowid_key == Some(column.name.as_str()) {
                    format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT")
                } else if column.native_type.trim().is_empty() {
                    name
                } else {
                    format!("{name} {}", column.native_type)
                }
            })
            .collect();
        if rowid_key.is_none() && !keys.is_empty() {
            definitions.push(format!(
                "PRIMARY KEY ({})",
                keys.iter().map(|key| self.quote_identifier(&key.name)).join(", ")
            ));
        }
        definitions.join(", ")
    }
}

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn table_exists_query(&self, table: &TableRef) -> (String, Vec<Option<Scalar>>) {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE type = 'table' AND name = ?",
            self.master_table(table)
        );
        (sql, vec![Some(Scalar::from(table.name()))])
    }

    fn describe_query(&self, table: &TableRef) -> String {
        match table.schema() {
            Some(schema) => format!(
                "PRAGMA {}.table_info({})",
                self.quote_identifier(schema),
                self.quote_identifier(table.name())
            ),
            None => format!("PRAGMA table_info({})", self.quote_identifier(table.name())),
        }
    }

    fn describe_layout(&self) -> DescribeLayout {
        DescribeLayout {
            name: 1,
            native_type: 2,
            primary_key: 5,
        }
    }

    fn dependents_query(&self, table: &TableRef) -> Option<(String, Vec<Option<Scalar>>)> {
        let sql = format!(
            "SELECT sql FROM {} WHERE type IN ('index', 'trigger') AND tbl_name = ? \
             AND sql IS NOT NULL ORDER BY type, name",
            self.master_table(table)
        );
        Some((sql, vec![Some(Scalar::from(table.name()))]))
    }

    fn identity_type(&self) -> &'static str {
        "INTEGER"
    }

    fn create_table(&self, table: &TableRef, identity_column: &str) -> String {
        format!(
            "CREATE TABLE {} ({} INTEGER PRIMARY KEY AUTOINCREMENT)",
            self.qualified(table),
            self.quote_identifier(identity_column)
        )
    }

    fn add_columns(&self, table: &TableRef, columns: &[ColumnChange]) -> Vec<String> {
        let target = self.qualified(table);
        columns
            .iter()
            .map(|column| {
                format!(
                    "ALTER TABLE {target} ADD COLUMN {} {}",
                    self.quote_identifier(&column.name),
                    column.native_type()
                )
            })
            .collect()
    }

    /// SQLite cannot retype a column, so the table is rebuilt: create the
    /// replacement, copy the rows, drop the original, rename the replacement
    /// into place, then recreate the original's indexes and triggers. Views
    /// and foreign keys name the table, not its storage, and keep working.
    fn modify_columns(
        &self,
        table: &TableRef,
        current: &[LiveColumn],
        dependents: &[String],
        columns: &[ColumnChange],
    ) -> Vec<String> {
        if columns.is_empty() {
            return Vec::new();
        }
        let rebuilt: Vec<LiveColumn> = current
            .iter()
            .map(|column| {
                match columns
                    .iter()
                    .find(|change| change.name.eq_ignore_ascii_case(&column.name))
                {
                    Some(change) if !column.primary_key => LiveColumn {
                        native_type: change.native_type().to_string(),
                        ..column.clone()
                    },
                    _ => column.clone(),
                }
            })
            .collect();

        let target = self.qualified(table);
        let new_name = format!("{}{REBUILD_SUFFIX}", table.name());
        let new_table = self.sibling(table, &new_name);
        let column_list = rebuilt
            .iter()
            .map(|column| self.quote_identifier(&column.name))
            .join(", ");

        let mut statements = vec![
            format!("CREATE TABLE {new_table} ({})", self.table_definition(&rebuilt)),
            format!("INSERT INTO {new_table} ({column_list}) SELECT {column_list} FROM {target}"),
            format!("DROP TABLE {target}"),
            format!(
                "ALTER TABLE {new_table} RENAME TO {}",
                self.quote_identifier(table.name())
            ),
        ];
        statements.extend(dependents.iter().cloned());
        statements
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }
}
