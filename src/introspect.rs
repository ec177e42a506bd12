//! Reads the live column layout of the destination table.

use log::debug;

use crate::{
    connection::{Connection, DbError},
    error::{WriteError, WriteResult},
    ident::TableRef,
    kind::{Kind, Scalar},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    /// Type name exactly as the engine reports it (`int(11)`, `INTEGER`, ...).
    pub native_type: String,
    /// Part of the table's primary key.
    pub primary_key: bool,
}

impl LiveColumn {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn kind(&self) -> Option<Kind> {
        Kind::from_native(&self.native_type)
    }
}

/// Live table layout. An absent table has no columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSchema {
    pub exists: bool,
    pub columns: Vec<LiveColumn>,
    /// Index and trigger DDL attached to the table, replayed after a rebuild.
    pub dependents: Vec<String>,
}

impl LiveSchema {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn existing(columns: Vec<LiveColumn>) -> Self {
        Self {
            exists: true,
            columns,
            dependents: Vec::new(),
        }
    }

    /// Looks a column up by name, ignoring ASCII case as both engines do.
    pub fn find(&self, name: &str) -> Option<&LiveColumn> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}

pub fn read_live_schema<C>(conn: &mut C, table: &TableRef) -> WriteResult<LiveSchema>
where
    C: Connection + ?Sized,
{
    let rules = conn.dialect().rules();
    let schema_error = |source: DbError| WriteError::SchemaRead {
        table: table.to_string(),
        source,
    };

    let (exists_sql, params) = rules.table_exists_query(table);
    let count = conn
        .query_one(&exists_sql, &params)
        .map_err(schema_error)?
        .and_then(|row| row.into_iter().next().flatten());
    let exists = match count {
        Some(Scalar::Integer(count)) => count > 0,
        Some(Scalar::Text(text)) => text.trim().parse::<i64>().map(|n| n > 0).unwrap_or(false),
        Some(Scalar::Float(count)) => count > 0.0,
        None => false,
    };
    if !exists {
        debug!("Table {table} does not exist yet");
        return Ok(LiveSchema::absent());
    }

    let rows = match conn.query(&rules.describe_query(table), &[]) {
        Ok(rows) => rows,
        // Dropped between the existence check and the describe.
        Err(DbError::NoSuchTable(_)) => return Ok(LiveSchema::absent()),
        Err(err) => return Err(schema_error(err)),
    };
    let layout = rules.describe_layout();
    let columns = rows
        .into_iter()
        .filter_map(|row| {
            let name = text_at(&row, layout.name)?;
            let native_type = text_at(&row, layout.native_type).unwrap_or_default();
            let primary_key = is_key_marker(row.get(layout.primary_key).cloned().flatten());
            Some(LiveColumn {
                name,
                native_type,
                primary_key,
            })
        })
        .collect::<Vec<_>>();

    let dependents: Vec<String> = match rules.dependents_query(table) {
        Some((sql, params)) => conn
            .query(&sql, &params)
            .map_err(schema_error)?
            .into_iter()
            .filter_map(|row| text_at(&row, 0))
            .collect(),
        None => Vec::new(),
    };
    debug!(
        "Table {table} has {} live column(s) and {} index/trigger definition(s)",
        columns.len(),
        dependents.len()
    );
    Ok(LiveSchema {
        exists: true,
        columns,
        dependents,
    })
}

fn text_at(row: &[Option<Scalar>], idx: usize) -> Option<String> {
    row.get(idx).cloned().flatten().map(|value| value.to_string())
}

/// MySQL reports `PRI` in the `Key` column; SQLite reports the 1-based
/// position within the primary key, 0 for other columns.
fn is_key_marker(value: Option<Scalar>) -> bool {
    match value {
        Some(Scalar::Integer(position)) => position > 0,
        Some(Scalar::Text(text)) => text.trim().eq_ignore_ascii_case("PRI"),
        Some(Scalar::Float(_)) | None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqliteConnection;

    #[test]
    fn absent_table_reads_as_empty() {
        let mut conn = SqliteConnection::open_in_memory().expect("sqlite");
        let table = TableRef::new("missing").expect("table");
        let live = read_live_schema(&mut conn, &table).expect("introspect");
        assert_eq!(live, LiveSchema::absent());
    }

    #[test]
    fn reports_columns_in_table_order() {
        let mut conn = SqliteConnection::open_in_memory().expect("sqlite");
        conn.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, a INT, b TEXT, c BLOB)",
            &[],
        )
        .expect("create");
        let table = TableRef::new("t").expect("table");
        let live = read_live_schema(&mut conn, &table).expect("introspect");
        assert!(live.exists);
        let summary: Vec<_> = live
            .columns
            .iter()
            .map(|column| (column.name.as_str(), column.kind()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("id", Some(Kind::Integer)),
                ("a", Some(Kind::Integer)),
                ("b", Some(Kind::Text)),
                ("c", None),
            ]
        );
        assert_eq!(live.find("B").map(|c| c.name.as_str()), Some("b"));
        let keys: Vec<_> = live.columns.iter().map(|c| c.primary_key).collect();
        assert_eq!(keys, vec![true, false, false, false]);
    }

    #[test]
    fn collects_index_and_trigger_definitions() {
        let mut conn = SqliteConnection::open_in_memory().expect("sqlite");
        conn.execute("CREATE TABLE t (id TEXT, a INT UNIQUE, b INT)", &[])
            .expect("create");
        conn.execute("CREATE INDEX t_b ON t (b)", &[]).expect("index");
        conn.execute(
            "CREATE TRIGGER t_touch AFTER INSERT ON t BEGIN SELECT 1; END",
            &[],
        )
        .expect("trigger");
        let table = TableRef::new("t").expect("table");
        let live = read_live_schema(&mut conn, &table).expect("introspect");
        // The UNIQUE constraint's automatic index has no SQL of its own.
        assert_eq!(
            live.dependents,
            vec![
                "CREATE INDEX t_b ON t (b)".to_string(),
                "CREATE TRIGGER t_touch AFTER INSERT ON t BEGIN SELECT 1; END".to_string(),
            ]
        );
        assert!(live.columns.iter().all(|c| !c.primary_key));
    }
}
