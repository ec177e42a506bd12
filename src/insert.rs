//! Bulk insert of condensed columns.

use log::{debug, info};

use crate::{
    condense::CondensedColumns,
    connection::{Connection, DbError, Row},
    error::{WriteError, WriteResult},
    ident::TableRef,
    kind::Kind,
};

/// Transposes the columns back into rows, coercing each value to the kind of
/// its destination column. `kinds` follows column order; `None` binds values
/// unchanged.
pub fn rows_for_insert(columns: CondensedColumns, kinds: &[Option<Kind>]) -> Vec<Row> {
    let row_count = columns.row_count();
    let mut cursors: Vec<_> = columns
        .into_columns()
        .into_iter()
        .map(|(_, values)| values.into_iter())
        .collect();
    let mut rows = Vec::with_capacity(row_count);
    for _ in 0..row_count {
        let row = cursors
            .iter_mut()
            .enumerate()
            .map(|(idx, cursor)| {
                let value = cursor.next().flatten()?;
                Some(match kinds.get(idx).copied().flatten() {
                    Some(kind) => value.coerce(kind),
                    None => value,
                })
            })
            .collect();
        rows.push(row);
    }
    rows
}

/// Inserts every row of `columns` into `table` with one parameterized
/// statement, `batch_size` rows per call (0 sends everything at once).
///
/// Returns the number of rows inserted. A table that vanished before the
/// insert is reported as [`WriteError::TableMissing`].
pub fn insert_columns<C>(
    conn: &mut C,
    table: &TableRef,
    columns: CondensedColumns,
    kinds: &[Option<Kind>],
    batch_size: usize,
) -> WriteResult<usize>
where
    C: Connection + ?Sized,
{
    if columns.row_count() == 0 || columns.is_empty() {
        return Ok(0);
    }
    let names: Vec<String> = columns.names().map(str::to_string).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let sql = conn.dialect().rules().insert(table, &name_refs);
    debug!("Insert: {sql}");

    let rows = rows_for_insert(columns, kinds);
    let chunk = if batch_size == 0 { rows.len() } else { batch_size };
    for batch in rows.chunks(chunk) {
        conn.execute_many(&sql, batch).map_err(|err| match err {
            DbError::NoSuchTable(_) => WriteError::TableMissing {
                table: table.to_string(),
            },
            source => WriteError::Insert {
                table: table.to_string(),
                source,
            },
        })?;
        debug!("Inserted batch of {} row(s) into {table}", batch.len());
    }
    info!("Inserted {} row(s) into {table}", rows.len());
    Ok(rows.len())
}
