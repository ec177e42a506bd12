//! Renders and applies the schema changes of a reconciliation plan.

use log::{debug, info};

use crate::{
    connection::Connection,
    dialect::SqlDialect,
    error::{WriteError, WriteResult},
    ident::TableRef,
    introspect::{LiveColumn, LiveSchema},
    reconcile::ReconciliationPlan,
};

/// Statements that bring `table` in line with `plan`, in execution order.
///
/// An absent table is created with only the identity column; its data
/// columns then go through the same add path as an existing table.
pub fn render_statements(
    rules: &dyn SqlDialect,
    table: &TableRef,
    live: &LiveSchema,
    plan: &ReconciliationPlan,
    identity_column: &str,
) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = live.columns.clone();
    if !live.exists {
        statements.push(rules.create_table(table, identity_column));
        if live.find(identity_column).is_none() {
            current.push(identity(rules, identity_column));
        }
    }
    statements.extend(rules.add_columns(table, &plan.add));
    current.extend(
        plan.add
            .iter()
            .map(|change| LiveColumn::new(change.name.clone(), change.native_type())),
    );
    statements.extend(rules.modify_columns(table, &current, &live.dependents, &plan.modify));
    statements
}

/// Layout a table will have right after its `CREATE TABLE`.
///
/// Reconciling against this instead of an empty schema keeps records that
/// carry their own identity value from adding the identity column twice.
pub fn creation_baseline(rules: &dyn SqlDialect, identity_column: &str) -> LiveSchema {
    LiveSchema {
        columns: vec![identity(rules, identity_column)],
        ..LiveSchema::absent()
    }
}

fn identity(rules: &dyn SqlDialect, identity_column: &str) -> LiveColumn {
    LiveColumn::new(identity_column, rules.identity_type()).primary_key()
}

/// Executes the DDL for `plan` and returns the statements that ran.
///
/// Transaction handling is left to the caller. The first failing statement
/// aborts with [`WriteError::Ddl`].
pub fn apply_plan<C>(
    conn: &mut C,
    table: &TableRef,
    live: &LiveSchema,
    plan: &ReconciliationPlan,
    identity_column: &str,
) -> WriteResult<Vec<String>>
where
    C: Connection + ?Sized,
{
    let rules = conn.dialect().rules();
    let statements = render_statements(rules, table, live, plan, identity_column);
    for statement in &statements {
        debug!("DDL: {statement}");
        conn.execute(statement, &[])
            .map_err(|source| WriteError::Ddl {
                table: table.to_string(),
                statement: statement.clone(),
                source,
            })?;
    }
    if !live.exists {
        info!("Created table {table} with {} column(s)", plan.add.len());
    } else if !plan.is_empty() {
        info!(
            "Altered table {table}: {} column(s) added, {} modified",
            plan.add.len(),
            plan.modify.len()
        );
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::SqliteConnection,
        dialect::{MySql, Sqlite},
        kind::Kind,
        reconcile::ColumnChange,
    };

    fn change(name: &str, kind: Kind) -> ColumnChange {
        ColumnChange {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn absent_table_is_created_then_altered() {
        let table = TableRef::new("ticker").expect("table");
        let plan = ReconciliationPlan {
            add: vec![change("symbol", Kind::Text), change("price", Kind::Float)],
            ..ReconciliationPlan::default()
        };
        let statements = render_statements(&MySql, &table, &LiveSchema::absent(), &plan, "id");
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE `ticker` (`id` INT AUTO_INCREMENT PRIMARY KEY)".to_string(),
                "ALTER TABLE `ticker` ADD COLUMN `symbol` TEXT, ADD COLUMN `price` DOUBLE"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn rebuild_includes_columns_added_in_the_same_plan() {
        let table = TableRef::new("t").expect("table");
        let live = LiveSchema::existing(vec![
            LiveColumn::new("id", "INTEGER").primary_key(),
            LiveColumn::new("a", "INT"),
        ]);
        let plan = ReconciliationPlan {
            add: vec![change("b", Kind::Text)],
            modify: vec![change("a", Kind::Float)],
            skipped: Vec::new(),
        };
        let statements = render_statements(&Sqlite, &table, &live, &plan, "id");
        assert_eq!(statements.len(), 5);
        assert_eq!(statements[0], "ALTER TABLE \"t\" ADD COLUMN \"b\" TEXT");
        assert_eq!(
            statements[1],
            "CREATE TABLE \"t__scriba_new\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"a\" DOUBLE, \"b\" TEXT)"
        );
    }

    #[test]
    fn baseline_holds_only_the_identity_column() {
        let baseline = creation_baseline(&Sqlite, "row_id");
        assert!(!baseline.exists);
        assert_eq!(baseline.find("ROW_ID").map(|c| c.kind()), Some(Some(Kind::Integer)));
        let statements = render_statements(
            &Sqlite,
            &TableRef::new("t").expect("table"),
            &baseline,
            &ReconciliationPlan::default(),
            "row_id",
        );
        assert_eq!(
            statements,
            vec!["CREATE TABLE \"t\" (\"row_id\" INTEGER PRIMARY KEY AUTOINCREMENT)".to_string()]
        );
    }

    #[test]
    fn failing_statement_is_reported() {
        let mut conn = SqliteConnection::open_in_memory().expect("sqlite");
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, a INT)", &[])
            .expect("create");
        let table = TableRef::new("t").expect("table");
        let live = LiveSchema::existing(Vec::new());
        // `a` already exists, so the engine rejects the ADD COLUMN.
        let plan = ReconciliationPlan {
            add: vec![change("a", Kind::Integer)],
            ..ReconciliationPlan::default()
        };
        let err = apply_plan(&mut conn, &table, &live, &plan, "id").expect_err("duplicate column");
        match err {
            WriteError::Ddl { statement, .. } => {
                assert_eq!(statement, "ALTER TABLE \"t\" ADD COLUMN \"a\" INT")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
