//! Public write entry point.
//!
//! A write runs validate, condense, infer, introspect, reconcile, apply DDL
//! and insert, in that order, against a caller-supplied [`Connection`]. On
//! engines with transactional DDL everything after validation shares one
//! transaction; otherwise the DDL is committed before the insert starts.

use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    condense::{CondensedColumns, condense},
    config::WriterConfig,
    connection::Connection,
    ddl,
    error::{WriteError, WriteResult},
    ident::{TableRef, validate_identifier},
    infer::{InferredSchema, infer_schema},
    insert::insert_columns,
    introspect::{LiveSchema, read_live_schema},
    reconcile::{ReconciliationPlan, reconcile, resolve_column_kinds},
    record::{Dataset, Payload},
};

/// Outcome of a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub rows_inserted: usize,
    pub table_created: bool,
    pub plan: ReconciliationPlan,
    /// DDL statements executed, in order.
    pub statements: Vec<String>,
}

/// What a write would do, computed without changing the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanPreview {
    pub inferred: InferredSchema,
    pub live: LiveSchema,
    pub plan: ReconciliationPlan,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TableWriter {
    table: TableRef,
    config: WriterConfig,
}

impl TableWriter {
    pub fn new(table: TableRef) -> Self {
        Self::with_config(table, WriterConfig::default())
    }

    pub fn with_config(table: TableRef, config: WriterConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Persists `data` into the table, creating or evolving it first.
    ///
    /// An empty dataset (or one whose records carry no keys) is a no-op and
    /// never touches the connection.
    pub fn write<C>(&self, conn: &mut C, data: impl Into<Payload>) -> WriteResult<WriteReport>
    where
        C: Connection + ?Sized,
    {
        let payload: Payload = data.into();
        let Some(columns) = self.prepare(payload.into_dataset())? else {
            debug!("Nothing to write into {}", self.table);
            return Ok(WriteReport::default());
        };

        conn.begin().map_err(|source| WriteError::Transaction {
            action: "begin",
            source,
        })?;
        match self.run(conn, columns) {
            Ok(report) => {
                conn.commit().map_err(|source| WriteError::Transaction {
                    action: "commit",
                    source,
                })?;
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback() {
                    warn!("Rolling back write to {} failed: {rollback_err}", self.table);
                }
                Err(err)
            }
        }
    }

    /// Runs every read-only phase and renders the DDL a write would issue.
    pub fn plan<C>(&self, conn: &mut C, data: impl Into<Payload>) -> WriteResult<PlanPreview>
    where
        C: Connection + ?Sized,
    {
        let payload: Payload = data.into();
        let Some(columns) = self.prepare(payload.into_dataset())? else {
            return Ok(PlanPreview::default());
        };
        let inferred = infer_schema(&columns);
        let (live, plan) = self.reconcile_with(conn, &inferred)?;
        let statements = ddl::render_statements(
            conn.dialect().rules(),
            &self.table,
            &live,
            &plan,
            &self.config.identity_column,
        );
        Ok(PlanPreview {
            inferred,
            live,
            plan,
            statements,
        })
    }

    fn prepare(&self, dataset: Dataset) -> WriteResult<Option<CondensedColumns>> {
        validate_dataset(&dataset)?;
        let columns = condense(dataset);
        if columns.row_count() == 0 || columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(columns))
    }

    fn reconcile_with<C>(
        &self,
        conn: &mut C,
        inferred: &InferredSchema,
    ) -> WriteResult<(LiveSchema, ReconciliationPlan)>
    where
        C: Connection + ?Sized,
    {
        let mut live = read_live_schema(conn, &self.table)?;
        if !live.exists {
            live = ddl::creation_baseline(conn.dialect().rules(), &self.config.identity_column);
        }
        let plan = reconcile(inferred, &live, self.config.modify_policy);
        debug!(
            "Plan for {}: add {:?}, modify {:?}",
            self.table,
            plan.add.iter().map(|c| &c.name).collect::<Vec<_>>(),
            plan.modify.iter().map(|c| &c.name).collect::<Vec<_>>()
        );
        Ok((live, plan))
    }

    fn run<C>(&self, conn: &mut C, columns: CondensedColumns) -> WriteResult<WriteReport>
    where
        C: Connection + ?Sized,
    {
        let inferred = infer_schema(&columns);
        let (live, plan) = self.reconcile_with(conn, &inferred)?;
        let statements = ddl::apply_plan(
            conn,
            &self.table,
            &live,
            &plan,
            &self.config.identity_column,
        )?;

        let rules = conn.dialect().rules();
        if !statements.is_empty() && !rules.supports_transactional_ddl() {
            // DDL already committed implicitly; make the boundary explicit so
            // the insert runs in its own transaction.
            conn.commit().map_err(|source| WriteError::Transaction {
                action: "commit",
                source,
            })?;
            conn.begin().map_err(|source| WriteError::Transaction {
                action: "begin",
                source,
            })?;
        }

        let kinds = resolve_column_kinds(&inferred, &live, &plan);
        let rows_inserted = insert_columns(
            conn,
            &self.table,
            columns,
            &kinds,
            self.config.batch_size,
        )?;
        Ok(WriteReport {
            rows_inserted,
            table_created: !live.exists,
            plan,
            statements,
        })
    }
}

/// Writes `data` into `table` with the default configuration.
pub fn write<C>(conn: &mut C, table: &TableRef, data: impl Into<Payload>) -> WriteResult<WriteReport>
where
    C: Connection + ?Sized,
{
    TableWriter::new(table.clone()).write(conn, data)
}

/// Rejects column names that are not identifiers and names that collide once
/// case is ignored (both engines treat them as the same column).
fn validate_dataset(dataset: &Dataset) -> WriteResult<()> {
    let mut exact: HashSet<&str> = HashSet::new();
    let mut folded: HashSet<String> = HashSet::new();
    for key in dataset.iter().flat_map(|record| record.keys()) {
        if !exact.insert(key) {
            continue;
        }
        validate_identifier(key, "Column name")?;
        if !folded.insert(key.to_ascii_lowercase()) {
            return Err(WriteError::InvalidInput(format!(
                "column '{key}' differs from another column only by case"
            )));
        }
    }
    Ok(())
}
