use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    cli::WriteArgs,
    config::WriterConfig,
    connection::SqliteConnection,
    ident::TableRef,
    record::Dataset,
    source::{self, SourceOptions},
    writer::TableWriter,
};

pub fn execute(args: &WriteArgs) -> Result<()> {
    let (writer, dataset) = prepare(args)?;
    let mut conn = SqliteConnection::open(&args.db)
        .with_context(|| format!("Opening database {:?}", args.db))?;
    let report = writer
        .write(&mut conn, dataset)
        .with_context(|| format!("Writing records into {}", writer.table()))?;
    for statement in &report.statements {
        debug!("Executed: {statement}");
    }
    if report.table_created {
        info!("Created table {}", writer.table());
    }
    for skipped in &report.plan.skipped {
        info!(
            "Kept column '{}' as {} ({})",
            skipped.name,
            skipped.live_type,
            skipped.reason.describe()
        );
    }
    info!(
        "Wrote {} row(s) into {} ({} column(s) added, {} modified)",
        report.rows_inserted,
        writer.table(),
        report.plan.add.len(),
        report.plan.modify.len()
    );
    Ok(())
}

/// Resolves the writer (table, config file, flag overrides) and reads the
/// input records.
pub(crate) fn prepare(args: &WriteArgs) -> Result<(TableWriter, Dataset)> {
    let table = TableRef::parse(&args.table)?;
    let config = resolve_config(args)?;
    debug!("Writer config: {config:?}");
    let options = SourceOptions {
        format: args.format,
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
    };
    let dataset = source::read_records(&args.input, &options)?;
    Ok((TableWriter::with_config(table, config), dataset))
}

fn resolve_config(args: &WriteArgs) -> Result<WriterConfig> {
    let mut config = match &args.config {
        Some(path) => WriterConfig::load(path)
            .with_context(|| format!("Loading writer config from {path:?}"))?,
        None => WriterConfig::default(),
    };
    if let Some(identity) = &args.identity_column {
        config.identity_column = identity.clone();
    }
    if let Some(policy) = args.modify_policy {
        config.modify_policy = policy;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;
    Ok(config)
}
