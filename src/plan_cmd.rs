use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::WriteArgs,
    connection::SqliteConnection,
    reconcile::SkipReason,
    table::TextTable,
    write_cmd,
    writer::PlanPreview,
};

pub fn execute(args: &WriteArgs) -> Result<()> {
    let (writer, dataset) = write_cmd::prepare(args)?;
    let mut conn = if args.db.exists() {
        SqliteConnection::open_read_only(&args.db)
            .with_context(|| format!("Opening database {:?}", args.db))?
    } else {
        info!("Database {:?} does not exist; planning against an empty one", args.db);
        SqliteConnection::open_in_memory().context("Opening in-memory database")?
    };
    let preview = writer
        .plan(&mut conn, dataset)
        .with_context(|| format!("Planning write into {}", writer.table()))?;

    plan_table(&preview).print();
    if !preview.statements.is_empty() {
        println!();
        for statement in &preview.statements {
            println!("{statement};");
        }
    }
    info!(
        "Plan for {}: {} column(s) to add, {} to modify",
        writer.table(),
        preview.plan.add.len(),
        preview.plan.modify.len()
    );
    Ok(())
}

pub fn plan_table(preview: &PlanPreview) -> TextTable {
    let mut table =
        TextTable::new(["#", "column", "inferred", "live", "action"]).numeric_column(0);
    for (idx, column) in preview.inferred.columns.iter().enumerate() {
        let live = preview.live.find(&column.name);
        let live_type = match live {
            Some(existing) if preview.live.exists => existing.native_type.clone(),
            _ => "-".to_string(),
        };
        let matches = |name: &str| name.eq_ignore_ascii_case(&column.name);
        let action = if preview.plan.add.iter().any(|c| matches(&c.name)) {
            format!("add {}", column.native_type())
        } else if preview.plan.modify.iter().any(|c| matches(&c.name)) {
            format!("modify to {}", column.native_type())
        } else if let Some(skipped) = preview.plan.skipped.iter().find(|c| matches(&c.name)) {
            match skipped.reason {
                SkipReason::Narrowing => "keep (narrower)".to_string(),
                SkipReason::UnrecognizedLiveType => "keep (unrecognized type)".to_string(),
                SkipReason::PrimaryKey => "keep (primary key)".to_string(),
            }
        } else {
            "keep".to_string()
        };
        table.push_row([
            (idx + 1).to_string(),
            column.name.clone(),
            column.native_type().to_string(),
            live_type,
            action,
        ]);
    }
    table
}
