pub mod cli;
pub mod condense;
pub mod config;
pub mod connection;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod infer;
pub mod insert;
pub mod introspect;
pub mod kind;
pub mod plan_cmd;
pub mod reconcile;
pub mod record;
pub mod source;
pub mod table;
pub mod write_cmd;
pub mod writer;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    config::{ModifyPolicy, WriterConfig},
    connection::{Connection, DbError, SqliteConnection},
    dialect::Dialect,
    error::{WriteError, WriteResult},
    ident::TableRef,
    kind::{Kind, Scalar},
    record::{Dataset, Payload, Record},
    writer::{PlanPreview, TableWriter, WriteReport, write},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("scriba", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Write(args) => write_cmd::execute(&args),
        Commands::Plan(args) => plan_cmd::execute(&args),
    }
}
