use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{config::ModifyPolicy, source::InputFormat};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Write loosely-structured records into SQL tables, evolving the schema as needed",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Insert records into a table, creating or altering it first
    Write(WriteArgs),
    /// Show the inferred schema and the schema changes a write would make
    Plan(WriteArgs),
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// SQLite database file (created when missing)
    #[arg(short = 'd', long = "db")]
    pub db: PathBuf,
    /// Destination table, optionally qualified as `schema.table`
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Input file with the records (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input format; detected from the file extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML writer configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Name of the auto-increment key column created with new tables
    #[arg(long = "identity-column")]
    pub identity_column: Option<String>,
    /// How existing columns with a different inferred type are handled
    #[arg(long = "modify-policy", value_enum)]
    pub modify_policy: Option<ModifyPolicy>,
    /// Rows per insert batch (0 inserts everything at once)
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
