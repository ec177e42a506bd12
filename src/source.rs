//! Record sources for the command line.
//!
//! Reads CSV, JSON or NDJSON into a [`Dataset`]. The `-` path reads standard
//! input. CSV values go through the same integer/float/text probing the
//! writer uses for inference; an empty CSV field is a null.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    kind::cast,
    record::{Dataset, Payload, Record},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Json,
    Ndjson,
}

impl InputFormat {
    /// Guesses the format from the file extension; CSV when unknown.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("ndjson") || ext.eq_ignore_ascii_case("jsonl") => {
                InputFormat::Ndjson
            }
            _ => InputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub format: Option<InputFormat>,
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads every record from `path` according to `options`.
pub fn read_records(path: &Path, options: &SourceOptions) -> Result<Dataset> {
    let format = options.format.unwrap_or_else(|| InputFormat::detect(path));
    let encoding = resolve_encoding(options.encoding.as_deref())?;
    debug!("Reading {path:?} as {format:?} ({})", encoding.name());
    let reader = open_input(path)?;
    let dataset = match format {
        InputFormat::Csv => {
            let delimiter = resolve_input_delimiter(path, options.delimiter);
            read_csv(reader, delimiter, encoding)
        }
        InputFormat::Json => read_json(reader, encoding),
        InputFormat::Ndjson => read_ndjson(reader, encoding),
    }
    .with_context(|| format!("Reading records from {path:?}"))?;
    debug!("Read {} record(s) from {path:?}", dataset.len());
    Ok(dataset)
}

pub fn read_csv<R: Read>(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader);
    let headers = decode_record(csv_reader.byte_headers()?, encoding)?;
    let mut dataset = Dataset::new();
    for (idx, row) in csv_reader.byte_records().enumerate() {
        let row = row.with_context(|| format!("Reading CSV row {}", idx + 2))?;
        let fields = decode_record(&row, encoding)?;
        let record = headers
            .iter()
            .zip(fields)
            .map(|(header, field)| {
                let value = (!field.is_empty()).then(|| cast(&field));
                (header.trim().to_string(), value)
            })
            .collect::<Record>();
        dataset.push(record);
    }
    Ok(dataset)
}

fn read_text<R: Read>(mut reader: R, encoding: &'static Encoding) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_bytes(&bytes, encoding)
}

pub fn read_json<R: Read>(reader: R, encoding: &'static Encoding) -> Result<Dataset> {
    let text = read_text(reader, encoding)?;
    let value: serde_json::Value = serde_json::from_str(&text).context("Parsing JSON input")?;
    Ok(Payload::from_json(value)?.into_dataset())
}

pub fn read_ndjson<R: Read>(reader: R, encoding: &'static Encoding) -> Result<Dataset> {
    let text = read_text(reader, encoding)?;
    let mut dataset = Dataset::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("Parsing NDJSON line {}", idx + 1))?;
        match Payload::from_json(value)? {
            Payload::One(record) => dataset.push(record),
            Payload::Many(_) => bail!("NDJSON line {} holds an array, expected an object", idx + 1),
        }
    }
    Ok(dataset)
}
