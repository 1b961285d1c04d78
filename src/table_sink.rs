// Output of a collection run: CSV (default), aligned text table, or JSON.

use crate::error::SinkError;
use crate::models::{CollectionResult, IoStats, TrafficRecord};
use comfy_table::{ContentArrangement, Table, presets};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Column order of every tabular format.
pub const HEADER: [&str; 3 + 2 * IoStats::FIELDS] = [
    "node",
    "device",
    "user",
    "rOps_s",
    "rkB_s",
    "rkB_op",
    "rretrans",
    "ravgRTT_ms",
    "ravgexe_ms",
    "wOps_s",
    "wkB_s",
    "wkB_op",
    "wretrans",
    "wavgRTT_ms",
    "wavgexe_ms",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Table,
    Json,
}

/// Where rows go: a file (created or truncated) or stdout for `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    pub fn parse(s: &str) -> Self {
        if s == "-" {
            Destination::Stdout
        } else {
            Destination::File(PathBuf::from(s))
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Stdout => f.write_str("stdout"),
            Destination::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// One output row, as strings, in [`HEADER`] order.
pub fn row(record: &TrafficRecord) -> Vec<String> {
    let mut row = Vec::with_capacity(HEADER.len());
    row.push(record.node.to_string());
    row.push(record.device.clone());
    row.push(record.user.clone());
    row.extend(record.read.to_fields().iter().map(f64::to_string));
    row.extend(record.write.to_fields().iter().map(f64::to_string));
    row
}

/// Writes `result` to `destination` in `format`.
#[instrument(skip(result), fields(records = result.records.len()))]
pub fn write(
    result: &CollectionResult,
    format: OutputFormat,
    destination: &Destination,
) -> Result<(), SinkError> {
    match destination {
        Destination::Stdout => write_to(result, format, io::stdout().lock()),
        Destination::File(path) => write_file(result, format, path),
    }
}

fn write_file(result: &CollectionResult, format: OutputFormat, path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_to(result, format, BufWriter::new(file))
}

pub fn write_to<W: Write>(
    result: &CollectionResult,
    format: OutputFormat,
    writer: W,
) -> Result<(), SinkError> {
    match format {
        OutputFormat::Csv => write_csv(result, writer),
        OutputFormat::Table => write_table(result, writer),
        OutputFormat::Json => write_json(result, writer),
    }
}

pub fn write_csv<W: Write>(result: &CollectionResult, writer: W) -> Result<(), SinkError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for record in &result.records {
        csv.write_record(row(record))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_table<W: Write>(result: &CollectionResult, mut writer: W) -> Result<(), SinkError> {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(HEADER.to_vec());
    for record in &result.records {
        table.add_row(row(record));
    }
    writeln!(writer, "{table}")?;
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(result: &CollectionResult, mut writer: W) -> Result<(), SinkError> {
    serde_json::to_writer_pretty(&mut writer, &result.records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
