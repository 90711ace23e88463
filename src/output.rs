//! Report export: CSV (optionally gzip-compressed) and JSON, plus a debug dump.

use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::report::{Column, VehiclePeriodRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

/// Logs each record using Rust's debug pretty-print format.
pub fn print_pretty(records: &[VehiclePeriodRecord]) {
    for record in records {
        debug!("{:#?}", record);
    }
}

/// Writes the selected columns as CSV with a header row.
pub fn write_csv<W: Write>(
    writer: W,
    records: &[VehiclePeriodRecord],
    columns: &[Column],
) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(columns.iter().map(Column::header))?;
    for record in records {
        writer.write_record(columns.iter().map(|c| c.cell(record)))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the selected columns as a pretty-printed JSON array of objects.
pub fn write_json<W: Write>(
    mut writer: W,
    records: &[VehiclePeriodRecord],
    columns: &[Column],
) -> Result<()> {
    let rows: Vec<Value> = records
        .iter()
        .map(|record| {
            let row: Map<String, Value> = columns
                .iter()
                .map(|c| (c.key().to_string(), c.value(record)))
                .collect();
            Value::Object(row)
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes the report to `path`, or stdout when `path` is `None`.
///
/// `gzip` compresses CSV output; it is ignored for JSON.
pub fn write_report(
    path: Option<&Path>,
    format: Format,
    gzip: bool,
    records: &[VehiclePeriodRecord],
    columns: &[Column],
) -> Result<()> {
    let sink: Box<dyn Write> = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create '{}'", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    match (format, gzip) {
        (Format::Csv, true) => {
            let mut encoder = GzEncoder::new(sink, Compression::default());
            write_csv(&mut encoder, records, columns)?;
            encoder.finish()?.flush()?;
        }
        (Format::Csv, false) => write_csv(sink, records, columns)?,
        (Format::Json, _) => write_json(sink, records, columns)?,
    }

    if let Some(path) = path {
        info!(path = %path.display(), rows = records.len(), ?format, gzip, "Report written");
    }
    Ok(())
}
