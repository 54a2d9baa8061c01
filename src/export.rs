//! CSV / JSON rendering of measurement rows for download.

use crate::db::Row;
use crate::error::Result;
use serde_json::Value;

pub const EXPORT_COLUMNS: [&str; 7] = [
    "platform_id",
    "measurement_date",
    "pressure_dbar",
    "temperature_celsius",
    "salinity_psu",
    "latitude",
    "longitude",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Anything other than `json` exports CSV.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            Some(s) if s == "json" => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn render(&self, rows: &[Row]) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => rows_to_csv(rows, &EXPORT_COLUMNS),
            ExportFormat::Json => Ok(serde_json::to_vec(rows)?),
        }
    }
}

/// `argo_floats_<millis>.<ext>`
pub fn attachment_filename(format: ExportFormat, now: chrono::DateTime<chrono::Utc>) -> String {
    format!("argo_floats_{}.{}", now.timestamp_millis(), format.extension())
}

pub fn rows_to_csv(rows: &[Row], columns: &[&str]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell(row.get(*c))))?;
    }

    writer
        .into_inner()
        .map_err(|e| crate::error::ArgoError::Io(e.into_error()))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
