//! JSON and CSV export of planned cities.

use std::{fs::File, io::Write, path::Path, str::FromStr};

use serde::Serialize;

use crate::{error::TripError, model::TripResult};

pub const CSV_HEADER: [&str; 7] =
    ["city", "address", "attractions", "daily", "aqi", "clothing", "notes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("planner_output.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(TripError::invalid_input(format!(
                "unknown export format '{other}'. Supported formats: json, csv."
            ))),
        }
    }
}

/// Write `results` to `path` in the given format.
pub fn export(results: &[TripResult], format: ExportFormat, path: &Path) -> Result<(), TripError> {
    match format {
        ExportFormat::Json => write_json(results, path),
        ExportFormat::Csv => write_csv(results, path),
    }
}

pub fn write_json(results: &[TripResult], path: &Path) -> Result<(), TripError> {
    let mut file = File::create(path)?;
    to_json_writer(results, &mut file)?;
    file.flush()?;
    Ok(())
}

pub fn write_csv(results: &[TripResult], path: &Path) -> Result<(), TripError> {
    to_csv_writer(results, File::create(path)?)
}

/// Pretty-printed JSON array, one object per city.
pub fn to_json_writer<W: Write>(results: &[TripResult], mut writer: W) -> Result<(), TripError> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// One row per city. List fields are embedded JSON, notes joined with `"; "`.
pub fn to_csv_writer<W: Write>(results: &[TripResult], writer: W) -> Result<(), TripError> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    for result in results {
        csv.serialize(CsvRow::from_result(result)?)?;
    }

    csv.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    city: &'a str,
    address: &'a str,
    attractions: String,
    daily: String,
    aqi: Option<f64>,
    clothing: &'a str,
    notes: String,
}

impl<'a> CsvRow<'a> {
    fn from_result(result: &'a TripResult) -> Result<Self, TripError> {
        Ok(Self {
            city: &result.city,
            address: &result.address,
            attractions: serde_json::to_string(&result.attractions)?,
            daily: serde_json::to_string(&result.daily)?,
            aqi: result.air_quality.aqi,
            clothing: &result.clothing,
            notes: result.notes.join("; "),
        })
    }
}
