mod csv_export;
mod excel;
mod snapshot;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::ResultTable;

const DATA_FILE_PREFIX: &str = "mlbtheshow_data";
const DATALOSS_FILE_PREFIX: &str = "mlbtheshow_dataloss";

/// The one artifact a single invocation leaves on disk.
#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Workbook(PathBuf),
    Csv(PathBuf),
    Snapshot(PathBuf),
}

impl ExportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExportOutcome::Workbook(p) | ExportOutcome::Csv(p) | ExportOutcome::Snapshot(p) => p,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, ExportOutcome::Snapshot(_))
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::Workbook(p) => write!(f, "Excel file: {}", p.display()),
            ExportOutcome::Csv(p) => write!(f, "CSV file: {}", p.display()),
            ExportOutcome::Snapshot(p) => write!(f, "binary snapshot: {}", p.display()),
        }
    }
}

/// Persist the table to the current working directory, falling through
/// workbook -> CSV -> binary snapshot. The snapshot tier must succeed; its
/// failure is the only fatal outcome.
pub fn export(table: &ResultTable, requested: Option<&str>) -> Result<ExportOutcome> {
    let dir = std::env::current_dir().context("Failed to resolve working directory")?;
    export_to(table, requested, &dir)
}

pub fn export_to(table: &ResultTable, requested: Option<&str>, dir: &Path) -> Result<ExportOutcome> {
    run_tiers(
        table,
        requested,
        dir,
        excel::write_workbook,
        csv_export::write_csv,
        snapshot::write_snapshot,
    )
}

fn run_tiers(
    table: &ResultTable,
    requested: Option<&str>,
    dir: &Path,
    workbook: impl Fn(&ResultTable, &Path) -> Result<()>,
    csv: impl Fn(&ResultTable, &Path) -> Result<()>,
    snapshot: impl Fn(&ResultTable, &Path) -> Result<()>,
) -> Result<ExportOutcome> {
    let today = Local::now().date_naive();
    let filename = resolve_filename(requested, today);

    // An explicit .csv request goes straight to the CSV tier; writing a
    // workbook under a .csv name would mislabel the artifact.
    if filename.ends_with(".xlsx") {
        let path = dir.join(&filename);
        println!("~ Attempting to create Excel file with the data collected (filename: {filename})");
        match workbook(table, &path) {
            Ok(()) => return Ok(ExportOutcome::Workbook(path)),
            Err(err) => eprintln!("~ Error while exporting to '.xlsx': {err:#}"),
        }
    }

    let csv_name = csv_filename(&filename);
    let csv_path = dir.join(&csv_name);
    println!("~ Attempting to create CSV file with the data collected (filename: {csv_name})");
    match csv(table, &csv_path) {
        Ok(()) => return Ok(ExportOutcome::Csv(csv_path)),
        Err(err) => eprintln!("~ Error while exporting to '.csv': {err:#}"),
    }

    eprintln!("~ Attempting to create a binary snapshot to prevent loss of API data...");
    let snapshot_path = dir.join(format!("{DATALOSS_FILE_PREFIX}_{}.pkl", date_stamp(today)));
    snapshot(table, &snapshot_path)
        .context("Failed to prevent data loss: the snapshot file could not be written")?;
    Ok(ExportOutcome::Snapshot(snapshot_path))
}

/// Default name carries the date; supplied names get `.xlsx` appended unless
/// they already end in `.xlsx` or `.csv`.
fn resolve_filename(requested: Option<&str>, today: NaiveDate) -> String {
    match requested {
        None => format!("{DATA_FILE_PREFIX}_{}.xlsx", date_stamp(today)),
        Some(name) if name.ends_with(".xlsx") || name.ends_with(".csv") => name.to_string(),
        Some(name) => format!("{name}.xlsx"),
    }
}

fn csv_filename(filename: &str) -> String {
    match filename.strip_suffix(".xlsx") {
        Some(base) => format!("{base}.csv"),
        None => filename.to_string(),
    }
}

/// Year, month, day concatenated without zero padding.
fn date_stamp(date: NaiveDate) -> String {
    format!("{}{}{}", date.year(), date.month(), date.day())
}

/// Flatten one JSON value into cell text. Nested structures keep their
/// compact JSON form.
pub(crate) fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string(v).unwrap_or_default()
        }
    }
}
