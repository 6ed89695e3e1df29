use anyhow::{Context, Result};
use std::path::Path;

use super::cell_text;
use crate::types::ResultTable;

/// Write the table as delimited text: header row of the key union, then one
/// row per record in arrival order.
pub fn write_csv(table: &ResultTable, path: &Path) -> Result<()> {
    let headers = table.column_headers();

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    wtr.write_record(&headers)?;

    for record in table.records() {
        let row: Vec<String> = headers.iter().map(|key| cell_text(record.get(key))).collect();
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
