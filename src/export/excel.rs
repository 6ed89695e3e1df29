use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::path::Path;

use super::cell_text;
use crate::types::ResultTable;

/// Write the table as a single-sheet workbook: header row first, one row per
/// record, cells typed where the JSON value allows it.
pub fn write_workbook(table: &ResultTable, path: &Path) -> Result<()> {
    let headers = table.column_headers();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, name.as_str())?;
    }

    for (i, record) in table.records().iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, key) in headers.iter().enumerate() {
            let col = col as u16;
            match record.get(key) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) => {
                    if let Some(f) = n.as_f64() {
                        sheet.write_number(row, col, f)?;
                    } else {
                        sheet.write_string(row, col, n.to_string())?;
                    }
                }
                Some(Value::Bool(b)) => {
                    sheet.write_boolean(row, col, *b)?;
                }
                Some(Value::String(s)) => {
                    sheet.write_string(row, col, s.as_str())?;
                }
                Some(other) => {
                    sheet.write_string(row, col, cell_text(Some(other)))?;
                }
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;
    Ok(())
}
