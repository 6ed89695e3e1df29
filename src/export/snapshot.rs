use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::types::ResultTable;

/// Last-resort lossless serialization of the records as MessagePack. Must
/// only fail when the filesystem itself does.
pub fn write_snapshot(table: &ResultTable, path: &Path) -> Result<()> {
    let bytes = rmp_serde::to_vec_named(table.records())
        .context("Failed to serialize records for the snapshot")?;
    fs::write(path, bytes)
        .with_context(|| format!("Failed to write snapshot file: {}", path.display()))?;
    Ok(())
}
