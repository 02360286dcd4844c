// Configured run outputs

use std::path::{Path, PathBuf};

use pricecheck_recon::config::OutputConfig;
use pricecheck_recon::ReconResult;

use crate::source::resolve_path;
use crate::{csv, json, xlsx};

/// Write every output named in `config`, relative to `base_dir`.
/// Returns the paths written, in order.
pub fn write_outputs(
    base_dir: &Path,
    config: &OutputConfig,
    result: &ReconResult,
) -> Result<Vec<PathBuf>, String> {
    let mut written = Vec::new();
    let delimiter = config.delimiter as u8;

    let needs_merged = config.merged.is_some() || config.merged_xlsx.is_some();
    let merged = needs_merged.then(|| result.merged_table());

    if let (Some(file), Some(table)) = (config.merged.as_ref(), merged.as_ref()) {
        let path = resolve_path(base_dir, file);
        csv::export(table, &path, delimiter, config.localize_decimals)?;
        written.push(path);
    }

    if let Some(ref file) = config.summary {
        let path = resolve_path(base_dir, file);
        let table = result.summary_table(&config.summary_columns);
        csv::export(&table, &path, delimiter, config.localize_decimals)?;
        written.push(path);
    }

    if let (Some(file), Some(table)) = (config.merged_xlsx.as_ref(), merged.as_ref()) {
        let path = resolve_path(base_dir, file);
        xlsx::export(table, &path, "merged")?;
        written.push(path);
    }

    if let Some(ref file) = config.json {
        let path = resolve_path(base_dir, file);
        json::export(result, &path)?;
        written.push(path);
    }

    for path in &written {
        log::info!("wrote {}", path.display());
    }
    Ok(written)
}
