// Run inputs: source tables, currency dictionary, static rates

use std::path::{Path, PathBuf};

use pricecheck_recon::config::{CurrencyConfig, ReconConfig, SourceConfig, SourceFormat};
use pricecheck_recon::fx::StaticRates;
use pricecheck_recon::model::{ReconInput, Source, SourceTable};
use pricecheck_recon::CurrencyTable;

use crate::{csv, xlsx};

/// `file` relative to `base_dir` unless already absolute.
pub fn resolve_path(base_dir: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Load one source table as its config describes.
pub fn load_source(base_dir: &Path, config: &SourceConfig) -> Result<SourceTable, String> {
    let path = resolve_path(base_dir, &config.file);
    match config.resolved_format() {
        SourceFormat::Xlsx => xlsx::import(&path, config.sheet.as_deref(), config.header_row),
        SourceFormat::Csv => {
            let delimiter = config.delimiter.map(|d| d as u8);
            csv::import(&path, delimiter, config.header_row)
        }
    }
}

/// Load all three sources. Errors name the failing source.
pub fn load_input(base_dir: &Path, config: &ReconConfig) -> Result<ReconInput, String> {
    let load = |source: Source| {
        let sc = config.sources.get(source);
        load_source(base_dir, sc).map_err(|e| format!("{source} ({}): {e}", sc.file))
    };
    Ok(ReconInput {
        request: load(Source::Request)?,
        deal_specialist: load(Source::DealSpecialist)?,
        pricing_engine: load(Source::PricingEngine)?,
    })
}

/// Builtin dictionary, or the configured table file, plus inline extras.
pub fn load_currency_table(base_dir: &Path, config: &CurrencyConfig) -> Result<CurrencyTable, String> {
    let mut table = match config.table {
        Some(ref file) => {
            let path = resolve_path(base_dir, file);
            let text = csv::read_file_as_utf8(&path)?;
            CurrencyTable::from_toml(&text).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => CurrencyTable::builtin(),
    };
    table.extend(&config.extra).map_err(|e| e.to_string())?;
    Ok(table)
}

pub fn load_static_rates(path: &Path) -> Result<StaticRates, String> {
    let text = csv::read_file_as_utf8(path)?;
    StaticRates::from_toml(&text).map_err(|e| format!("{}: {e}", path.display()))
}
