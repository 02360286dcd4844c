//! `pricecheck run / validate / currencies`: config-driven reconciliation.

use std::path::{Path, PathBuf};

use pricecheck_io::{load_currency_table, load_input, load_static_rates, write_outputs};
use pricecheck_rates::HttpRateSource;
use pricecheck_recon::engine::{currency_report, prepare};
use pricecheck_recon::{ExchangeRateService, RateSource, ReconConfig, ReconResult};

use crate::exit_codes::{
    EXIT_RECON_GAPS, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME, EXIT_RECON_SOURCE,
};
use crate::CliError;

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError::new(code, msg)
}

/// Parse + validate the config. Relative paths inside it resolve against
/// the returned directory.
fn load_config(config_path: &Path) -> Result<(ReconConfig, PathBuf), CliError> {
    let config = ReconConfig::from_file(config_path).map_err(|e| {
        recon_err(EXIT_RECON_INVALID_CONFIG, format!("{}: {e}", config_path.display()))
    })?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;
    eprintln!(
        "{}: ok ({}, join on {:?})",
        config_path.display(),
        config.name,
        config.join.key
    );
    Ok(())
}

pub fn cmd_currencies(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let currencies = load_currency_table(&base_dir, &config.currency)
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e))?;
    let input = load_input(&base_dir, &config).map_err(|e| recon_err(EXIT_RECON_SOURCE, e))?;

    let prepared = prepare(&config, &input)?;
    let report = currency_report(&prepared, &currencies);

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    eprintln!(
        "{} currency names, {} unmapped",
        report.entries.len(),
        report.unmapped_count()
    );
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    rates_file: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;

    let currencies = load_currency_table(&base_dir, &config.currency)
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e))?;
    log::info!("currency dictionary: {} names", currencies.len());

    let input = load_input(&base_dir, &config).map_err(|e| recon_err(EXIT_RECON_SOURCE, e))?;

    let source: Box<dyn RateSource> = match rates_file {
        Some(ref path) => {
            log::info!("using static rates from {}", path.display());
            Box::new(load_static_rates(path).map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e))?)
        }
        None => {
            let http = HttpRateSource::new(&config.rates)
                .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))?;
            log::info!("using exchange-rate service at {}", http.endpoint());
            Box::new(http)
        }
    };
    let mut rates = ExchangeRateService::new(source).remember_failures(config.rates.remember_failures);

    let result = pricecheck_recon::run(&config, &currencies, &input, &mut rates)?;

    write_outputs(&base_dir, &config.output, &result)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e))?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    let s = &result.summary;
    if strict && (s.unmapped_currencies > 0 || s.rate_failures > 0) {
        return Err(recon_err(
            EXIT_RECON_GAPS,
            format!(
                "{} unmapped currencies, {} failed rate lookups",
                s.unmapped_currencies, s.rate_failures
            ),
        )
        .with_hint("add names under [currency.extra] or pass --rates with a static rate file"));
    }

    Ok(())
}

/// Human summary to stderr, led by the per-name currency report.
fn print_summary(result: &ReconResult) {
    for line in result.currency_report.lines() {
        eprintln!("currency: {line}");
    }
    let s = &result.summary;
    eprintln!(
        "{}: {} quotations, {} matched by deal specialist, {} by pricing engine",
        result.meta.config_name, s.total_rows, s.deal_specialist_matched, s.pricing_engine_matched,
    );
    eprintln!(
        "deltas: {} computed, {} outliers, {} zeroed (infinite)",
        s.rows_with_delta, s.outliers, s.zeroed_infinite_deltas,
    );
    if let Some(ref o) = result.outliers {
        eprintln!(
            "fences: [{}, {}] (q1 {}, q3 {})",
            o.stats.lower_fence, o.stats.upper_fence, o.stats.q1, o.stats.q3
        );
    }
    for f in &result.rate_failures {
        eprintln!("rate {}->{} failed: {}", f.from, f.to, f.error);
    }
}
