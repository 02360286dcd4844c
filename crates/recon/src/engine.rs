use crate::classify::{classify_model_change, delta_outcome, Delta};
use crate::config::ReconConfig;
use crate::convert::{convert, CurrencyComparison};
use crate::currency::{CurrencyReport, CurrencyTable};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::fx::{ExchangeRateService, RateSource};
use crate::join::join;
use crate::model::{
    MergedColumns, MergedRecord, PreparedSource, QuotationRecord, ReconInput, ReconMeta,
    ReconResult, ReconciledRow, SideConversion, SideCurrencies, Source,
};
use crate::prepare::prepare_source;
use crate::stats::OutlierReport;

/// The three prepared sources of one run.
pub struct PreparedInput {
    pub request: PreparedSource,
    pub deal_specialist: PreparedSource,
    pub pricing_engine: PreparedSource,
}

impl PreparedInput {
    pub fn get(&self, source: Source) -> &PreparedSource {
        match source {
            Source::Request => &self.request,
            Source::DealSpecialist => &self.deal_specialist,
            Source::PricingEngine => &self.pricing_engine,
        }
    }
}

/// Filter, number, tag and normalize all three raw tables.
pub fn prepare(config: &ReconConfig, input: &ReconInput) -> Result<PreparedInput, ReconError> {
    let models = &config.commercial_model;
    let sources = &config.sources;
    Ok(PreparedInput {
        request: prepare_source(Source::Request, &input.request, &sources.request, models)?,
        deal_specialist: prepare_source(
            Source::DealSpecialist,
            &input.deal_specialist,
            &sources.deal_specialist,
            models,
        )?,
        pricing_engine: prepare_source(
            Source::PricingEngine,
            &input.pricing_engine,
            &sources.pricing_engine,
            models,
        )?,
    })
}

/// Every distinct currency name across the three sources, resolved against
/// `currencies`. Needs no exchange rates.
pub fn currency_report(prepared: &PreparedInput, currencies: &CurrencyTable) -> CurrencyReport {
    let names = Source::ALL.into_iter().flat_map(|s| {
        prepared
            .get(s)
            .records
            .iter()
            .filter_map(|r| r.currency.as_deref())
    });
    CurrencyReport::build(names, currencies)
}

fn log_currency_report(report: &CurrencyReport) {
    for entry in &report.entries {
        match entry.iso {
            Some(ref iso) => log::info!("currency '{}' -> {iso}", entry.name),
            None => log::warn!("currency '{}' has no ISO mapping", entry.name),
        }
    }
}

/// Run the full reconciliation: prepare, report currencies, join, convert
/// both quoting sides into the request currency, compute deltas and
/// model-change labels, then outlier fences over the deltas.
pub fn run<S: RateSource>(
    config: &ReconConfig,
    currencies: &CurrencyTable,
    input: &ReconInput,
    rates: &mut ExchangeRateService<S>,
) -> Result<ReconResult, ReconError> {
    let prepared = prepare(config, input)?;

    let currency_report = currency_report(&prepared, currencies);
    log_currency_report(&currency_report);

    let merged = join(
        &prepared.request,
        &prepared.deal_specialist,
        &prepared.pricing_engine,
        config.join.key,
    )?;

    let rows: Vec<ReconciledRow> = merged
        .into_iter()
        .map(|m| reconcile_row(m, config, currencies, rates))
        .collect();

    let deltas: Vec<(u64, f64)> = rows
        .iter()
        .filter_map(|r| r.delta_pct.map(|d| (r.merged.request.id, d)))
        .collect();
    let outliers = OutlierReport::build(&deltas);
    if let Some(ref o) = outliers {
        log::info!(
            "delta fences [{}, {}]: {} outliers of {}",
            o.stats.lower_fence,
            o.stats.upper_fence,
            o.outlier_ids.len(),
            deltas.len()
        );
    }

    let rate_failures = rates.failures().to_vec();
    let summary = compute_summary(&rows, &currency_report, &rate_failures, outliers.as_ref());

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        currency_report,
        rate_failures,
        outliers,
        rows,
        columns: MergedColumns {
            request: prepared.request.columns,
            deal_specialist: prepared.deal_specialist.columns,
            pricing_engine: prepared.pricing_engine.columns,
        },
    })
}

fn reconcile_row<S: RateSource>(
    merged: MergedRecord,
    config: &ReconConfig,
    currencies: &CurrencyTable,
    rates: &mut ExchangeRateService<S>,
) -> ReconciledRow {
    let iso = |r: Option<&QuotationRecord>| {
        r.and_then(|r| r.currency.as_deref())
            .and_then(|name| currencies.resolve(name))
            .map(String::from)
    };
    let currency_iso = SideCurrencies {
        request: iso(Some(&merged.request)),
        deal_specialist: iso(merged.deal_specialist.as_ref()),
        pricing_engine: iso(merged.pricing_engine.as_ref()),
    };

    let reference = currency_iso.request.as_deref();
    let mut side = |record: Option<&QuotationRecord>, code: Option<&str>| {
        let fcv = record.and_then(|r| r.fcv);
        let c = convert(fcv, code, reference, rates);
        SideConversion {
            fcv,
            converted: c.amount,
            rate: c.rate,
            comparison: CurrencyComparison::from_rate(c.rate),
        }
    };
    let deal_specialist_conversion = side(
        merged.deal_specialist.as_ref(),
        currency_iso.deal_specialist.as_deref(),
    );
    let pricing_engine_conversion = side(
        merged.pricing_engine.as_ref(),
        currency_iso.pricing_engine.as_deref(),
    );

    let delta = delta_outcome(
        pricing_engine_conversion.converted,
        deal_specialist_conversion.converted,
    );
    if delta == Delta::ZeroedInfinite {
        log::debug!(
            "quotation '{}': deal-specialist FCV is zero, delta reported as 0",
            merged.request.quotation_id
        );
    }

    let model_change = classify_model_change(
        merged.request.commercial_model.as_deref(),
        merged
            .deal_specialist
            .as_ref()
            .and_then(|r| r.commercial_model.as_deref()),
        merged
            .pricing_engine
            .as_ref()
            .and_then(|r| r.commercial_model.as_deref()),
        &config.commercial_model,
    );

    ReconciledRow {
        merged,
        currency_iso,
        deal_specialist_conversion,
        pricing_engine_conversion,
        delta_pct: delta.value(),
        delta_zeroed_infinite: delta == Delta::ZeroedInfinite,
        model_change,
    }
}
