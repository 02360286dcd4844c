use crate::currency::CurrencyReport;
use crate::fx::RateFailure;
use crate::model::{ReconSummary, ReconciledRow};
use crate::stats::OutlierReport;

/// Compute summary counts from reconciled rows and the run's side reports.
pub fn compute_summary(
    rows: &[ReconciledRow],
    currency_report: &CurrencyReport,
    rate_failures: &[RateFailure],
    outliers: Option<&OutlierReport>,
) -> ReconSummary {
    let mut deal_specialist_matched = 0;
    let mut pricing_engine_matched = 0;
    let mut rows_with_delta = 0;
    let mut zeroed_infinite_deltas = 0;

    for r in rows {
        if r.merged.deal_specialist.is_some() {
            deal_specialist_matched += 1;
        }
        if r.merged.pricing_engine.is_some() {
            pricing_engine_matched += 1;
        }
        if r.delta_pct.is_some() {
            rows_with_delta += 1;
        }
        if r.delta_zeroed_infinite {
            zeroed_infinite_deltas += 1;
        }
    }

    ReconSummary {
        total_rows: rows.len(),
        deal_specialist_matched,
        pricing_engine_matched,
        unmapped_currencies: currency_report.unmapped_count(),
        rate_failures: rate_failures.len(),
        rows_with_delta,
        outliers: outliers.map_or(0, |o| o.outlier_ids.len()),
        zeroed_infinite_deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ModelChange;
    use crate::convert::CurrencyComparison;
    use crate::currency::{CurrencyReport, CurrencyTable};
    use crate::model::{MergedRecord, QuotationRecord, SideConversion, SideCurrencies, Source};

    fn rec(source: Source) -> QuotationRecord {
        QuotationRecord {
            id: 0,
            quotation_id: "Q".into(),
            source,
            commercial_model: None,
            contract_term: None,
            currency: None,
            nrc: None,
            mrc: None,
            fcv: None,
            fields: Vec::new(),
        }
    }

    fn no_conversion() -> SideConversion {
        SideConversion {
            fcv: None,
            converted: None,
            rate: None,
            comparison: CurrencyComparison::NoCurrencyAvailable,
        }
    }

    fn row(ds: bool, pe: bool, delta: Option<f64>, zeroed: bool) -> ReconciledRow {
        ReconciledRow {
            merged: MergedRecord {
                request: rec(Source::Request),
                deal_specialist: ds.then(|| rec(Source::DealSpecialist)),
                pricing_engine: pe.then(|| rec(Source::PricingEngine)),
            },
            currency_iso: SideCurrencies::default(),
            deal_specialist_conversion: no_conversion(),
            pricing_engine_conversion: no_conversion(),
            delta_pct: delta,
            delta_zeroed_infinite: zeroed,
            model_change: ModelChange::NotComparable,
        }
    }

    #[test]
    fn summary_counts() {
        let rows = vec![
            row(true, true, Some(12.0), false),
            row(true, true, Some(0.0), true),
            row(true, false, None, false),
            row(false, false, None, false),
        ];
        let report = CurrencyReport::build(["euro", "space bucks"], &CurrencyTable::builtin());
        let failures = vec![RateFailure {
            from: "GBP".into(),
            to: "EUR".into(),
            error: "timeout".into(),
        }];

        let summary = compute_summary(&rows, &report, &failures, None);
        assert_eq!(summary.total_rows, 4);
        assert_eq!(summary.deal_specialist_matched, 3);
        assert_eq!(summary.pricing_engine_matched, 2);
        assert_eq!(summary.unmapped_currencies, 1);
        assert_eq!(summary.rate_failures, 1);
        assert_eq!(summary.rows_with_delta, 2);
        assert_eq!(summary.zeroed_infinite_deltas, 1);
        assert_eq!(summary.outliers, 0);
    }
}
