//! Tabular rendering of a reconciled run, for export.

use crate::model::{ReconResult, ReconciledRow, SideConversion, SourceTable, Value};

pub const COL_CURRENCY_ISO_REQ: &str = "currency_ISO_req";
pub const COL_CURRENCY_ISO_DS: &str = "currency_ISO_ds";
pub const COL_CURRENCY_ISO_PE: &str = "currency_ISO_pe";
pub const COL_FCV_DS_CONV: &str = "FCV_ds_conv";
pub const COL_RATE_DS: &str = "rate_ds";
pub const COL_SAME_CURRENCY_DS: &str = "same_currency_as_request_ds";
pub const COL_FCV_PE_CONV: &str = "FCV_pe_conv";
pub const COL_RATE_PE: &str = "rate_pe";
pub const COL_SAME_CURRENCY_PE: &str = "same_currency_as_request_pe";
pub const COL_DELTA: &str = "delta_pe_vs_ds";
pub const COL_MODEL_CHANGES: &str = "commercial_model_changes";

/// Computed columns, in output order, after the source columns.
pub const COMPUTED_COLUMNS: &[&str] = &[
    COL_CURRENCY_ISO_REQ,
    COL_CURRENCY_ISO_DS,
    COL_CURRENCY_ISO_PE,
    COL_FCV_DS_CONV,
    COL_RATE_DS,
    COL_SAME_CURRENCY_DS,
    COL_FCV_PE_CONV,
    COL_RATE_PE,
    COL_SAME_CURRENCY_PE,
    COL_DELTA,
    COL_MODEL_CHANGES,
];

fn text(s: Option<&str>) -> Value {
    s.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Empty)
}

fn conversion_cells(c: &SideConversion) -> [Value; 3] {
    [
        Value::from_option(c.converted),
        Value::from_option(c.rate),
        Value::Text(c.comparison.label().to_string()),
    ]
}

fn computed_cells(row: &ReconciledRow) -> Vec<Value> {
    let mut cells = Vec::with_capacity(COMPUTED_COLUMNS.len());
    cells.push(text(row.currency_iso.request.as_deref()));
    cells.push(text(row.currency_iso.deal_specialist.as_deref()));
    cells.push(text(row.currency_iso.pricing_engine.as_deref()));
    cells.extend(conversion_cells(&row.deal_specialist_conversion));
    cells.extend(conversion_cells(&row.pricing_engine_conversion));
    cells.push(Value::from_option(row.delta_pct));
    cells.push(Value::Text(row.model_change.to_string()));
    cells
}

impl ReconResult {
    /// Every suffixed source column followed by the computed columns.
    /// Absent deal-specialist or pricing-engine partners render as empty cells.
    pub fn merged_table(&self) -> SourceTable {
        let cols = &self.columns;
        let mut columns: Vec<String> = Vec::with_capacity(
            cols.request.len()
                + cols.deal_specialist.len()
                + cols.pricing_engine.len()
                + COMPUTED_COLUMNS.len(),
        );
        columns.extend(cols.request.iter().cloned());
        columns.extend(cols.deal_specialist.iter().cloned());
        columns.extend(cols.pricing_engine.iter().cloned());
        columns.extend(COMPUTED_COLUMNS.iter().map(|c| c.to_string()));

        let side_fields = |fields: Option<&Vec<Value>>, width: usize| -> Vec<Value> {
            let mut out = fields.cloned().unwrap_or_default();
            out.resize(width, Value::Empty);
            out
        };

        let rows = self
            .rows
            .iter()
            .map(|r| {
                let m = &r.merged;
                let mut row = Vec::with_capacity(columns.len());
                row.extend(side_fields(Some(&m.request.fields), cols.request.len()));
                row.extend(side_fields(
                    m.deal_specialist.as_ref().map(|d| &d.fields),
                    cols.deal_specialist.len(),
                ));
                row.extend(side_fields(
                    m.pricing_engine.as_ref().map(|p| &p.fields),
                    cols.pricing_engine.len(),
                ));
                row.extend(computed_cells(r));
                row
            })
            .collect();

        SourceTable::new(columns, rows)
    }

    /// Projection of the merged table onto `columns`, in that order.
    /// Columns the merged table lacks are kept, empty, so the layout stays fixed.
    pub fn summary_table(&self, columns: &[String]) -> SourceTable {
        let merged = self.merged_table();
        let picks: Vec<Option<usize>> = columns
            .iter()
            .map(|name| {
                let idx = merged.column_index(name);
                if idx.is_none() {
                    log::warn!("summary column '{name}' not present in merged table");
                }
                idx
            })
            .collect();

        let rows = (0..merged.rows.len())
            .map(|r| {
                picks
                    .iter()
                    .map(|p| p.map(|c| merged.cell(r, c).clone()).unwrap_or_default())
                    .collect()
            })
            .collect();

        SourceTable::new(columns.to_vec(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::currency::CurrencyTable;
    use crate::engine::run;
    use crate::fx::{ExchangeRateService, StaticRates};
    use crate::model::ReconInput;

    const CONFIG: &str = r#"
name = "table"

[sources.request]
file = "r"
[sources.request.columns]
quotation_id = "qid"
commercial_model = "Model"
contract_term = "Term"
currency = "Currency"

[sources.deal_specialist]
file = "d"
[sources.deal_specialist.columns]
quotation_id = "qid"
commercial_model = "Model"
contract_term = "Term"
currency = "Currency"
fcv = "Total"

[sources.pricing_engine]
file = "p"
[sources.pricing_engine.columns]
quotation_id = "qid"
commercial_model = "Model"
contract_term = "Term"
currency = "Currency"
fcv = "Total"
"#;

    fn table(cols: &[&str], rows: Vec<Vec<&str>>) -> SourceTable {
        SourceTable::new(
            cols.iter().map(|c| c.to_string()).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(Value::from_text).collect())
                .collect(),
        )
    }

    fn result() -> ReconResult {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let input = ReconInput {
            request: table(
                &["qid", "Model", "Term", "Currency"],
                vec![vec!["A", "B4B", "12", "euro"], vec!["B", "DIA", "24", "euro"]],
            ),
            deal_specialist: table(
                &["qid", "Model", "Term", "Currency", "Total"],
                vec![vec!["A", "B4B", "12", "euro", "1000"]],
            ),
            pricing_engine: table(
                &["qid", "Model", "Term", "Currency", "Total"],
                vec![vec!["A", "DIA", "12", "euro", "1100"]],
            ),
        };
        let mut rates = ExchangeRateService::new(StaticRates::new());
        run(&config, &CurrencyTable::builtin(), &input, &mut rates).unwrap()
    }

    #[test]
    fn merged_table_layout() {
        let merged = result().merged_table();
        assert_eq!(merged.columns[0], "id_req");
        assert!(merged.columns.contains(&"Source_ds".to_string()));
        assert_eq!(
            &merged.columns[merged.columns.len() - COMPUTED_COLUMNS.len()..],
            COMPUTED_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .as_slice()
        );
        assert_eq!(merged.rows.len(), 2);
        assert!(merged.rows.iter().all(|r| r.len() == merged.columns.len()));

        let col = |n: &str| merged.column_index(n).unwrap();
        assert_eq!(merged.cell(0, col(COL_CURRENCY_ISO_REQ)), &Value::Text("EUR".into()));
        assert_eq!(merged.cell(0, col(COL_FCV_DS_CONV)), &Value::Number(1000.0));
        assert_eq!(
            merged.cell(0, col(COL_SAME_CURRENCY_PE)),
            &Value::Text("same currency as reference".into())
        );
        assert_eq!(merged.cell(0, col(COL_MODEL_CHANGES)), &Value::Text("PE changed".into()));
        let delta = merged.cell(0, col(COL_DELTA)).as_f64().unwrap();
        assert!((delta - 10.0).abs() < 1e-9);

        // Row B has no partners
        assert_eq!(merged.cell(1, col("qid_ds")), &Value::Empty);
        assert_eq!(merged.cell(1, col(COL_DELTA)), &Value::Empty);
        assert_eq!(
            merged.cell(1, col(COL_SAME_CURRENCY_DS)),
            &Value::Text("no currency available".into())
        );
    }

    #[test]
    fn summary_projection_keeps_requested_order() {
        let cols: Vec<String> = ["commercial_model_changes", "id_req", "City_req"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let summary = result().summary_table(&cols);
        assert_eq!(summary.columns, cols);
        assert_eq!(summary.rows[0][0], Value::Text("PE changed".into()));
        assert_eq!(summary.rows[1][1], Value::Number(1.0));
        assert_eq!(summary.rows[0][2], Value::Empty);
    }
}
