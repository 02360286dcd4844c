use std::cmp::Ordering;

use crate::classify::normalize_commercial_model;
use crate::config::{CommercialModelConfig, SourceConfig};
use crate::error::ReconError;
use crate::model::{compute_fcv, PreparedSource, QuotationRecord, Source, SourceTable, Value};
use crate::schema::normalize_columns;

pub const ID_COLUMN: &str = "id";
pub const SOURCE_COLUMN: &str = "Source";
pub const FCV_COLUMN: &str = "FCV";

/// Filter, sort, number and tag one raw source, then extract typed
/// quotation fields and normalize its column names.
pub fn prepare_source(
    source: Source,
    table: &SourceTable,
    config: &SourceConfig,
    models: &CommercialModelConfig,
) -> Result<PreparedSource, ReconError> {
    let raw_idx = |name: &str| -> Result<usize, ReconError> {
        table.column_index(name).ok_or_else(|| ReconError::MissingColumn {
            source,
            column: name.into(),
        })
    };

    // Filter
    let mut row_order: Vec<usize> = (0..table.rows.len()).collect();
    if let Some(ref filter) = config.filter {
        let fi = raw_idx(&filter.column)?;
        row_order.retain(|&r| {
            let val = table.cell(r, fi).as_text().unwrap_or_default();
            filter.values.iter().any(|v| v.trim() == val)
        });
    }

    // Sort (stable)
    if let Some(ref sort_col) = config.sort_by {
        let si = raw_idx(sort_col)?;
        row_order.sort_by(|&a, &b| compare_cells(table.cell(a, si), table.cell(b, si)));
    }

    // id + raw columns + Source. Raw columns already called id/Source are replaced.
    let raw_cols: Vec<usize> = (0..table.columns.len())
        .filter(|&c| table.columns[c] != ID_COLUMN && table.columns[c] != SOURCE_COLUMN)
        .collect();

    let mut columns: Vec<String> = Vec::with_capacity(raw_cols.len() + 3);
    columns.push(ID_COLUMN.to_string());
    for &c in &raw_cols {
        let name = &table.columns[c];
        columns.push(config.rename.get(name).cloned().unwrap_or_else(|| name.clone()));
    }
    columns.push(SOURCE_COLUMN.to_string());

    let mut rows: Vec<Vec<Value>> = row_order
        .iter()
        .enumerate()
        .map(|(seq, &r)| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(Value::Number(seq as f64));
            for &c in &raw_cols {
                row.push(table.cell(r, c).clone());
            }
            row.push(Value::Text(source.tag().to_string()));
            row
        })
        .collect();

    // Projection
    if let Some(ref keep) = config.keep {
        let mut selected: Vec<usize> = vec![0];
        for name in keep {
            if name == ID_COLUMN || name == SOURCE_COLUMN {
                continue;
            }
            let i = columns.iter().position(|c| c == name).ok_or_else(|| {
                ReconError::MissingColumn {
                    source,
                    column: name.clone(),
                }
            })?;
            if !selected.contains(&i) {
                selected.push(i);
            }
        }
        selected.push(columns.len() - 1);
        columns = selected.iter().map(|&i| columns[i].clone()).collect();
        rows = rows
            .into_iter()
            .map(|row| selected.iter().map(|&i| row[i].clone()).collect())
            .collect();
    }

    // Typed fields
    let idx = |name: &str| -> Result<usize, ReconError> {
        columns.iter().position(|c| c == name).ok_or_else(|| ReconError::MissingColumn {
            source,
            column: name.into(),
        })
    };
    let opt_idx = |name: &Option<String>| -> Result<Option<usize>, ReconError> {
        name.as_deref().map(idx).transpose()
    };

    let col = &config.columns;
    let quotation_idx = idx(&col.quotation_id)?;
    let model_idx = idx(&col.commercial_model)?;
    let term_idx = idx(&col.contract_term)?;
    let currency_idx = idx(&col.currency)?;
    let nrc_idx = opt_idx(&col.nrc)?;
    let mrc_idx = opt_idx(&col.mrc)?;
    let fcv_idx = opt_idx(&col.fcv)?;

    let append_fcv = fcv_idx.is_none()
        && nrc_idx.is_some()
        && mrc_idx.is_some()
        && !columns.iter().any(|c| c == FCV_COLUMN);
    if append_fcv {
        columns.push(FCV_COLUMN.to_string());
    }

    let mut records = Vec::with_capacity(rows.len());
    for (seq, mut fields) in rows.into_iter().enumerate() {
        let quotation_id = fields[quotation_idx].as_text().unwrap_or_default();

        let commercial_model = fields[model_idx]
            .as_text()
            .map(|m| normalize_commercial_model(&m, models));
        if let Some(ref m) = commercial_model {
            fields[model_idx] = Value::Text(m.clone());
        }

        let contract_term = fields[term_idx].as_f64();
        let currency = fields[currency_idx].as_text();
        let nrc = nrc_idx.and_then(|i| fields[i].as_f64());
        let mrc = mrc_idx.and_then(|i| fields[i].as_f64());
        let fcv = match fcv_idx {
            Some(i) => fields[i].as_f64(),
            None => compute_fcv(nrc, mrc, contract_term),
        };
        if append_fcv {
            fields.push(Value::from_option(fcv));
        }

        records.push(QuotationRecord {
            id: seq as u64,
            quotation_id,
            source,
            commercial_model,
            contract_term,
            currency,
            nrc,
            mrc,
            fcv,
            fields,
        });
    }

    log::debug!("{source}: {} of {} rows prepared", records.len(), table.rows.len());

    Ok(PreparedSource {
        source,
        columns: normalize_columns(&columns, source),
        records,
    })
}

/// Numbers before text, empties last; numbers numerically, text lexically.
fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_string().cmp(&b.to_string()),
    }
}
