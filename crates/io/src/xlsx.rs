// Excel file import (xlsx, xlsm, xls, xlsb, ods) and export (xlsx only)
//
// Import reads one sheet into a flat table of values; formulas come in as
// their cached results. Export is a plain snapshot with a bold header row.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use pricecheck_recon::model::{format_number, SourceTable, Value};

/// Excel's row limit; exports beyond it fail instead of truncating.
const MAX_ROWS: usize = 1_048_576;

/// Import one sheet (the first one when `sheet` is `None`). `header_row` is
/// the zero-based sheet row holding the column names; rows above it are
/// skipped. Blank header cells are named `Unnamed: {index}`.
pub fn import(path: &Path, sheet: Option<&str>, header_row: usize) -> Result<SourceTable, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file {}: {}", path.display(), e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(format!(
                    "sheet '{}' not found in {} (sheets: {})",
                    name,
                    path.display(),
                    sheet_names.join(", ")
                ));
            }
            name.to_string()
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    // Range starts at the first used cell, not necessarily A1
    let (first_row, first_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let skip = header_row.saturating_sub(first_row);

    // Leading unused columns are padded so indices match sheet columns
    let to_values = |r: &[Data]| -> Vec<Value> {
        std::iter::repeat(Value::Empty)
            .take(first_col)
            .chain(r.iter().map(cell_to_value))
            .collect()
    };

    let mut rows_iter = range.rows().skip(skip);
    let header = rows_iter
        .next()
        .ok_or_else(|| format!("sheet '{}' has no header at row {}", sheet_name, header_row))?;
    let columns: Vec<String> = to_values(header)
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.as_text().unwrap_or_default();
            if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            }
        })
        .collect();

    let rows: Vec<Vec<Value>> = rows_iter
        .map(to_values)
        .filter(|r: &Vec<Value>| !r.iter().all(Value::is_empty))
        .collect();

    Ok(SourceTable::new(columns, rows))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::from_text(s),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        // Serial date number, 1900 system
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Write `table` to a single-sheet workbook.
pub fn export(table: &SourceTable, path: &Path, sheet_name: &str) -> Result<(), String> {
    if table.rows.len() + 1 > MAX_ROWS {
        return Err(format!(
            "{} rows exceed the XLSX limit of {}",
            table.rows.len(),
            MAX_ROWS - 1
        ));
    }

    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(|e| format!("Failed to write header '{}': {}", name, e))?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let row32 = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let col16 = c as u16;
            match value {
                Value::Empty => {}
                Value::Number(n) if n.is_finite() => {
                    worksheet
                        .write_number(row32, col16, *n)
                        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col16, e))?;
                }
                Value::Number(n) => {
                    worksheet
                        .write_string(row32, col16, format_number(*n))
                        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col16, e))?;
                }
                Value::Text(s) => {
                    worksheet
                        .write_string(row32, col16, s)
                        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col16, e))?;
                }
            }
        }
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(())
}
