// Delimited text import/export

use std::io::Read;
use std::path::Path;

use pricecheck_recon::model::{format_number, SourceTable, Value};

/// Import a delimited file. `delimiter` is sniffed when `None`; the header
/// is taken from row `header_row` and earlier rows are skipped.
pub fn import(path: &Path, delimiter: Option<u8>, header_row: usize) -> Result<SourceTable, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    import_from_string(&content, delimiter, header_row)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with line 1, weighted by its field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

pub fn import_from_string(content: &str, delimiter: u8, header_row: usize) -> Result<SourceTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records().skip(header_row);
    let header = match records.next() {
        Some(r) => r.map_err(|e| e.to_string())?,
        None => return Err(format!("no header at row {header_row}")),
    };
    let columns: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<Value> = record.iter().map(Value::from_text).collect();
        row.resize(columns.len().max(row.len()), Value::Empty);
        rows.push(row);
    }

    Ok(SourceTable::new(columns, rows))
}

/// Text of one cell for export. Fractional numbers use `,` as decimal mark
/// when `localize` is set, whether computed or loaded as numeric text.
pub fn cell_text(value: &Value, localize: bool) -> String {
    match value {
        Value::Number(n) if localize => localize_decimal(&format_number(*n)),
        Value::Text(s) if localize => {
            let trimmed = s.trim();
            if is_decimal_text(trimmed) {
                localize_decimal(trimmed)
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}

/// Plain `-12.5` style number text with a `.` decimal mark.
fn is_decimal_text(s: &str) -> bool {
    s.contains('.')
        && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        && s.parse::<f64>().is_ok_and(f64::is_finite)
}

/// `"1234.5"` → `"1234,5"`. Integers and non-numeric text are unchanged.
pub fn localize_decimal(s: &str) -> String {
    if s.parse::<f64>().is_ok() {
        s.replacen('.', ",", 1)
    } else {
        s.to_string()
    }
}

pub fn export(table: &SourceTable, path: &Path, delimiter: u8, localize: bool) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;

    writer.write_record(&table.columns).map_err(|e| e.to_string())?;
    for row in &table.rows {
        let record: Vec<String> = row.iter().map(|v| cell_text(v, localize)).collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}
