//! Column-name harmonization shared by all three sources.

use crate::model::Source;

/// Separator replacing internal whitespace and joining the source suffix.
pub const SEPARATOR: char = '_';

/// `"Main Access Currency"` + request → `"Main_Access_Currency_req"`.
///
/// Every whitespace run collapses to one separator; leading and trailing
/// whitespace is dropped.
pub fn normalize_column(name: &str, source: Source) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, word) in name.split_whitespace().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(word);
    }
    out.push(SEPARATOR);
    out.push_str(source.suffix());
    out
}

/// Normalize every name in `columns`, preserving order.
pub fn normalize_columns(columns: &[String], source: Source) -> Vec<String> {
    columns.iter().map(|c| normalize_column(c, source)).collect()
}
