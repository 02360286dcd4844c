use std::fmt;

use serde::Serialize;

use crate::classify::ModelChange;
use crate::convert::CurrencyComparison;
use crate::currency::CurrencyReport;
use crate::fx::RateFailure;
use crate::stats::OutlierReport;

// ---------------------------------------------------------------------------
// Cells + raw tables
// ---------------------------------------------------------------------------

/// A single cell as loaded from a source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Value {
    /// Build a value from loader text. Blank text becomes `Empty`.
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Value::Empty
        } else {
            Value::Text(s.to_string())
        }
    }

    pub fn from_option(n: Option<f64>) -> Self {
        n.map(Value::Number).unwrap_or(Value::Empty)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_nan(),
        }
    }

    /// Trimmed textual form, `None` when blank.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(self.to_string().trim().to_string())
    }

    /// Numeric form. Text is parsed leniently: thousands separators and
    /// either `.` or `,` as decimal mark are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Empty => None,
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_number(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Integers without decimals, everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        // "1.234,56" → comma is the decimal mark
        (Some(d), Some(c)) if c > d => cleaned.replace('.', "").replace(',', "."),
        // "1,234.56" → dot is the decimal mark
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A table as returned by a loader: ordered header + rows.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SourceTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, col); rows shorter than the header read as `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        static EMPTY: Value = Value::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Request,
    DealSpecialist,
    PricingEngine,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Request, Source::DealSpecialist, Source::PricingEngine];

    /// Column suffix used after normalization.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Request => "req",
            Self::DealSpecialist => "ds",
            Self::PricingEngine => "pe",
        }
    }

    /// Value written into each row's `Source` column.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Request => "Request B-End",
            Self::DealSpecialist => "Deal Specialist",
            Self::PricingEngine => "Pricing Engine",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::DealSpecialist => write!(f, "deal_specialist"),
            Self::PricingEngine => write!(f, "pricing_engine"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quotation records
// ---------------------------------------------------------------------------

/// One priced item from one source, after preparation.
#[derive(Debug, Clone, Serialize)]
pub struct QuotationRecord {
    /// Synthetic sequence number, unique within its source.
    pub id: u64,
    pub quotation_id: String,
    pub source: Source,
    pub commercial_model: Option<String>,
    pub contract_term: Option<f64>,
    pub currency: Option<String>,
    pub nrc: Option<f64>,
    pub mrc: Option<f64>,
    pub fcv: Option<f64>,
    /// Every prepared column, aligned with `PreparedSource::columns`.
    #[serde(skip)]
    pub fields: Vec<Value>,
}

/// Full contract value: NRC + MRC × term. Undefined unless all three are present.
pub fn compute_fcv(nrc: Option<f64>, mrc: Option<f64>, contract_term: Option<f64>) -> Option<f64> {
    Some(nrc? + mrc? * contract_term?)
}

/// One source after filtering, id assignment and column normalization.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub source: Source,
    /// Normalized (suffixed) column names.
    pub columns: Vec<String>,
    pub records: Vec<QuotationRecord>,
}

/// Request row with its optional deal-specialist and pricing-engine partners.
#[derive(Debug, Clone, Serialize)]
pub struct MergedRecord {
    pub request: QuotationRecord,
    pub deal_specialist: Option<QuotationRecord>,
    pub pricing_engine: Option<QuotationRecord>,
}

impl MergedRecord {
    pub fn side(&self, source: Source) -> Option<&QuotationRecord> {
        match source {
            Source::Request => Some(&self.request),
            Source::DealSpecialist => self.deal_specialist.as_ref(),
            Source::PricingEngine => self.pricing_engine.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciled output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct SideCurrencies {
    pub request: Option<String>,
    pub deal_specialist: Option<String>,
    pub pricing_engine: Option<String>,
}

/// FCV of one quoting side converted into the request currency.
#[derive(Debug, Clone, Serialize)]
pub struct SideConversion {
    pub fcv: Option<f64>,
    pub converted: Option<f64>,
    pub rate: Option<f64>,
    pub comparison: CurrencyComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciledRow {
    #[serde(flatten)]
    pub merged: MergedRecord,
    pub currency_iso: SideCurrencies,
    pub deal_specialist_conversion: SideConversion,
    pub pricing_engine_conversion: SideConversion,
    pub delta_pct: Option<f64>,
    /// Delta was ±∞ and has been reported as 0.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delta_zeroed_infinite: bool,
    pub model_change: ModelChange,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedColumns {
    pub request: Vec<String>,
    pub deal_specialist: Vec<String>,
    pub pricing_engine: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_rows: usize,
    pub deal_specialist_matched: usize,
    pub pricing_engine_matched: usize,
    pub unmapped_currencies: usize,
    pub rate_failures: usize,
    pub rows_with_delta: usize,
    pub outliers: usize,
    pub zeroed_infinite_deltas: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub currency_report: CurrencyReport,
    pub rate_failures: Vec<RateFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers: Option<OutlierReport>,
    pub rows: Vec<ReconciledRow>,
    #[serde(skip)]
    pub columns: MergedColumns,
}

/// Pre-loaded raw tables, one per source.
pub struct ReconInput {
    pub request: SourceTable,
    pub deal_specialist: SourceTable,
    pub pricing_engine: SourceTable,
}
