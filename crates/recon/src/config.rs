use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::Source;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub commercial_model: CommercialModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    pub request: SourceConfig,
    pub deal_specialist: SourceConfig,
    pub pricing_engine: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, source: Source) -> &SourceConfig {
        match source {
            Source::Request => &self.request,
            Source::DealSpecialist => &self.deal_specialist,
            Source::PricingEngine => &self.pricing_engine,
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where one source lives and how its raw columns map onto quotation fields.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    /// Inferred from the file extension when omitted.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    /// Workbook sheet; first sheet when omitted.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Zero-based row holding the header.
    #[serde(default)]
    pub header_row: usize,
    /// Delimiter for text sources; sniffed when omitted.
    #[serde(default)]
    pub delimiter: Option<char>,
    pub columns: ColumnMapping,
    #[serde(default)]
    pub filter: Option<RowFilter>,
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Raw column name → new name, applied before the mapping is read.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Columns to keep (after renames). All columns when omitted.
    #[serde(default)]
    pub keep: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Xlsx,
    Csv,
}

impl SourceConfig {
    /// Explicit format, else guessed from the extension (anything not a
    /// spreadsheet extension is read as delimited text).
    pub fn resolved_format(&self) -> SourceFormat {
        if let Some(format) = self.format {
            return format;
        }
        let ext = Path::new(&self.file)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => SourceFormat::Xlsx,
            _ => SourceFormat::Csv,
        }
    }
}

/// Column names (after renames) holding the fields the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub quotation_id: String,
    pub commercial_model: String,
    pub contract_term: String,
    pub currency: String,
    #[serde(default)]
    pub nrc: Option<String>,
    #[serde(default)]
    pub mrc: Option<String>,
    /// Precomputed FCV column; computed from NRC/MRC/term when omitted.
    #[serde(default)]
    pub fcv: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub key: JoinKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKey {
    /// Business quotation identifier.
    #[default]
    QuotationId,
    /// Synthetic per-source sequence number.
    Id,
}

// ---------------------------------------------------------------------------
// Currency + rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrencyConfig {
    /// TOML file of `"display name" = "ISO"` entries replacing the builtin table.
    #[serde(default)]
    pub table: Option<String>,
    /// Entries merged on top of the table.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

pub const DEFAULT_RATES_ENDPOINT: &str = "https://api.exchangerate.host/convert";
pub const DEFAULT_RATE_FIELD: &str = "/info/rate";
pub const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// JSON pointer to the rate inside the response body.
    #[serde(default = "default_rate_field")]
    pub rate_field: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding an API key, if the endpoint needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Query parameter the API key is sent as.
    #[serde(default = "default_api_key_param")]
    pub api_key_param: String,
    /// Skip pairs that already failed once during this run.
    #[serde(default = "default_true")]
    pub remember_failures: bool,
}

fn default_endpoint() -> String {
    DEFAULT_RATES_ENDPOINT.into()
}

fn default_rate_field() -> String {
    DEFAULT_RATE_FIELD.into()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_RATE_TIMEOUT_SECS
}

fn default_api_key_param() -> String {
    "access_key".into()
}

fn default_true() -> bool {
    true
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            rate_field: default_rate_field(),
            timeout_secs: default_timeout_secs(),
            api_key_env: None,
            api_key_param: default_api_key_param(),
            remember_failures: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Commercial model
// ---------------------------------------------------------------------------

/// The two comparable commercial-model categories.
#[derive(Debug, Clone, Deserialize)]
pub struct CommercialModelConfig {
    #[serde(default = "default_category_a")]
    pub category_a: String,
    #[serde(default = "default_category_b")]
    pub category_b: String,
}

fn default_category_a() -> String {
    "B4B".into()
}

fn default_category_b() -> String {
    "DIA".into()
}

impl Default for CommercialModelConfig {
    fn default() -> Self {
        Self {
            category_a: default_category_a(),
            category_b: default_category_b(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub const DEFAULT_SUMMARY_COLUMNS: &[&str] = &[
    "id_req",
    "Site_ID_req",
    "City_req",
    "Country_req",
    "Commercial_Model_req",
    "currency_ISO_req",
    "Main_Access_Provider_(last_mile_Provider)_ds",
    "FCV_ds_conv",
    "same_currency_as_request_ds",
    "Commercial_Model_ds",
    "Commercial_Model_pe",
    "Main_Access_Provider_(last_mile_Provider)_pe",
    "main_access_mrc_amt_quoted_by_pe",
    "FCV_pe_conv",
    "same_currency_as_request_pe",
    "commercial_model_changes",
    "delta_pe_vs_ds",
];

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Delimited export of the full merged table.
    #[serde(default)]
    pub merged: Option<String>,
    /// Delimited export of the pricing-summary projection.
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub merged_xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Write fractional numbers with `,` as decimal mark.
    #[serde(default = "default_true")]
    pub localize_decimals: bool,
    #[serde(default = "default_summary_columns")]
    pub summary_columns: Vec<String>,
}

fn default_delimiter() -> char {
    ','
}

fn default_summary_columns() -> Vec<String> {
    DEFAULT_SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            merged: None,
            summary: None,
            merged_xlsx: None,
            json: None,
            delimiter: default_delimiter(),
            localize_decimals: true,
            summary_columns: default_summary_columns(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for source in Source::ALL {
            let sc = self.sources.get(source);
            if sc.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{source}': file must not be empty"
                )));
            }
            if let Some(d) = sc.delimiter {
                if !d.is_ascii() {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{source}': delimiter must be ASCII, got '{d}'"
                    )));
                }
            }
            if sc.columns.quotation_id.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{source}': columns.quotation_id must not be empty"
                )));
            }
        }

        let a = self.commercial_model.category_a.trim();
        let b = self.commercial_model.category_b.trim();
        if a.is_empty() || b.is_empty() {
            return Err(ReconError::ConfigValidation(
                "commercial_model categories must not be empty".into(),
            ));
        }
        if a.eq_ignore_ascii_case(b) {
            return Err(ReconError::ConfigValidation(format!(
                "commercial_model categories must differ, both are '{a}'"
            )));
        }

        if self.rates.timeout_secs == 0 {
            return Err(ReconError::ConfigValidation(
                "rates.timeout_secs must be greater than 0".into(),
            ));
        }

        if !self.output.delimiter.is_ascii() {
            return Err(ReconError::ConfigValidation(format!(
                "output.delimiter must be ASCII, got '{}'",
                self.output.delimiter
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
