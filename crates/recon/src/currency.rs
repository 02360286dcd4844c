//! Free-text currency name → ISO 4217 code.
//!
//! The lookup table is a value handed to the pipeline, never a global, so
//! a run can swap or extend it without touching pipeline code.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::error::ReconError;

const BUILTIN: &[(&str, &str)] = &[
    ("euro", "EUR"),
    ("euros", "EUR"),
    ("us dollar", "USD"),
    ("us dollars", "USD"),
    ("usd dollar", "USD"),
    ("united states dollar", "USD"),
    ("american dollar", "USD"),
    ("dollar", "USD"),
    ("pound sterling", "GBP"),
    ("british pound", "GBP"),
    ("sterling", "GBP"),
    ("swiss franc", "CHF"),
    ("danish krone", "DKK"),
    ("norwegian krone", "NOK"),
    ("swedish krona", "SEK"),
    ("polish zloty", "PLN"),
    ("czech koruna", "CZK"),
    ("hungarian forint", "HUF"),
    ("romanian leu", "RON"),
    ("bulgarian lev", "BGN"),
    ("turkish lira", "TRY"),
    ("russian ruble", "RUB"),
    ("ukrainian hryvnia", "UAH"),
    ("canadian dollar", "CAD"),
    ("mexican peso", "MXN"),
    ("brazilian real", "BRL"),
    ("argentine peso", "ARS"),
    ("chilean peso", "CLP"),
    ("colombian peso", "COP"),
    ("peruvian sol", "PEN"),
    ("uruguayan peso", "UYU"),
    ("japanese yen", "JPY"),
    ("yen", "JPY"),
    ("chinese yuan", "CNY"),
    ("yuan renminbi", "CNY"),
    ("renminbi", "CNY"),
    ("hong kong dollar", "HKD"),
    ("singapore dollar", "SGD"),
    ("indian rupee", "INR"),
    ("south korean won", "KRW"),
    ("australian dollar", "AUD"),
    ("new zealand dollar", "NZD"),
    ("south african rand", "ZAR"),
    ("moroccan dirham", "MAD"),
    ("egyptian pound", "EGP"),
    ("uae dirham", "AED"),
    ("saudi riyal", "SAR"),
    ("israeli new shekel", "ILS"),
];

/// Normalized lookup key: trimmed, lowercase, single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Immutable (per run) currency-name dictionary.
#[derive(Debug, Clone, Default)]
pub struct CurrencyTable {
    names: HashMap<String, String>,
    codes: BTreeSet<String>,
}

impl CurrencyTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dictionary shipped with the crate.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, code) in BUILTIN {
            table.insert(name, code);
        }
        table
    }

    /// Parse `"display name" = "ISO"` entries.
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let entries: BTreeMap<String, String> =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        let mut table = Self::empty();
        table.extend(&entries)?;
        Ok(table)
    }

    /// Merge entries, later entries overriding earlier ones.
    pub fn extend(&mut self, entries: &BTreeMap<String, String>) -> Result<(), ReconError> {
        for (name, code) in entries {
            let code = code.trim();
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ReconError::ConfigValidation(format!(
                    "currency '{name}': '{code}' is not a three-letter ISO code"
                )));
            }
            self.insert(name, code);
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, code: &str) {
        let code = code.to_ascii_uppercase();
        self.codes.insert(code.clone());
        self.names.insert(normalize_name(name), code);
    }

    /// Resolve a display name (case and whitespace insensitive). A bare
    /// code already present in the table resolves to itself.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let key = normalize_name(name);
        if let Some(code) = self.names.get(&key) {
            return Some(code.as_str());
        }
        let upper = key.to_ascii_uppercase();
        self.codes.get(&upper).map(|c| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Diagnostic report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CurrencyReportEntry {
    /// Name as normalized for lookup.
    pub name: String,
    pub iso: Option<String>,
}

/// Every distinct currency name seen across the sources, resolved or not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CurrencyReport {
    pub entries: Vec<CurrencyReportEntry>,
}

impl CurrencyReport {
    pub fn build<'a, I>(names: I, table: &CurrencyTable) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<String> = names
            .into_iter()
            .map(normalize_name)
            .filter(|n| !n.is_empty())
            .collect();

        let entries = distinct
            .into_iter()
            .map(|name| {
                let iso = table.resolve(&name).map(String::from);
                CurrencyReportEntry { name, iso }
            })
            .collect();

        Self { entries }
    }

    pub fn unmapped(&self) -> impl Iterator<Item = &CurrencyReportEntry> {
        self.entries.iter().filter(|e| e.iso.is_none())
    }

    pub fn unmapped_count(&self) -> usize {
        self.unmapped().count()
    }

    /// One line per name, `name -> ISO` or `name -> UNMAPPED`.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match e.iso {
                Some(ref iso) => format!("{} -> {}", e.name, iso),
                None => format!("{} -> UNMAPPED", e.name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_whitespace_insensitive() {
        let t = CurrencyTable::builtin();
        assert_eq!(t.resolve("  Euro "), Some("EUR"));
        assert_eq!(t.resolve("EURO"), Some("EUR"));
        assert_eq!(t.resolve("euro"), Some("EUR"));
        assert_eq!(t.resolve("US   Dollar"), Some("USD"));
    }

    #[test]
    fn unknown_name_is_absent() {
        let t = CurrencyTable::builtin();
        assert_eq!(t.resolve("galactic credit"), None);
        assert_eq!(t.resolve(""), None);
    }

    #[test]
    fn bare_code_resolves_to_itself() {
        let t = CurrencyTable::builtin();
        assert_eq!(t.resolve("eur"), Some("EUR"));
        assert_eq!(t.resolve(" GBP "), Some("GBP"));
        // Three letters but not a code in the table
        assert_eq!(t.resolve("abc"), None);
    }

    #[test]
    fn toml_table_and_overrides() {
        let mut t = CurrencyTable::from_toml(
            r#"
"Peso Chileno" = "clp"
"euro" = "EUR"
"#,
        )
        .unwrap();
        assert_eq!(t.resolve("peso chileno"), Some("CLP"));
        assert_eq!(t.resolve("us dollar"), None);

        let mut extra = BTreeMap::new();
        extra.insert("dolar".to_string(), "USD".to_string());
        t.extend(&extra).unwrap();
        assert_eq!(t.resolve("Dolar"), Some("USD"));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn reject_bad_iso_code() {
        let mut extra = BTreeMap::new();
        extra.insert("euro".to_string(), "EURO".to_string());
        let err = CurrencyTable::empty().extend(&extra).unwrap_err();
        assert!(err.to_string().contains("three-letter"));
    }

    #[test]
    fn report_lists_distinct_names_with_gaps() {
        let t = CurrencyTable::builtin();
        let names = ["Euro", " euro", "EURO ", "galactic credit", "us dollar"];
        let report = CurrencyReport::build(names.iter().copied(), &t);

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.unmapped_count(), 1);
        assert_eq!(report.unmapped().next().unwrap().name, "galactic credit");
        assert_eq!(
            report.lines(),
            vec!["euro -> EUR", "galactic credit -> UNMAPPED", "us dollar -> USD"]
        );
    }
}
