//! Exchange rates: the `RateSource` seam, the per-run cache and a static
//! in-memory source.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::ReconError;

/// Error from a single rate lookup. Never fatal to a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RateError {
    /// Transport failure (DNS, connection refused, TLS, ...)
    Network(String),
    /// Request exceeded the configured timeout
    Timeout(String),
    /// Non-success HTTP status
    Http(u16, String),
    /// Body was not JSON or did not contain a numeric rate
    Parse(String),
    /// Source has no rate for the pair
    Unavailable(String),
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateError::Network(msg) => write!(f, "network error: {msg}"),
            RateError::Timeout(msg) => write!(f, "timeout: {msg}"),
            RateError::Http(code, msg) => write!(f, "HTTP {code}: {msg}"),
            RateError::Parse(msg) => write!(f, "malformed response: {msg}"),
            RateError::Unavailable(msg) => write!(f, "no rate: {msg}"),
        }
    }
}

impl std::error::Error for RateError {}

/// Anything that can quote a multiplicative `from → to` rate.
pub trait RateSource {
    fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, RateError>;
}

impl<S: RateSource + ?Sized> RateSource for &S {
    fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        (**self).fetch_rate(from, to)
    }
}

impl<S: RateSource + ?Sized> RateSource for Box<S> {
    fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        (**self).fetch_rate(from, to)
    }
}

/// A failed lookup, kept for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct RateFailure {
    pub from: String,
    pub to: String,
    pub error: String,
}

/// Rates retrieved during one run, keyed by the ordered pair.
#[derive(Debug, Default)]
pub struct RateCache {
    rates: HashMap<(String, String), f64>,
}

impl RateCache {
    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.rates.get(&(from.to_string(), to.to_string())).copied()
    }

    pub fn insert(&mut self, from: &str, to: &str, rate: f64) {
        self.rates.insert((from.to_string(), to.to_string()), rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Rate lookups for one pipeline run. Owns its cache; drop it when the run ends.
pub struct ExchangeRateService<S> {
    source: S,
    cache: RateCache,
    failed: HashSet<(String, String)>,
    failures: Vec<RateFailure>,
    remember_failures: bool,
}

impl<S: RateSource> ExchangeRateService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RateCache::default(),
            failed: HashSet::new(),
            failures: Vec::new(),
            remember_failures: true,
        }
    }

    /// When false, a pair that failed is queried again on its next use.
    pub fn remember_failures(mut self, remember: bool) -> Self {
        self.remember_failures = remember;
        self
    }

    /// Multiplicative rate `from → to`, or `None` when it cannot be obtained.
    pub fn rate(&mut self, from: &str, to: &str) -> Option<f64> {
        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();

        if from == to {
            return Some(1.0);
        }

        if let Some(rate) = self.cache.get(&from, &to) {
            log::debug!("rate cache hit {from}->{to}: {rate}");
            return Some(rate);
        }

        let pair = (from, to);
        if self.remember_failures && self.failed.contains(&pair) {
            return None;
        }
        let (from, to) = (&pair.0, &pair.1);

        match self.source.fetch_rate(from, to) {
            Ok(rate) if rate.is_finite() && rate > 0.0 => {
                log::debug!("rate {from}->{to}: {rate}");
                self.cache.insert(from, to, rate);
                Some(rate)
            }
            Ok(rate) => {
                self.record_failure(&pair, RateError::Parse(format!("unusable rate {rate}")));
                None
            }
            Err(e) => {
                self.record_failure(&pair, e);
                None
            }
        }
    }

    fn record_failure(&mut self, pair: &(String, String), error: RateError) {
        log::warn!("exchange rate {}->{} unavailable: {error}", pair.0, pair.1);
        self.failures.push(RateFailure {
            from: pair.0.clone(),
            to: pair.1.clone(),
            error: error.to_string(),
        });
        self.failed.insert(pair.clone());
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn failures(&self) -> &[RateFailure] {
        &self.failures
    }
}

// ---------------------------------------------------------------------------
// Static rates
// ---------------------------------------------------------------------------

/// Fixed rates, e.g. for offline runs:
///
/// ```toml
/// [EUR]
/// USD = 1.08
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticRates {
    rates: HashMap<(String, String), f64>,
}

impl StaticRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.insert(from, to, rate);
        self
    }

    pub fn insert(&mut self, from: &str, to: &str, rate: f64) {
        self.rates
            .insert((from.trim().to_ascii_uppercase(), to.trim().to_ascii_uppercase()), rate);
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let table: BTreeMap<String, BTreeMap<String, f64>> =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        let mut rates = Self::new();
        for (from, targets) in &table {
            for (to, rate) in targets {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(ReconError::ConfigValidation(format!(
                        "rate {from}->{to} must be positive, got {rate}"
                    )));
                }
                rates.insert(from, to, *rate);
            }
        }
        Ok(rates)
    }
}

impl RateSource for StaticRates {
    fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        self.rates
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| RateError::Unavailable(format!("{from}->{to}")))
    }
}
