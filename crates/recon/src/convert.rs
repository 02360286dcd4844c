use std::fmt;

use serde::Serialize;

use crate::fx::{ExchangeRateService, RateSource};

/// Converted amount and the rate that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Conversion {
    pub amount: Option<f64>,
    pub rate: Option<f64>,
}

/// Convert `amount` from one ISO code to another.
///
/// Any absent input short-circuits to `(None, None)` without a lookup.
pub fn convert<S: RateSource>(
    amount: Option<f64>,
    from: Option<&str>,
    to: Option<&str>,
    rates: &mut ExchangeRateService<S>,
) -> Conversion {
    let (amount, from, to) = match (amount, from, to) {
        (Some(a), Some(f), Some(t)) => (a, f, t),
        _ => return Conversion::default(),
    };
    match rates.rate(from, to) {
        Some(rate) => Conversion {
            amount: Some(amount * rate),
            rate: Some(rate),
        },
        None => Conversion::default(),
    }
}

/// How a side's currency compares with the reference (request) currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyComparison {
    NoCurrencyAvailable,
    SameAsReference,
    DifferentFromReference,
}

impl CurrencyComparison {
    pub fn from_rate(rate: Option<f64>) -> Self {
        match rate {
            None => Self::NoCurrencyAvailable,
            Some(r) if r == 1.0 => Self::SameAsReference,
            Some(_) => Self::DifferentFromReference,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoCurrencyAvailable => "no currency available",
            Self::SameAsReference => "same currency as reference",
            Self::DifferentFromReference => "different currency as reference",
        }
    }
}

impl fmt::Display for CurrencyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
