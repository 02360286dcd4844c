use std::fmt;

use serde::Serialize;

use crate::config::CommercialModelConfig;

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// Outcome of one delta computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    /// Either side absent, or 0/0.
    Undefined,
    Value(f64),
    /// Deal-specialist value was zero with a non-zero pricing-engine value.
    /// Reported as 0 so infinities never reach the statistics.
    ZeroedInfinite,
}

impl Delta {
    pub fn value(&self) -> Option<f64> {
        match self {
            Delta::Undefined => None,
            Delta::Value(v) => Some(*v),
            Delta::ZeroedInfinite => Some(0.0),
        }
    }
}

/// `(pe / ds - 1) * 100`, with ±∞ neutralized to 0.
///
/// The zero is a policy, not a measurement: an unbounded deviation reads
/// as "no deviation". Callers that care use [`delta_outcome`] to tell the
/// two apart.
pub fn delta_pct(pricing_engine: Option<f64>, deal_specialist: Option<f64>) -> Option<f64> {
    delta_outcome(pricing_engine, deal_specialist).value()
}

pub fn delta_outcome(pricing_engine: Option<f64>, deal_specialist: Option<f64>) -> Delta {
    let (pe, ds) = match (pricing_engine, deal_specialist) {
        (Some(pe), Some(ds)) => (pe, ds),
        _ => return Delta::Undefined,
    };
    let delta = (pe / ds - 1.0) * 100.0;
    if delta.is_infinite() {
        Delta::ZeroedInfinite
    } else if delta.is_nan() {
        Delta::Undefined
    } else {
        Delta::Value(delta)
    }
}

// ---------------------------------------------------------------------------
// Commercial model
// ---------------------------------------------------------------------------

/// Map free-text commercial-model labels onto a category label when one of
/// the category tokens appears in the text (`"b4b sd-wan"` → `"B4B"`).
/// Anything else is returned trimmed.
pub fn normalize_commercial_model(raw: &str, models: &CommercialModelConfig) -> String {
    let trimmed = raw.trim();
    let tokens: Vec<String> = trimmed
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();

    for category in [&models.category_a, &models.category_b] {
        let wanted = category.trim().to_lowercase();
        if tokens.iter().any(|t| *t == wanted) {
            return category.trim().to_string();
        }
    }
    trimmed.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChange {
    NoChanges,
    /// At least one quoting side diverged from the request.
    Changed { deal_specialist: bool, pricing_engine: bool },
    /// Request is for a service outside both categories.
    NotComparable,
}

pub const LABEL_NO_CHANGES: &str = "No changes";
pub const LABEL_DS_CHANGED: &str = "DS changed";
pub const LABEL_PE_CHANGED: &str = "PE changed";
pub const LABEL_NOT_COMPARABLE: &str = "Other service quoted";
pub const LABEL_JOIN: &str = " | ";

impl fmt::Display for ModelChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChanges => write!(f, "{LABEL_NO_CHANGES}"),
            Self::NotComparable => write!(f, "{LABEL_NOT_COMPARABLE}"),
            Self::Changed { deal_specialist, pricing_engine } => {
                let mut parts = Vec::with_capacity(2);
                if *deal_specialist {
                    parts.push(LABEL_DS_CHANGED);
                }
                if *pricing_engine {
                    parts.push(LABEL_PE_CHANGED);
                }
                write!(f, "{}", parts.join(LABEL_JOIN))
            }
        }
    }
}

/// Compare both quoting sides' commercial model against the request's.
///
/// An absent side label counts as diverged.
pub fn classify_model_change(
    request: Option<&str>,
    deal_specialist: Option<&str>,
    pricing_engine: Option<&str>,
    models: &CommercialModelConfig,
) -> ModelChange {
    let request = match request.map(str::trim) {
        Some(r) if is_category(r, models) => r,
        _ => return ModelChange::NotComparable,
    };

    let differs = |side: Option<&str>| side.map(str::trim) != Some(request);
    let ds = differs(deal_specialist);
    let pe = differs(pricing_engine);

    if !ds && !pe {
        ModelChange::NoChanges
    } else {
        ModelChange::Changed { deal_specialist: ds, pricing_engine: pe }
    }
}

fn is_category(label: &str, models: &CommercialModelConfig) -> bool {
    label == models.category_a.trim() || label == models.category_b.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models() -> CommercialModelConfig {
        CommercialModelConfig::default()
    }

    #[test]
    fn delta_basic() {
        assert_eq!(delta_pct(Some(100.0), Some(50.0)), Some(100.0));
        assert_eq!(delta_pct(Some(50.0), Some(100.0)), Some(-50.0));
        assert_eq!(delta_pct(Some(100.0), Some(100.0)), Some(0.0));
    }

    #[test]
    fn delta_absent_propagates() {
        assert_eq!(delta_pct(None, Some(50.0)), None);
        assert_eq!(delta_pct(Some(50.0), None), None);
        assert_eq!(delta_pct(None, None), None);
    }

    #[test]
    fn delta_infinity_is_zeroed_not_hidden() {
        // The zero masks an unbounded deviation; the outcome keeps that visible.
        assert_eq!(delta_pct(Some(250.0), Some(0.0)), Some(0.0));
        assert_eq!(delta_pct(Some(-250.0), Some(0.0)), Some(0.0));
        assert_eq!(delta_outcome(Some(250.0), Some(0.0)), Delta::ZeroedInfinite);
    }

    #[test]
    fn delta_zero_over_zero_is_undefined() {
        assert_eq!(delta_outcome(Some(0.0), Some(0.0)), Delta::Undefined);
    }

    #[test]
    fn model_no_changes() {
        let c = classify_model_change(Some("B4B"), Some("B4B"), Some("B4B"), &models());
        assert_eq!(c, ModelChange::NoChanges);
        assert_eq!(c.to_string(), "No changes");
    }

    #[test]
    fn model_single_side_divergence() {
        let c = classify_model_change(Some("B4B"), Some("DIA"), Some("B4B"), &models());
        assert_eq!(c.to_string(), "DS changed");
        let c = classify_model_change(Some("DIA"), Some("DIA"), Some("B4B"), &models());
        assert_eq!(c.to_string(), "PE changed");
    }

    #[test]
    fn model_both_sides_diverge() {
        let c = classify_model_change(Some("DIA"), Some("B4B"), Some("MPLS"), &models());
        assert_eq!(
            c,
            ModelChange::Changed { deal_specialist: true, pricing_engine: true }
        );
        assert_eq!(c.to_string(), "DS changed | PE changed");
    }

    #[test]
    fn model_absent_side_counts_as_diverged() {
        let c = classify_model_change(Some("B4B"), None, Some("B4B"), &models());
        assert_eq!(c.to_string(), "DS changed");
    }

    #[test]
    fn model_other_service_is_not_comparable() {
        for (ds, pe) in [(Some("B4B"), Some("B4B")), (Some("MPLS"), None), (None, None)] {
            let c = classify_model_change(Some("MPLS"), ds, pe, &models());
            assert_eq!(c, ModelChange::NotComparable);
            assert_eq!(c.to_string(), "Other service quoted");
        }
        assert_eq!(
            classify_model_change(None, Some("B4B"), Some("B4B"), &models()),
            ModelChange::NotComparable
        );
    }

    #[test]
    fn normalize_labels() {
        let m = models();
        assert_eq!(normalize_commercial_model("b4b sd-wan", &m), "B4B");
        assert_eq!(normalize_commercial_model(" DIA (internet) ", &m), "DIA");
        assert_eq!(normalize_commercial_model("MPLS", &m), "MPLS");
        assert_eq!(normalize_commercial_model("Diamond", &m), "Diamond");
    }
}
