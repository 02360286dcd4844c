use serde::Serialize;

/// Quartile fences of the delta distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
}

/// Fences plus the request ids on each side of them.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub stats: OutlierStats,
    pub outlier_ids: Vec<u64>,
    pub non_outlier_ids: Vec<u64>,
}

impl OutlierStats {
    /// Q1/Q3 by linear interpolation between closest ranks, rounded to two
    /// decimals; fences at 1.5 × IQR. `None` for an empty sample.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = round2(quantile(&sorted, 0.25));
        let q3 = round2(quantile(&sorted, 0.75));
        let median = round2(quantile(&sorted, 0.5));
        let iqr = q3 - q1;

        Some(Self {
            q1,
            median,
            q3,
            iqr,
            lower_fence: q1 - 1.5 * iqr,
            upper_fence: q3 + 1.5 * iqr,
        })
    }

    /// Strictly outside the fences.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower_fence || value > self.upper_fence
    }

    /// Split `(id, value)` pairs into (outliers, non-outliers). Fence values
    /// themselves are non-outliers.
    pub fn partition<I>(&self, values: I) -> (Vec<u64>, Vec<u64>)
    where
        I: IntoIterator<Item = (u64, f64)>,
    {
        let mut outliers = Vec::new();
        let mut inside = Vec::new();
        for (id, v) in values {
            if self.is_outlier(v) {
                outliers.push(id);
            } else {
                inside.push(id);
            }
        }
        (outliers, inside)
    }
}

impl OutlierReport {
    pub fn build(values: &[(u64, f64)]) -> Option<Self> {
        let samples: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
        let stats = OutlierStats::compute(&samples)?;
        let (outlier_ids, non_outlier_ids) = stats.partition(values.iter().copied());
        Some(Self { stats, outlier_ids, non_outlier_ids })
    }
}

/// Quantile of sorted data, position `p * (n - 1)` interpolated linearly.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_flag_single_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0];
        let stats = OutlierStats::compute(&values).unwrap();
        assert_eq!(stats.q1, 2.5);
        assert_eq!(stats.q3, 5.5);
        assert_eq!(stats.median, 4.0);
        assert_eq!(stats.iqr, 3.0);
        assert_eq!(stats.lower_fence, -2.0);
        assert_eq!(stats.upper_fence, 10.0);

        let pairs: Vec<(u64, f64)> = values.iter().enumerate().map(|(i, v)| (i as u64, *v)).collect();
        let (out, inside) = stats.partition(pairs);
        assert_eq!(out, vec![6]);
        assert_eq!(inside, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn fence_values_are_not_outliers() {
        let stats = OutlierStats::compute(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0]).unwrap();
        assert!(!stats.is_outlier(10.0));
        assert!(!stats.is_outlier(-2.0));
        assert!(stats.is_outlier(10.01));
        assert!(stats.is_outlier(-2.01));
    }

    #[test]
    fn unsorted_input_and_rounding() {
        let stats = OutlierStats::compute(&[0.123, 10.0, 0.0, 5.0]).unwrap();
        // sorted: 0, 0.123, 5, 10 → q1 at rank 0.75 → 0.09225 → 0.09
        assert_eq!(stats.q1, 0.09);
        assert_eq!(stats.q3, 6.25);
    }

    #[test]
    fn empty_sample() {
        assert!(OutlierStats::compute(&[]).is_none());
        assert!(OutlierReport::build(&[]).is_none());
    }

    #[test]
    fn single_value() {
        let report = OutlierReport::build(&[(7, 12.5)]).unwrap();
        assert_eq!(report.stats.iqr, 0.0);
        assert!(report.outlier_ids.is_empty());
        assert_eq!(report.non_outlier_ids, vec![7]);
    }
}
