//! Column summaries of posterior draws.

use serde::Serialize;

use crate::utils::{mean, percentile, sample_variance};

/// Mean, sample standard deviation, and five quantiles of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub sd: f64,
    pub p2_5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p97_5: f64,
}

impl SummaryStats {
    /// All fields `NaN`, the summary of an empty column.
    pub const EMPTY: Self = Self {
        mean: f64::NAN,
        sd: f64::NAN,
        p2_5: f64::NAN,
        p25: f64::NAN,
        p50: f64::NAN,
        p75: f64::NAN,
        p97_5: f64::NAN,
    };
}

/// Summarize a column of draws.
///
/// Quantiles interpolate linearly between order statistics at position
/// `p * (n - 1)`; `sd` uses the `n - 1` denominator and is `0` for one value.
#[must_use]
pub fn summarize(column: &[f64]) -> SummaryStats {
    if column.is_empty() {
        return SummaryStats::EMPTY;
    }

    let mut sorted = column.to_vec();
    sorted.sort_by(f64::total_cmp);

    SummaryStats {
        mean: mean(column),
        sd: sample_variance(column).sqrt(),
        p2_5: percentile(&sorted, 0.025),
        p25: percentile(&sorted, 0.25),
        p50: percentile(&sorted, 0.5),
        p75: percentile(&sorted, 0.75),
        p97_5: percentile(&sorted, 0.975),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn one_to_hundred_matches_type_seven_quantiles() {
        let column: Vec<f64> = (1..=100).map(f64::from).collect();
        let stats = summarize(&column);

        assert_relative_eq!(stats.mean, 50.5);
        assert_relative_eq!(stats.p50, 50.5, epsilon = 1.0e-9);
        assert_relative_eq!(stats.p2_5, 3.475, epsilon = 1.0e-9);
        assert_relative_eq!(stats.p25, 25.75, epsilon = 1.0e-9);
        assert_relative_eq!(stats.p75, 75.25, epsilon = 1.0e-9);
        assert_relative_eq!(stats.p97_5, 97.525, epsilon = 1.0e-9);
        assert_relative_eq!(stats.sd, 29.011_491_975_882_016, epsilon = 1.0e-9);
    }

    #[test]
    fn identical_values_have_zero_spread() {
        let stats = summarize(&[0.3; 25]);
        assert_relative_eq!(stats.mean, 0.3, epsilon = 1.0e-12);
        assert_relative_eq!(stats.sd, 0.0, epsilon = 1.0e-12);
        for quantile in [stats.p2_5, stats.p25, stats.p50, stats.p75, stats.p97_5] {
            assert_relative_eq!(quantile, 0.3, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn single_value_has_zero_sd() {
        let stats = summarize(&[4.0]);
        assert_relative_eq!(stats.sd, 0.0);
        assert_relative_eq!(stats.p97_5, 4.0);
    }

    #[test]
    fn empty_column_is_all_nan() {
        let stats = summarize(&[]);
        assert!(stats.mean.is_nan());
        assert!(stats.sd.is_nan());
        assert!(stats.p50.is_nan());
    }

    #[test]
    fn order_of_draws_does_not_matter() {
        let forward = summarize(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let shuffled = summarize(&[4.0, 1.0, 5.0, 3.0, 2.0]);
        assert_eq!(forward, shuffled);
    }
}
