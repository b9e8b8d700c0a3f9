//! # Utilities
//!
//! Shared numeric helpers for sample statistics and index conversions.

use num_traits::ToPrimitive;

/// Lossy `usize -> f64` conversion that saturates at `u32::MAX`.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Arithmetic mean, or `NaN` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / usize_to_f64(values.len())
}

/// Unbiased sample variance (`n - 1` denominator); `0` for fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let center = mean(values);
    values
        .iter()
        .map(|value| {
            let centered = value - center;
            centered * centered
        })
        .sum::<f64>()
        / usize_to_f64(values.len() - 1)
}

/// Linear-interpolation quantile over pre-sorted values.
///
/// Position `p * (n - 1)` is interpolated between its neighbouring order statistics.
#[must_use]
pub fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0).min(last);
    let upper = position.ceil().to_usize().unwrap_or(last).min(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 0.5) - 2.5).abs() < 1.0e-12);
        assert!((percentile(&sorted, 0.0) - 1.0).abs() < 1.0e-12);
        assert!((percentile(&sorted, 1.0) - 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn sample_variance_uses_bessel_correction() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((sample_variance(&values) - 5.0 / 3.0).abs() < 1.0e-12);
        assert!(sample_variance(&[7.0]).abs() < 1.0e-12);
    }

    #[test]
    fn mean_of_empty_is_nan() {
        assert!(mean(&[]).is_nan());
    }
}
