//! Hyperprior constants and log-density helpers for the hierarchical AE model.
//!
//! Normal densities use the precision parameterization: `Normal(mean, precision)`.
//! Gamma densities use shape/rate.

use statrs::function::gamma::ln_gamma;

/// Fixed hyperprior constants of the model graph.
#[derive(Debug, Clone, Copy)]
pub struct HyperpriorConfig {
    /// Precision of the `Normal(0, precision)` prior on `mu_gamma_0` and `mu_theta_0`.
    pub top_mean_precision: f64,
    /// Shape of the `Gamma(shape, rate)` prior on every precision node.
    pub precision_shape: f64,
    /// Rate of the `Gamma(shape, rate)` prior on every precision node.
    pub precision_rate: f64,
    /// Rate of the truncated exponential prior on `alpha_pi` and `beta_pi`.
    pub beta_shape_rate: f64,
    /// Lower truncation bound of the exponential prior on `alpha_pi` and `beta_pi`.
    pub beta_shape_lower: f64,
}

impl Default for HyperpriorConfig {
    fn default() -> Self {
        Self {
            top_mean_precision: 0.1,
            precision_shape: 3.0,
            precision_rate: 1.0,
            beta_shape_rate: 0.1,
            beta_shape_lower: 1.0,
        }
    }
}

impl HyperpriorConfig {
    /// Whether all hyperprior constants are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.top_mean_precision > 0.0
            && self.precision_shape > 0.0
            && self.precision_rate > 0.0
            && self.beta_shape_rate > 0.0
            && self.beta_shape_lower.is_finite()
            && self.beta_shape_lower >= 0.0
    }

    /// Log prior of `alpha_pi` or `beta_pi`.
    #[must_use]
    pub fn log_beta_shape_prior(self, value: f64) -> f64 {
        log_truncated_exponential_density(value, self.beta_shape_rate, self.beta_shape_lower)
    }
}

/// Log-density for `Normal(mean, precision)`.
#[must_use]
pub fn log_normal_precision_density(value: f64, mean: f64, precision: f64) -> f64 {
    if !(precision > 0.0 && precision.is_finite()) {
        return f64::NEG_INFINITY;
    }
    let centered = value - mean;
    0.5 * (precision.ln() - std::f64::consts::TAU.ln() - precision * centered * centered)
}

/// Log-density for `Gamma(shape, rate)`.
#[must_use]
pub fn log_gamma_density(value: f64, shape: f64, rate: f64) -> f64 {
    if !(value > 0.0 && shape > 0.0 && rate > 0.0) {
        return f64::NEG_INFINITY;
    }
    shape.mul_add(rate.ln(), -ln_gamma(shape)) + (shape - 1.0).mul_add(value.ln(), -rate * value)
}

/// Log-density for `Beta(alpha, beta)` on the open unit interval.
#[must_use]
pub fn log_beta_density(value: f64, alpha: f64, beta: f64) -> f64 {
    if !(value > 0.0 && value < 1.0 && alpha > 0.0 && beta > 0.0) {
        return f64::NEG_INFINITY;
    }
    ln_gamma(alpha + beta) - ln_gamma(alpha) - ln_gamma(beta)
        + (alpha - 1.0).mul_add(value.ln(), (beta - 1.0) * (-value).ln_1p())
}

/// Log-density for `Exponential(rate)` truncated to `(lower, inf)`.
///
/// Memorylessness makes the truncated density `rate * exp(-rate * (x - lower))`.
#[must_use]
pub fn log_truncated_exponential_density(value: f64, rate: f64, lower: f64) -> f64 {
    if !(rate > 0.0 && value > lower && value.is_finite()) {
        return f64::NEG_INFINITY;
    }
    rate.ln() - rate * (value - lower)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn hyperprior_defaults_are_valid() {
        assert!(HyperpriorConfig::default().is_valid());
    }

    #[test]
    fn normal_precision_density_matches_standard_normal() {
        let expected = -0.5 * std::f64::consts::TAU.ln();
        assert_relative_eq!(log_normal_precision_density(0.0, 0.0, 1.0), expected);
    }

    #[test]
    fn gamma_density_matches_closed_form() {
        // Gamma(3, 1) at x = 2: 2^2 e^-2 / 2! = 2 e^-2.
        let expected = 2.0f64.ln() - 2.0;
        assert_relative_eq!(log_gamma_density(2.0, 3.0, 1.0), expected, epsilon = 1.0e-10);
    }

    #[test]
    fn beta_density_is_uniform_for_unit_shapes() {
        assert_relative_eq!(log_beta_density(0.3, 1.0, 1.0), 0.0, epsilon = 1.0e-12);
        assert!(!log_beta_density(1.0, 2.0, 2.0).is_finite());
    }

    #[test]
    fn truncated_exponential_excludes_lower_bound() {
        let config = HyperpriorConfig::default();
        assert!(!config.log_beta_shape_prior(1.0).is_finite());
        assert_relative_eq!(config.log_beta_shape_prior(1.0 + 10.0), 0.1f64.ln() - 1.0);
    }
}
