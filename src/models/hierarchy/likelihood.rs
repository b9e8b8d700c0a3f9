//! Binomial likelihood and numerical-stability helpers.

use num_traits::ToPrimitive;

/// Stable logistic transform.
#[must_use]
pub fn logistic_stable(value: f64) -> f64 {
    if value >= 0.0 {
        let z = (-value).exp();
        1.0 / (1.0 + z)
    } else {
        let z = value.exp();
        z / (1.0 + z)
    }
}

/// Stable `log(1 + exp(value))`.
#[must_use]
pub fn softplus(value: f64) -> f64 {
    if value > 0.0 {
        value + (-value).exp().ln_1p()
    } else {
        value.exp().ln_1p()
    }
}

/// Binomial log-likelihood kernel on the logit scale, dropping the binomial coefficient.
///
/// `events * eta - trials * log(1 + exp(eta))`.
#[must_use]
pub fn binomial_logit_kernel(events: u64, trials: u64, eta: f64) -> f64 {
    count_to_f64(events).mul_add(eta, -count_to_f64(trials) * softplus(eta))
}

pub(crate) fn count_to_f64(count: u64) -> f64 {
    count.to_f64().unwrap_or(f64::MAX)
}

/// Aggregated counts of every record mapped onto one latent cell.
///
/// Widened to `u64` so that summing `u32` record counts cannot overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCounts {
    pub control_events: u64,
    pub control_trials: u64,
    pub treatment_events: u64,
    pub treatment_trials: u64,
}

impl CellCounts {
    /// Joint control/treatment log-likelihood kernel for `(gamma, theta)`.
    #[must_use]
    pub fn log_likelihood(self, gamma: f64, theta: f64) -> f64 {
        binomial_logit_kernel(self.control_events, self.control_trials, gamma)
            + binomial_logit_kernel(self.treatment_events, self.treatment_trials, gamma + theta)
    }

    /// Treatment-arm contribution only; the part that depends on `theta`.
    #[must_use]
    pub fn treatment_log_likelihood(self, gamma: f64, theta: f64) -> f64 {
        binomial_logit_kernel(self.treatment_events, self.treatment_trials, gamma + theta)
    }
}
