//! Reusable inference and MCMC utility types.

use thiserror::Error;

/// Errors for generic MCMC schedules.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    #[error("sampling iterations must be positive")]
    InvalidIterations,
    #[error("thinning interval must be positive")]
    InvalidThinning,
    #[error("thinning interval ({thin}) leaves no retained draws from {iterations} iterations")]
    ThinningExceedsIterations { thin: usize, iterations: usize },
}

/// MCMC schedule: adaptation, burn-in, and thinned sampling phases.
///
/// A chain runs `n_adapt + n_burn + n_iter` iterations in total. Only the last
/// `n_iter` are eligible for retention, and of those every `thin`-th is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McmcSchedule {
    /// Iterations spent tuning proposal scales. Never retained.
    pub n_adapt: usize,
    /// Iterations discarded after adaptation with fixed proposal scales.
    pub n_burn: usize,
    /// Sampling iterations after burn-in.
    pub n_iter: usize,
    /// Keep every `thin`-th sampling iteration.
    pub thin: usize,
}

impl Default for McmcSchedule {
    fn default() -> Self {
        Self {
            n_adapt: 1_000,
            n_burn: 1_000,
            n_iter: 2_000,
            thin: 1,
        }
    }
}

impl McmcSchedule {
    /// # Errors
    ///
    /// Returns `InferenceError` if schedule values are invalid.
    pub const fn validate(self) -> Result<(), InferenceError> {
        if self.n_iter == 0 {
            return Err(InferenceError::InvalidIterations);
        }
        if self.thin == 0 {
            return Err(InferenceError::InvalidThinning);
        }
        if self.thin > self.n_iter {
            return Err(InferenceError::ThinningExceedsIterations {
                thin: self.thin,
                iterations: self.n_iter,
            });
        }
        Ok(())
    }

    /// Number of retained draws implied by this schedule.
    #[must_use]
    pub const fn retained_draws(self) -> usize {
        self.n_iter / self.thin
    }

    /// Total iterations across all three phases.
    #[must_use]
    pub const fn total_iterations(self) -> usize {
        self.n_adapt + self.n_burn + self.n_iter
    }

    /// Whether iteration `iter` (0-based over all phases) is kept.
    #[must_use]
    pub fn is_retained(self, iter: usize) -> bool {
        let sampling_start = self.n_adapt + self.n_burn;
        iter >= sampling_start && (iter - sampling_start + 1).is_multiple_of(self.thin)
    }

    /// Whether iteration `iter` (0-based over all phases) is an adaptation iteration.
    #[must_use]
    pub const fn is_adapting(self, iter: usize) -> bool {
        iter < self.n_adapt
    }
}

/// Proposal counters for a single Metropolis-Hastings block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalStats {
    pub proposed: usize,
    pub accepted: usize,
}

impl ProposalStats {
    /// Record one proposal and whether it was accepted.
    pub const fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Acceptance rate in `[0, 1]`, or `0` if no proposals were made.
    #[must_use]
    pub fn acceptance_rate(self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            crate::utils::usize_to_f64(self.accepted) / crate::utils::usize_to_f64(self.proposed)
        }
    }

    /// Clear both counters, e.g. at the start of a new adaptation window.
    pub const fn reset(&mut self) {
        self.proposed = 0;
        self.accepted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_validation_rejects_zero_iterations() {
        let schedule = McmcSchedule {
            n_iter: 0,
            ..McmcSchedule::default()
        };
        assert_eq!(schedule.validate(), Err(InferenceError::InvalidIterations));
    }

    #[test]
    fn schedule_validation_rejects_zero_thin() {
        let schedule = McmcSchedule {
            thin: 0,
            ..McmcSchedule::default()
        };
        assert_eq!(schedule.validate(), Err(InferenceError::InvalidThinning));
    }

    #[test]
    fn retained_draws_floor_divides() {
        let schedule = McmcSchedule {
            n_adapt: 10,
            n_burn: 5,
            n_iter: 103,
            thin: 5,
        };
        assert_eq!(schedule.retained_draws(), 20);
        let kept = (0..schedule.total_iterations())
            .filter(|iter| schedule.is_retained(*iter))
            .count();
        assert_eq!(kept, 20);
    }

    #[test]
    fn adaptation_and_retention_phases_do_not_overlap() {
        let schedule = McmcSchedule {
            n_adapt: 4,
            n_burn: 4,
            n_iter: 4,
            thin: 1,
        };
        for iter in 0..schedule.total_iterations() {
            assert!(!(schedule.is_adapting(iter) && schedule.is_retained(iter)));
        }
        assert!(schedule.is_retained(8));
        assert!(!schedule.is_retained(7));
    }

    #[test]
    fn proposal_stats_tracks_acceptance() {
        let mut stats = ProposalStats::default();
        stats.record(true);
        stats.record(false);
        assert!((stats.acceptance_rate() - 0.5).abs() < 1.0e-12);
        stats.reset();
        assert!(stats.acceptance_rate().abs() < 1.0e-12);
    }
}
