//! Core public types for the hierarchical AE model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::priors::HyperpriorConfig;
use crate::inference::{InferenceError, McmcSchedule};
use crate::input::AeInputError;

/// Errors returned by configuration, sampling, and posterior reduction.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error(transparent)]
    InvalidInput(#[from] AeInputError),
    #[error(transparent)]
    InvalidSchedule(#[from] InferenceError),
    #[error("invalid hyperprior configuration")]
    InvalidHyperpriors,
    #[error("invalid proposal tuning configuration")]
    InvalidProposalTuning,
    #[error("invalid initial value for {parameter}: {value}")]
    InvalidInitialValues { parameter: &'static str, value: f64 },
    #[error("chain {chain}: sampler diverged: {reason}")]
    SamplerDivergence { chain: usize, reason: String },
    #[error("chain {chain}: posterior columns differ from chain 0")]
    SchemaMismatch { chain: usize },
    #[error("AE ({soc}, {pt}): posterior column {column} is missing")]
    MissingColumn {
        soc: String,
        pt: String,
        column: String,
    },
    #[error("AE key ({soc}, {pt}) occurs more than once; joins on SOC/PT would be ambiguous")]
    JoinAmbiguity { soc: String, pt: String },
    #[error("chain count must be at least {min}; found {found}")]
    InvalidChainCount { min: usize, found: usize },
    #[error("expected {expected} initial-value sets (one per chain); found {found}")]
    InitCountMismatch { expected: usize, found: usize },
    #[error("multi-chain seed stride must be positive")]
    InvalidSeedStride,
    #[error("each chain must retain at least {minimum} draws; minimum found {found}")]
    InsufficientChainDraws { minimum: usize, found: usize },
    #[error("posterior draws are required")]
    EmptyPosterior,
    #[error("chain {chain}: worker thread panicked")]
    WorkerPanicked { chain: usize },
}

/// Starting values for the top-level nodes of one chain.
///
/// Serialized field names follow the dotted node names (`mu.gamma.0`, `alpha.pi`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialValues {
    #[serde(rename = "mu.gamma.0")]
    pub mu_gamma_0: f64,
    #[serde(rename = "tau.gamma.0")]
    pub tau_gamma_0: f64,
    #[serde(rename = "mu.theta.0")]
    pub mu_theta_0: f64,
    #[serde(rename = "tau.theta.0")]
    pub tau_theta_0: f64,
    #[serde(rename = "alpha.pi")]
    pub alpha_pi: f64,
    #[serde(rename = "beta.pi")]
    pub beta_pi: f64,
    /// Optional RNG seed; overrides the orchestrator's derived chain seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for InitialValues {
    fn default() -> Self {
        Self {
            mu_gamma_0: 0.0,
            tau_gamma_0: 10.0,
            mu_theta_0: 0.0,
            tau_theta_0: 10.0,
            alpha_pi: 2.0,
            beta_pi: 2.0,
            seed: None,
        }
    }
}

impl InitialValues {
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Errors
    ///
    /// Returns `HierarchyError::InvalidInitialValues` naming the first node whose value
    /// lies outside its prior support.
    pub fn validate(&self) -> Result<(), HierarchyError> {
        let checks: [(&'static str, f64, bool); 6] = [
            ("mu.gamma.0", self.mu_gamma_0, self.mu_gamma_0.is_finite()),
            (
                "tau.gamma.0",
                self.tau_gamma_0,
                self.tau_gamma_0.is_finite() && self.tau_gamma_0 > 0.0,
            ),
            ("mu.theta.0", self.mu_theta_0, self.mu_theta_0.is_finite()),
            (
                "tau.theta.0",
                self.tau_theta_0,
                self.tau_theta_0.is_finite() && self.tau_theta_0 > 0.0,
            ),
            (
                "alpha.pi",
                self.alpha_pi,
                self.alpha_pi.is_finite() && self.alpha_pi > 1.0,
            ),
            (
                "beta.pi",
                self.beta_pi,
                self.beta_pi.is_finite() && self.beta_pi > 1.0,
            ),
        ];
        match checks.into_iter().find(|(_, _, valid)| !valid) {
            Some((parameter, value, _)) => {
                Err(HierarchyError::InvalidInitialValues { parameter, value })
            }
            None => Ok(()),
        }
    }
}

/// Proposal-scale and adaptation controls for the Metropolis blocks.
#[derive(Debug, Clone, Copy)]
pub struct ProposalTuning {
    /// Minimum allowed proposal scale.
    pub min_draw_scale: f64,
    /// Initial random-walk scale for each `gamma[b,j]`.
    pub gamma_draw_scale: f64,
    /// Initial random-walk scale for each `theta1[b,j]`.
    pub theta_draw_scale: f64,
    /// Initial random-walk scale for `ln(alpha_pi - 1)` and `ln(beta_pi - 1)`.
    pub log_beta_shape_draw_scale: f64,
    /// Adapt every `adaptation_interval` iterations during the adaptation phase.
    pub adaptation_interval: usize,
    /// Lower acceptance-rate target for adaptation.
    pub acceptance_target_low: f64,
    /// Upper acceptance-rate target for adaptation.
    pub acceptance_target_high: f64,
    /// Multiplicative scale decrease when acceptance is below target.
    pub scale_decrease_factor: f64,
    /// Multiplicative scale increase when acceptance is above target.
    pub scale_increase_factor: f64,
}

impl Default for ProposalTuning {
    fn default() -> Self {
        Self {
            min_draw_scale: 1.0e-3,
            gamma_draw_scale: 0.5,
            theta_draw_scale: 0.5,
            log_beta_shape_draw_scale: 0.5,
            adaptation_interval: 50,
            acceptance_target_low: 0.2,
            acceptance_target_high: 0.5,
            scale_decrease_factor: 0.8,
            scale_increase_factor: 1.2,
        }
    }
}

impl ProposalTuning {
    /// Whether proposal tuning settings are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.min_draw_scale > 0.0
            && self.gamma_draw_scale > 0.0
            && self.theta_draw_scale > 0.0
            && self.log_beta_shape_draw_scale > 0.0
            && self.adaptation_interval > 0
            && self.acceptance_target_low >= 0.0
            && self.acceptance_target_high <= 1.0
            && self.acceptance_target_low < self.acceptance_target_high
            && self.scale_decrease_factor > 0.0
            && self.scale_decrease_factor < 1.0
            && self.scale_increase_factor > 1.0
    }
}

/// Full sampler configuration for one chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerConfig {
    pub schedule: McmcSchedule,
    pub hyperpriors: HyperpriorConfig,
    pub proposal_tuning: ProposalTuning,
}

impl SamplerConfig {
    /// # Errors
    ///
    /// Returns `HierarchyError` if any configuration block is invalid.
    pub fn validate(self) -> Result<(), HierarchyError> {
        self.schedule.validate()?;
        if !self.hyperpriors.is_valid() {
            return Err(HierarchyError::InvalidHyperpriors);
        }
        if !self.proposal_tuning.is_valid() {
            return Err(HierarchyError::InvalidProposalTuning);
        }
        Ok(())
    }
}

/// How the orchestrator schedules independent chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Run chains one after another on the calling thread.
    Sequential,
    /// Run chains on a scoped worker pool sized to the available cores.
    #[default]
    Parallel,
}

/// Configuration for running several independent chains.
#[derive(Debug, Clone, Copy)]
pub struct MultiChainOptions {
    /// Number of independent chains to run.
    pub chains: usize,
    /// Seed for chain 0 when its initial values carry no explicit seed.
    pub base_seed: u64,
    /// Seed increment between adjacent chains.
    ///
    /// Chain `i` uses `base_seed + i * seed_stride` with wrapping arithmetic.
    pub seed_stride: u64,
    pub execution: ExecutionMode,
}

impl Default for MultiChainOptions {
    fn default() -> Self {
        Self {
            chains: 3,
            base_seed: 42,
            seed_stride: 10_000,
            execution: ExecutionMode::Parallel,
        }
    }
}

impl MultiChainOptions {
    /// # Errors
    ///
    /// Returns `HierarchyError` if multi-chain options are invalid.
    pub const fn validate(self) -> Result<(), HierarchyError> {
        if self.chains == 0 {
            return Err(HierarchyError::InvalidChainCount {
                min: 1,
                found: self.chains,
            });
        }
        if self.seed_stride == 0 {
            return Err(HierarchyError::InvalidSeedStride);
        }
        Ok(())
    }

    /// Seed used by chain `chain_index` unless its initial values override it.
    #[must_use]
    pub fn chain_seed(self, chain_index: usize) -> u64 {
        let index_u64 = u64::try_from(chain_index).unwrap_or(u64::MAX);
        self.base_seed
            .wrapping_add(index_u64.wrapping_mul(self.seed_stride))
    }
}

/// Component-wise acceptance rates from the Metropolis blocks of one chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptanceRates {
    pub gamma: f64,
    pub theta: f64,
    pub alpha_pi: f64,
    pub beta_pi: f64,
}

/// Per-chain sampler diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainDiagnostics {
    pub chain: usize,
    pub seed: u64,
    pub iterations_completed: usize,
    pub retained_draws: usize,
    pub acceptance_rates: AcceptanceRates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        assert!(SamplerConfig::default().validate().is_ok());
        assert!(MultiChainOptions::default().validate().is_ok());
        assert!(InitialValues::default().validate().is_ok());
    }

    #[test]
    fn initial_values_reject_beta_shape_at_truncation_bound() {
        let inits = InitialValues {
            alpha_pi: 1.0,
            ..InitialValues::default()
        };
        assert!(matches!(
            inits.validate(),
            Err(HierarchyError::InvalidInitialValues {
                parameter: "alpha.pi",
                ..
            })
        ));
    }

    #[test]
    fn initial_values_reject_non_positive_precision() {
        let inits = InitialValues {
            tau_theta_0: 0.0,
            ..InitialValues::default()
        };
        assert!(matches!(
            inits.validate(),
            Err(HierarchyError::InvalidInitialValues {
                parameter: "tau.theta.0",
                ..
            })
        ));
    }

    #[test]
    fn initial_values_use_dotted_node_names() {
        let json = r#"{"mu.gamma.0":0.1,"tau.gamma.0":1.0,"mu.theta.0":0.2,"tau.theta.0":1.0,"alpha.pi":2.0,"beta.pi":2.0}"#;
        let inits: InitialValues = serde_json::from_str(json).expect("inits should parse");
        assert!((inits.mu_theta_0 - 0.2).abs() < 1.0e-12);
        assert_eq!(inits.seed, None);
    }

    #[test]
    fn chain_seeds_follow_stride() {
        let options = MultiChainOptions {
            chains: 3,
            base_seed: 100,
            seed_stride: 7,
            execution: ExecutionMode::Sequential,
        };
        assert_eq!(options.chain_seed(0), 100);
        assert_eq!(options.chain_seed(2), 114);
    }

    #[test]
    fn multi_chain_options_reject_zero_chains() {
        let options = MultiChainOptions {
            chains: 0,
            ..MultiChainOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(HierarchyError::InvalidChainCount { min: 1, found: 0 })
        ));
    }

    #[test]
    fn proposal_tuning_rejects_inverted_factors() {
        let tuning = ProposalTuning {
            scale_increase_factor: 0.9,
            ..ProposalTuning::default()
        };
        assert!(!tuning.is_valid());
    }
}
