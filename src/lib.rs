#![forbid(unsafe_code)]

//! # `ae_hierarchical_models`
//!
//! Bayesian hierarchical estimates of adverse-event incidence differences and odds
//! ratios between a treatment and a control arm.
//!
//! AEs are grouped by system organ class (SOC) and preferred term (PT). The model
//! places a point-mass/normal mixture prior on each log odds ratio and shares
//! strength across PTs of the same SOC. Posterior draws come from a
//! Metropolis-within-Gibbs sampler that can run several independent chains in
//! parallel, and reduce into a per-AE summary report and incidence-probability draws.

pub mod inference;
pub mod input;
pub mod models;
pub mod utils;

pub use inference::{InferenceError, McmcSchedule, ProposalStats};
pub use input::{AeDataset, AeInputError, AeRecord};

pub use models::hierarchy::{
    AcceptanceRates, AeSummaryReport, AeSummaryRow, ChainDiagnostics, ChainPool, ChainRun,
    ConvergenceSummary, ExecutionMode, GroupCell, HierarchicalModel, HierarchyError,
    HyperpriorConfig, IncidenceDraws, InitialValues, MultiChainOptions, MultiChainRun,
    ParameterFamily, ParameterKey, PosteriorSampleTable, ProbabilityRow, ProbabilityTable,
    ProposalTuning, SamplerConfig, SummaryStats, autocorrelation, build_report,
    effective_sample_size, extract_probabilities, render_report, run_chain,
    run_chain_with_config, run_chains, run_chains_with_options, summarize,
    summarize_convergence,
};
