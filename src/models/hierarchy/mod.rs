//! Bayesian hierarchical mixture model for adverse-event incidence.
//!
//! Binomial logistic likelihood per treatment arm, a point-mass/normal mixture
//! prior on each log odds ratio, and SOC-level exchangeability, sampled by
//! Metropolis-within-Gibbs. Posterior draws reduce into per-AE summaries and
//! per-draw incidence probabilities.

pub mod diagnostics;
pub mod graph;
pub mod likelihood;
pub mod orchestrator;
pub mod posterior;
pub mod priors;
pub mod probability;
pub mod report;
pub mod sampler;
pub mod summary;
pub mod types;
mod variates;

pub use diagnostics::{
    ConvergenceSummary, autocorrelation, effective_sample_size, summarize_convergence,
};
pub use graph::{GroupCell, HierarchicalModel, LatentCell, ModelGraph};
pub use orchestrator::{ChainPool, MultiChainRun, run_chains, run_chains_with_options};
pub use posterior::{ParameterFamily, ParameterKey, ParseParameterKeyError, PosteriorSampleTable};
pub use priors::HyperpriorConfig;
pub use probability::{IncidenceDraws, ProbabilityRow, ProbabilityTable, extract_probabilities};
pub use report::{AeSummaryReport, AeSummaryRow, METHOD_LABEL, build_report, render_report};
pub use sampler::{ChainRun, run_chain, run_chain_with_config};
pub use summary::{SummaryStats, summarize};
pub use types::{
    AcceptanceRates, ChainDiagnostics, ExecutionMode, HierarchyError, InitialValues,
    MultiChainOptions, ProposalTuning, SamplerConfig,
};
