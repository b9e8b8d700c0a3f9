//! Multi-chain orchestration over a scoped worker pool.
//!
//! Chains share only read-only data (the bound model graph and configuration).
//! Each chain owns its state and RNG. There is no timeout: a chain that never
//! finishes blocks the whole run.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use super::diagnostics::{ConvergenceSummary, summarize_convergence};
use super::graph::{HierarchicalModel, ModelGraph};
use super::posterior::PosteriorSampleTable;
use super::sampler::{ChainRun, run_chain_on_graph};
use super::types::{
    ChainDiagnostics, ExecutionMode, HierarchyError, InitialValues, MultiChainOptions,
    SamplerConfig,
};
use crate::inference::McmcSchedule;
use crate::input::AeDataset;

/// Pooled output of a multi-chain run.
#[derive(Debug, Clone)]
pub struct MultiChainRun {
    /// Row-wise concatenation of every chain, in chain order.
    pub table: PosteriorSampleTable,
    pub chains: Vec<ChainDiagnostics>,
    /// Split-R-hat summary; absent for a single chain.
    pub convergence: Option<ConvergenceSummary>,
}

/// Fixed-size worker pool scoped to one orchestrator call.
///
/// Workers pull chain indices from a shared counter until every chain has run.
#[derive(Debug, Clone, Copy)]
pub struct ChainPool {
    workers: usize,
}

impl ChainPool {
    /// Pool sized `min(chains, available_parallelism - 1)`, at least one worker.
    #[must_use]
    pub fn for_chains(chains: usize) -> Self {
        let spare = std::thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .saturating_sub(1);
        Self {
            workers: chains.min(spare).max(1),
        }
    }

    #[must_use]
    pub const fn workers(self) -> usize {
        self.workers
    }

    /// Run `job(i)` for every `i < jobs`, returning results in index order.
    ///
    /// # Errors
    ///
    /// Returns the error of the lowest-indexed failing job, or
    /// `HierarchyError::WorkerPanicked` if a job panicked before producing a result.
    pub fn run<T, F>(self, jobs: usize, job: F) -> Result<Vec<T>, HierarchyError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, HierarchyError> + Sync,
    {
        let next = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<Result<T, HierarchyError>>>> =
            Mutex::new((0..jobs).map(|_| None).collect());

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers.min(jobs))
                .map(|_| {
                    scope.spawn(|| {
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            if index >= jobs {
                                break;
                            }
                            let result = job(index);
                            if let Ok(mut slots) = slots.lock() {
                                slots[index] = Some(result);
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                // A panicked worker leaves its in-flight slot empty.
                drop(handle.join());
            }
        });

        slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or(Err(HierarchyError::WorkerPanicked { chain: index }))
            })
            .collect()
    }
}

/// Run `n_chain` independent chains, one per initial-value set, and pool them.
///
/// With `n_chain == 1` this is a single chain run on `inits[0]`.
///
/// # Errors
///
/// Returns `HierarchyError::InitCountMismatch` when `inits.len() != n_chain`,
/// `HierarchyError::SchemaMismatch` if chains disagree on columns, and the error of
/// the lowest-indexed failing chain otherwise.
pub fn run_chains(
    model: &HierarchicalModel,
    data: &AeDataset,
    inits: &[InitialValues],
    n_chain: usize,
    schedule: McmcSchedule,
) -> Result<PosteriorSampleTable, HierarchyError> {
    let config = SamplerConfig {
        schedule,
        hyperpriors: model.hyperpriors,
        ..SamplerConfig::default()
    };
    let options = MultiChainOptions {
        chains: n_chain,
        ..MultiChainOptions::default()
    };
    run_chains_with_options(data, inits, config, options).map(|run| run.table)
}

/// Run chains with explicit sampler configuration and scheduling options.
///
/// # Errors
///
/// See [`run_chains`]; also fails for invalid configuration or options.
pub fn run_chains_with_options(
    data: &AeDataset,
    inits: &[InitialValues],
    config: SamplerConfig,
    options: MultiChainOptions,
) -> Result<MultiChainRun, HierarchyError> {
    options.validate()?;
    config.validate()?;
    if inits.len() != options.chains {
        return Err(HierarchyError::InitCountMismatch {
            expected: options.chains,
            found: inits.len(),
        });
    }

    let graph = HierarchicalModel::new(config.hyperpriors).bind(data);
    let execution = if options.chains == 1 {
        ExecutionMode::Sequential
    } else {
        options.execution
    };

    info!(
        chains = options.chains,
        cells = graph.cell_count(),
        records = data.len(),
        iterations = config.schedule.total_iterations(),
        ?execution,
        "Starting hierarchical AE sampling"
    );

    let runs = match execution {
        ExecutionMode::Sequential => (0..options.chains)
            .map(|chain| run_indexed_chain(&graph, inits, config, options, chain))
            .collect::<Result<Vec<_>, _>>()?,
        ExecutionMode::Parallel => ChainPool::for_chains(options.chains).run(
            options.chains,
            |chain| run_indexed_chain(&graph, inits, config, options, chain),
        )?,
    };

    let (tables, chains): (Vec<_>, Vec<_>) = runs
        .into_iter()
        .map(|run| (run.table, run.diagnostics))
        .unzip();
    let table = PosteriorSampleTable::concat(tables)?;
    let convergence = if table.chain_count() >= 2 {
        match summarize_convergence(&table) {
            Ok(summary) => Some(summary),
            Err(error) => {
                warn!(chains = table.chain_count(), %error, "Convergence summary unavailable");
                None
            }
        }
    } else {
        None
    };

    info!(
        chains = table.chain_count(),
        draws = table.len(),
        columns = table.columns().len(),
        max_split_rhat = convergence.as_ref().and_then(|summary| summary.max_split_rhat),
        "Finished hierarchical AE sampling"
    );

    Ok(MultiChainRun {
        table,
        chains,
        convergence,
    })
}

fn run_indexed_chain(
    graph: &ModelGraph,
    inits: &[InitialValues],
    config: SamplerConfig,
    options: MultiChainOptions,
    chain: usize,
) -> Result<ChainRun, HierarchyError> {
    let init_values = &inits[chain];
    let seed = init_values
        .seed
        .unwrap_or_else(|| options.chain_seed(chain));
    run_chain_on_graph(graph, init_values, config, chain, seed)
}
