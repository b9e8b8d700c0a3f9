//! MCMC convergence diagnostics for pooled multi-chain tables.

use super::posterior::{ParameterKey, PosteriorSampleTable};
use super::types::HierarchyError;
use crate::utils::{mean, sample_variance, usize_to_f64};

/// Split-R-hat summary over every column of a multi-chain table.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceSummary {
    pub chain_count: usize,
    pub draws_per_chain_used: usize,
    /// Split-R-hat per column, in column order.
    pub split_rhat: Vec<(ParameterKey, f64)>,
    pub max_split_rhat: Option<f64>,
    /// Smallest pooled effective sample size across columns.
    pub min_effective_sample_size: Option<f64>,
}

impl ConvergenceSummary {
    /// Columns whose split-R-hat exceeds `threshold`.
    pub fn flagged(&self, threshold: f64) -> impl Iterator<Item = &(ParameterKey, f64)> + '_ {
        self.split_rhat
            .iter()
            .filter(move |(_, rhat)| *rhat > threshold)
    }
}

/// Lag-`k` autocorrelation for a scalar chain.
#[must_use]
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.0;
    }

    let center = mean(series);
    let denominator = series
        .iter()
        .map(|value| (value - center) * (value - center))
        .sum::<f64>();
    if denominator <= 0.0 {
        return 0.0;
    }

    let numerator = series
        .iter()
        .zip(&series[lag..])
        .map(|(head, tail)| (head - center) * (tail - center))
        .sum::<f64>();
    numerator / denominator
}

/// Effective sample size, truncating the autocorrelation sum at the first
/// non-positive lag.
#[must_use]
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    usize_to_f64(n) / 2.0f64.mul_add(rho_sum, 1.0).max(1.0)
}

/// Split-R-hat for every column of a pooled table.
///
/// Chains are truncated to the shortest chain's even draw count.
///
/// # Errors
///
/// Returns `HierarchyError::InvalidChainCount` for fewer than two chains and
/// `HierarchyError::InsufficientChainDraws` when fewer than four draws per chain remain.
pub fn summarize_convergence(
    table: &PosteriorSampleTable,
) -> Result<ConvergenceSummary, HierarchyError> {
    let chain_count = table.chain_count();
    if chain_count < 2 {
        return Err(HierarchyError::InvalidChainCount {
            min: 2,
            found: chain_count,
        });
    }

    let min_draws = table.chain_lengths().iter().copied().min().unwrap_or(0);
    let draws_per_chain_used = min_draws - (min_draws % 2);
    if draws_per_chain_used < 4 {
        return Err(HierarchyError::InsufficientChainDraws {
            minimum: 4,
            found: draws_per_chain_used,
        });
    }

    let mut split_rhat = Vec::with_capacity(table.columns().len());
    let mut min_effective_sample_size: Option<f64> = None;
    for key in table.columns() {
        let Some(chains) = table.chain_columns(key) else {
            continue;
        };
        let truncated: Vec<&[f64]> = chains
            .iter()
            .map(|chain| &chain[..draws_per_chain_used])
            .collect();
        split_rhat.push((*key, split_rhat_from_chains(&truncated)));

        let ess = truncated
            .iter()
            .map(|chain| effective_sample_size(chain))
            .sum::<f64>();
        min_effective_sample_size =
            Some(min_effective_sample_size.map_or(ess, |current| current.min(ess)));
    }

    let max_split_rhat = split_rhat
        .iter()
        .map(|(_, rhat)| *rhat)
        .max_by(f64::total_cmp);

    Ok(ConvergenceSummary {
        chain_count,
        draws_per_chain_used,
        split_rhat,
        max_split_rhat,
        min_effective_sample_size,
    })
}

fn split_rhat_from_chains(chains: &[&[f64]]) -> f64 {
    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|chain| {
            let (first, second) = chain.split_at(chain.len() / 2);
            [first, second]
        })
        .collect();
    split_rhat_scalar(&halves)
}

/// Gelman-Rubin potential scale reduction over equal-length chains, floored at 1.
fn split_rhat_scalar(chains: &[&[f64]]) -> f64 {
    let m = chains.len();
    let n = chains.first().map_or(0, |chain| chain.len());
    if m < 2 || n < 2 {
        return 1.0;
    }

    let chain_means: Vec<f64> = chains.iter().map(|chain| mean(chain)).collect();
    let between = usize_to_f64(n) * sample_variance(&chain_means);
    let within = chains
        .iter()
        .map(|chain| sample_variance(chain))
        .sum::<f64>()
        / usize_to_f64(m);

    if !(within.is_finite() && within > 0.0 && between.is_finite()) {
        return 1.0;
    }

    let n_f64 = usize_to_f64(n);
    let var_plus = ((n_f64 - 1.0) / n_f64).mul_add(within, between / n_f64);
    if !var_plus.is_finite() || var_plus <= 0.0 {
        return 1.0;
    }

    (var_plus / within).sqrt().max(1.0)
}
