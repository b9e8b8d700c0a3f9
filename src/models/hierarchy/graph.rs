//! Model definition: the fixed three-level graph bound to one AE dataset.
//!
//! ```text
//! X[i] ~ Binomial(Nc, c[b,j])        logit(c[b,j]) = gamma[b,j]
//! Y[i] ~ Binomial(Nt, t[b,j])        logit(t[b,j]) = gamma[b,j] + theta[b,j]
//! gamma[b,j]  ~ Normal(mu_gamma[b], tau_gamma[b])
//! theta[b,j]  = (1 - p0[b,j]) * theta1[b,j]
//! p0[b,j]     ~ Bernoulli(pi[b])
//! theta1[b,j] ~ Normal(mu_theta[b], tau_theta[b])
//! pi[b] ~ Beta(alpha_pi, beta_pi)
//! mu_gamma[b] ~ Normal(mu_gamma_0, tau_gamma_0)   tau_gamma[b] ~ Gamma(3, 1)
//! mu_theta[b] ~ Normal(mu_theta_0, tau_theta_0)   tau_theta[b] ~ Gamma(3, 1)
//! mu_gamma_0, mu_theta_0 ~ Normal(0, 0.1)         tau_gamma_0, tau_theta_0 ~ Gamma(3, 1)
//! alpha_pi, beta_pi ~ Exponential(0.1) truncated to (1, inf)
//! ```
//!
//! Latent parameters are indexed by group cell `(b, j)`, not by record: every record
//! mapping onto the same pair shares one cell and contributes its counts to that cell's
//! likelihood. The mixture indicator belongs to the cell, so every record sharing a
//! pair also shares one indicator draw.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::likelihood::CellCounts;
use super::priors::HyperpriorConfig;
use crate::input::AeDataset;

/// A `(b, j)` group pair: SOC index and PT index, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupCell {
    pub soc: usize,
    pub pt: usize,
}

impl GroupCell {
    #[must_use]
    pub const fn new(soc: usize, pt: usize) -> Self {
        Self { soc, pt }
    }

    /// Sort key used for column emission: PT index first, then SOC index.
    #[must_use]
    pub const fn emission_key(self) -> (usize, usize) {
        (self.pt, self.soc)
    }
}

impl fmt::Display for GroupCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.soc, self.pt)
    }
}

/// One latent cell of the arena.
#[derive(Debug, Clone)]
pub struct LatentCell {
    pub group: GroupCell,
    /// 0-based SOC slot (`b - 1`).
    pub soc_slot: usize,
    /// Counts summed over every record mapped onto this cell.
    pub counts: CellCounts,
}

/// The fixed hierarchical model, parameterized only by its hyperprior constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalModel {
    pub hyperpriors: HyperpriorConfig,
}

impl HierarchicalModel {
    #[must_use]
    pub const fn new(hyperpriors: HyperpriorConfig) -> Self {
        Self { hyperpriors }
    }

    /// Build the cell arena for `data`.
    #[must_use]
    pub fn bind(&self, data: &AeDataset) -> ModelGraph {
        ModelGraph::build(data)
    }
}

/// Model graph bound to a dataset: latent cell arena plus SOC index.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    cells: Vec<LatentCell>,
    soc_cells: Vec<Vec<usize>>,
}

impl ModelGraph {
    fn build(data: &AeDataset) -> Self {
        let mut counts_by_group: HashMap<GroupCell, CellCounts> = HashMap::new();
        for record in data.records() {
            let counts = counts_by_group
                .entry(GroupCell::new(record.soc_index, record.pt_index))
                .or_default();
            counts.control_events += u64::from(record.ae_control);
            counts.control_trials += u64::from(record.n_control);
            counts.treatment_events += u64::from(record.ae_treatment);
            counts.treatment_trials += u64::from(record.n_treatment);
        }

        let mut groups: Vec<(GroupCell, CellCounts)> = counts_by_group.into_iter().collect();
        groups.sort_by_key(|(group, _)| group.emission_key());

        let mut cells = Vec::with_capacity(groups.len());
        let mut soc_cells = vec![Vec::new(); data.soc_count()];
        for (cell_index, (group, counts)) in groups.into_iter().enumerate() {
            let soc_slot = group.soc - 1;
            soc_cells[soc_slot].push(cell_index);
            cells.push(LatentCell {
                group,
                soc_slot,
                counts,
            });
        }

        Self { cells, soc_cells }
    }

    /// Latent cells in column-emission order (PT index, then SOC index).
    #[must_use]
    pub fn cells(&self) -> &[LatentCell] {
        &self.cells
    }

    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn soc_count(&self) -> usize {
        self.soc_cells.len()
    }

    /// Cell indices belonging to 0-based SOC slot `soc_slot`.
    #[must_use]
    pub fn soc_cells(&self, soc_slot: usize) -> &[usize] {
        &self.soc_cells[soc_slot]
    }

    /// Data log-likelihood kernel given per-cell `gamma` and realized `theta`.
    #[must_use]
    pub fn log_likelihood(&self, gamma: &[f64], theta: &[f64]) -> f64 {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| cell.counts.log_likelihood(gamma[index], theta[index]))
            .sum()
    }
}
