//! Chain runner: Metropolis-within-Gibbs for the hierarchical mixture model.
//!
//! One iteration visits, in order:
//! 1. `gamma[b,j]` by random-walk Metropolis,
//! 2. the mixture indicator of each cell by an exact Bernoulli draw,
//! 3. `theta1[b,j]` from its prior when the cell sits on the point mass, else by
//!    random-walk Metropolis,
//! 4. `pi[b]` from its conjugate beta,
//! 5. SOC-level and top-level means and precisions from their conjugate normals/gammas,
//! 6. `alpha_pi`, `beta_pi` by random-walk Metropolis on `ln(x - lower)`.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use super::graph::{HierarchicalModel, ModelGraph};
use super::likelihood::{count_to_f64, logistic_stable};
use super::posterior::{ParameterFamily, ParameterKey, PosteriorSampleTable};
use super::priors::{
    HyperpriorConfig, log_beta_density, log_gamma_density, log_normal_precision_density,
};
use super::types::{
    AcceptanceRates, ChainDiagnostics, HierarchyError, InitialValues, MultiChainOptions,
    ProposalTuning, SamplerConfig,
};
use super::variates;
use crate::inference::{McmcSchedule, ProposalStats};
use crate::input::AeDataset;
use crate::utils::usize_to_f64;

const EPS_PROBABILITY: f64 = 1.0e-12;
const EMPIRICAL_CONTINUITY: f64 = 0.5;

/// Output of one chain: retained draws plus sampler diagnostics.
#[derive(Debug, Clone)]
pub struct ChainRun {
    pub table: PosteriorSampleTable,
    pub diagnostics: ChainDiagnostics,
}

#[derive(Debug, Clone)]
struct ChainState {
    gamma: Vec<f64>,
    theta1: Vec<f64>,
    point_mass: Vec<bool>,
    pi: Vec<f64>,
    mu_gamma: Vec<f64>,
    tau_gamma: Vec<f64>,
    mu_theta: Vec<f64>,
    tau_theta: Vec<f64>,
    mu_gamma_0: f64,
    tau_gamma_0: f64,
    mu_theta_0: f64,
    tau_theta_0: f64,
    alpha_pi: f64,
    beta_pi: f64,
}

impl ChainState {
    fn initialize(graph: &ModelGraph, inits: &InitialValues) -> Self {
        let soc_count = graph.soc_count();
        let (gamma, theta1): (Vec<f64>, Vec<f64>) = graph
            .cells()
            .iter()
            .map(|cell| {
                let counts = cell.counts;
                let control_logit =
                    empirical_logit(counts.control_events, counts.control_trials);
                let treatment_logit =
                    empirical_logit(counts.treatment_events, counts.treatment_trials);
                (control_logit, treatment_logit - control_logit)
            })
            .unzip();
        let prior_pi = inits.alpha_pi / (inits.alpha_pi + inits.beta_pi);

        Self {
            point_mass: vec![false; gamma.len()],
            gamma,
            theta1,
            pi: vec![prior_pi; soc_count],
            mu_gamma: vec![inits.mu_gamma_0; soc_count],
            tau_gamma: vec![inits.tau_gamma_0; soc_count],
            mu_theta: vec![inits.mu_theta_0; soc_count],
            tau_theta: vec![inits.tau_theta_0; soc_count],
            mu_gamma_0: inits.mu_gamma_0,
            tau_gamma_0: inits.tau_gamma_0,
            mu_theta_0: inits.mu_theta_0,
            tau_theta_0: inits.tau_theta_0,
            alpha_pi: inits.alpha_pi,
            beta_pi: inits.beta_pi,
        }
    }

    fn theta(&self, cell: usize) -> f64 {
        if self.point_mass[cell] {
            0.0
        } else {
            self.theta1[cell]
        }
    }

    /// Name of the first node holding a non-finite value, if any.
    fn first_non_finite(&self) -> Option<&'static str> {
        let all_finite = |values: &[f64]| values.iter().all(|value| value.is_finite());
        let blocks: [(&'static str, bool); 14] = [
            ("gamma", all_finite(&self.gamma)),
            ("theta1", all_finite(&self.theta1)),
            ("pi", all_finite(&self.pi)),
            ("mu.gamma", all_finite(&self.mu_gamma)),
            ("tau.gamma", all_finite(&self.tau_gamma)),
            ("mu.theta", all_finite(&self.mu_theta)),
            ("tau.theta", all_finite(&self.tau_theta)),
            ("mu.gamma.0", self.mu_gamma_0.is_finite()),
            ("tau.gamma.0", self.tau_gamma_0.is_finite()),
            ("mu.theta.0", self.mu_theta_0.is_finite()),
            ("tau.theta.0", self.tau_theta_0.is_finite()),
            ("alpha.pi", self.alpha_pi.is_finite()),
            ("beta.pi", self.beta_pi.is_finite()),
            (
                "precision",
                self.tau_gamma.iter().chain(&self.tau_theta).all(|tau| *tau > 0.0),
            ),
        ];
        blocks
            .into_iter()
            .find(|(_, finite)| !finite)
            .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone)]
struct ProposalScales {
    gamma: Vec<f64>,
    theta: Vec<f64>,
    alpha_pi: f64,
    beta_pi: f64,
}

impl ProposalScales {
    fn new(cell_count: usize, tuning: ProposalTuning) -> Self {
        Self {
            gamma: vec![tuning.gamma_draw_scale; cell_count],
            theta: vec![tuning.theta_draw_scale; cell_count],
            alpha_pi: tuning.log_beta_shape_draw_scale,
            beta_pi: tuning.log_beta_shape_draw_scale,
        }
    }
}

#[derive(Debug, Clone)]
struct AcceptanceCounts {
    gamma: Vec<ProposalStats>,
    theta: Vec<ProposalStats>,
    alpha_pi: ProposalStats,
    beta_pi: ProposalStats,
}

impl AcceptanceCounts {
    fn new(cell_count: usize) -> Self {
        Self {
            gamma: vec![ProposalStats::default(); cell_count],
            theta: vec![ProposalStats::default(); cell_count],
            alpha_pi: ProposalStats::default(),
            beta_pi: ProposalStats::default(),
        }
    }

    fn record_gamma(&mut self, cell: usize, accepted: bool) {
        self.gamma[cell].record(accepted);
    }

    fn record_theta(&mut self, cell: usize, accepted: bool) {
        self.theta[cell].record(accepted);
    }

    fn reset(&mut self) {
        self.gamma.iter_mut().for_each(ProposalStats::reset);
        self.theta.iter_mut().for_each(ProposalStats::reset);
        self.alpha_pi.reset();
        self.beta_pi.reset();
    }

    fn rates(&self) -> AcceptanceRates {
        AcceptanceRates {
            gamma: pooled_rate(&self.gamma),
            theta: pooled_rate(&self.theta),
            alpha_pi: self.alpha_pi.acceptance_rate(),
            beta_pi: self.beta_pi.acceptance_rate(),
        }
    }
}

struct SamplerContext<'a> {
    graph: &'a ModelGraph,
    hyperpriors: HyperpriorConfig,
    chain: usize,
}

/// Run one chain of the hierarchical model.
///
/// The chain adapts for `schedule.n_adapt` iterations, discards `schedule.n_burn`
/// more, then keeps every `schedule.thin`-th of `schedule.n_iter` iterations.
/// Columns cover `Diff`, `OR`, `gamma`, and `theta` for every `(b, j)` cell in
/// `data`. The RNG seed is `init_values.seed`, or the default chain-0 seed.
///
/// # Errors
///
/// Returns `HierarchyError::SamplerDivergence` if the chain cannot initialize or its
/// state becomes non-finite, and configuration errors for an invalid schedule.
pub fn run_chain(
    model: &HierarchicalModel,
    data: &AeDataset,
    init_values: &InitialValues,
    schedule: McmcSchedule,
) -> Result<PosteriorSampleTable, HierarchyError> {
    let config = SamplerConfig {
        schedule,
        hyperpriors: model.hyperpriors,
        ..SamplerConfig::default()
    };
    let seed = init_values
        .seed
        .unwrap_or_else(|| MultiChainOptions::default().chain_seed(0));
    let graph = model.bind(data);
    run_chain_on_graph(&graph, init_values, config, 0, seed).map(|run| run.table)
}

/// Run one chain with explicit sampler configuration and seed.
///
/// An explicit `init_values.seed` takes precedence over `seed`.
///
/// # Errors
///
/// Returns `HierarchyError` if the configuration is invalid or the chain diverges.
pub fn run_chain_with_config(
    data: &AeDataset,
    init_values: &InitialValues,
    config: SamplerConfig,
    seed: u64,
) -> Result<ChainRun, HierarchyError> {
    let graph = HierarchicalModel::new(config.hyperpriors).bind(data);
    run_chain_on_graph(&graph, init_values, config, 0, init_values.seed.unwrap_or(seed))
}

pub(crate) fn run_chain_on_graph(
    graph: &ModelGraph,
    init_values: &InitialValues,
    config: SamplerConfig,
    chain: usize,
    seed: u64,
) -> Result<ChainRun, HierarchyError> {
    config.validate()?;
    init_values
        .validate()
        .map_err(|error| HierarchyError::SamplerDivergence {
            chain,
            reason: format!("cannot initialize: {error}"),
        })?;

    let context = SamplerContext {
        graph,
        hyperpriors: config.hyperpriors,
        chain,
    };
    let mut state = ChainState::initialize(graph, init_values);
    let initial_log_posterior = context.log_posterior(&state);
    if !initial_log_posterior.is_finite() {
        return Err(HierarchyError::SamplerDivergence {
            chain,
            reason: format!("initial log posterior is not finite ({initial_log_posterior})"),
        });
    }

    debug!(
        chain,
        seed,
        cells = graph.cell_count(),
        socs = graph.soc_count(),
        iterations = config.schedule.total_iterations(),
        "Starting chain"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let (table, acceptance_rates) = run_mcmc_chain(&context, &mut rng, &mut state, config)?;

    debug!(
        chain,
        retained = table.len(),
        gamma_acceptance = acceptance_rates.gamma,
        theta_acceptance = acceptance_rates.theta,
        "Chain finished"
    );

    Ok(ChainRun {
        diagnostics: ChainDiagnostics {
            chain,
            seed,
            iterations_completed: config.schedule.total_iterations(),
            retained_draws: table.len(),
            acceptance_rates,
        },
        table,
    })
}

fn run_mcmc_chain(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
    config: SamplerConfig,
) -> Result<(PosteriorSampleTable, AcceptanceRates), HierarchyError> {
    let schedule = config.schedule;
    let tuning = config.proposal_tuning;
    let cell_count = context.graph.cell_count();
    let mut scales = ProposalScales::new(cell_count, tuning);
    let mut window = AcceptanceCounts::new(cell_count);
    let mut post_adaptation = AcceptanceCounts::new(cell_count);
    let mut table = PosteriorSampleTable::new(tracked_columns(context.graph));

    for iter in 0..schedule.total_iterations() {
        let adapting = schedule.is_adapting(iter);
        let counts = if adapting {
            &mut window
        } else {
            &mut post_adaptation
        };

        context.update_gamma_block(rng, state, &scales.gamma, counts);
        context.update_mixture_block(rng, state, &scales.theta, counts);
        context.update_soc_blocks(rng, state);
        context.update_top_level_blocks(rng, state);
        counts
            .alpha_pi
            .record(context.update_beta_shape(rng, state, BetaShape::Alpha, scales.alpha_pi));
        counts
            .beta_pi
            .record(context.update_beta_shape(rng, state, BetaShape::Beta, scales.beta_pi));

        if let Some(node) = state.first_non_finite() {
            return Err(HierarchyError::SamplerDivergence {
                chain: context.chain,
                reason: format!("{node} left its support at iteration {iter}"),
            });
        }

        let window_closed = (iter + 1).is_multiple_of(tuning.adaptation_interval)
            || iter + 1 == schedule.n_adapt;
        if adapting && window_closed {
            adapt_proposal_scales(&mut scales, &window, tuning);
            if iter + 1 == schedule.n_adapt {
                warn_on_poor_adaptation(context.chain, &window, tuning);
            }
            window.reset();
        }

        if schedule.is_retained(iter) {
            table.push_draw(tracked_values(context.graph, state));
        }
    }

    Ok((table, post_adaptation.rates()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BetaShape {
    Alpha,
    Beta,
}

impl SamplerContext<'_> {
    fn update_gamma_block(
        &self,
        rng: &mut StdRng,
        state: &mut ChainState,
        scales: &[f64],
        counts: &mut AcceptanceCounts,
    ) {
        for (index, cell) in self.graph.cells().iter().enumerate() {
            let (mu, tau) = (state.mu_gamma[cell.soc_slot], state.tau_gamma[cell.soc_slot]);
            let theta = state.theta(index);
            let current = state.gamma[index];
            let proposal = scales[index].mul_add(variates::standard_normal(rng), current);
            let log_ratio = cell.counts.log_likelihood(proposal, theta)
                - cell.counts.log_likelihood(current, theta)
                + log_normal_precision_density(proposal, mu, tau)
                - log_normal_precision_density(current, mu, tau);
            let accepted = should_accept(log_ratio, rng);
            if accepted {
                state.gamma[index] = proposal;
            }
            counts.record_gamma(index, accepted);
        }
    }

    fn update_mixture_block(
        &self,
        rng: &mut StdRng,
        state: &mut ChainState,
        scales: &[f64],
        counts: &mut AcceptanceCounts,
    ) {
        for (index, cell) in self.graph.cells().iter().enumerate() {
            let slot = cell.soc_slot;
            let gamma = state.gamma[index];
            let pi = state.pi[slot].clamp(EPS_PROBABILITY, 1.0 - EPS_PROBABILITY);

            // The control arm does not involve theta and cancels from the odds.
            let log_null = pi.ln() + cell.counts.treatment_log_likelihood(gamma, 0.0);
            let log_effect = (-pi).ln_1p()
                + cell
                    .counts
                    .treatment_log_likelihood(gamma, state.theta1[index]);
            let null_probability = logistic_stable(log_null - log_effect);
            state.point_mass[index] = variates::uniform(rng) < null_probability;

            let mu = state.mu_theta[slot];
            let tau = state.tau_theta[slot];
            if state.point_mass[index] {
                state.theta1[index] = variates::normal_precision(rng, mu, tau);
                continue;
            }

            let current = state.theta1[index];
            let proposal = scales[index].mul_add(variates::standard_normal(rng), current);
            let log_ratio = cell.counts.treatment_log_likelihood(gamma, proposal)
                - cell.counts.treatment_log_likelihood(gamma, current)
                + log_normal_precision_density(proposal, mu, tau)
                - log_normal_precision_density(current, mu, tau);
            let accepted = should_accept(log_ratio, rng);
            if accepted {
                state.theta1[index] = proposal;
            }
            counts.record_theta(index, accepted);
        }
    }

    fn update_soc_blocks(&self, rng: &mut StdRng, state: &mut ChainState) {
        for slot in 0..self.graph.soc_count() {
            let cells = self.graph.soc_cells(slot);
            let cell_count = usize_to_f64(cells.len());
            let null_cells = cells.iter().filter(|cell| state.point_mass[**cell]).count();

            state.pi[slot] = variates::beta(
                rng,
                state.alpha_pi + usize_to_f64(null_cells),
                state.beta_pi + usize_to_f64(cells.len() - null_cells),
            )
            .clamp(EPS_PROBABILITY, 1.0 - EPS_PROBABILITY);

            let gamma_sum = cells.iter().map(|cell| state.gamma[*cell]).sum::<f64>();
            state.mu_gamma[slot] = draw_normal_mean(
                rng,
                (state.mu_gamma_0, state.tau_gamma_0),
                gamma_sum,
                cell_count,
                state.tau_gamma[slot],
            );
            let gamma_ss = sum_of_squares(
                cells.iter().map(|cell| state.gamma[*cell]),
                state.mu_gamma[slot],
            );
            state.tau_gamma[slot] = self.draw_precision(rng, cell_count, gamma_ss);

            let theta_sum = cells.iter().map(|cell| state.theta1[*cell]).sum::<f64>();
            state.mu_theta[slot] = draw_normal_mean(
                rng,
                (state.mu_theta_0, state.tau_theta_0),
                theta_sum,
                cell_count,
                state.tau_theta[slot],
            );
            let theta_ss = sum_of_squares(
                cells.iter().map(|cell| state.theta1[*cell]),
                state.mu_theta[slot],
            );
            state.tau_theta[slot] = self.draw_precision(rng, cell_count, theta_ss);
        }
    }

    fn update_top_level_blocks(&self, rng: &mut StdRng, state: &mut ChainState) {
        let soc_count = usize_to_f64(self.graph.soc_count());
        let top_prior = (0.0, self.hyperpriors.top_mean_precision);

        state.mu_gamma_0 = draw_normal_mean(
            rng,
            top_prior,
            state.mu_gamma.iter().sum(),
            soc_count,
            state.tau_gamma_0,
        );
        let gamma_ss = sum_of_squares(state.mu_gamma.iter().copied(), state.mu_gamma_0);
        state.tau_gamma_0 = self.draw_precision(rng, soc_count, gamma_ss);

        state.mu_theta_0 = draw_normal_mean(
            rng,
            top_prior,
            state.mu_theta.iter().sum(),
            soc_count,
            state.tau_theta_0,
        );
        let theta_ss = sum_of_squares(state.mu_theta.iter().copied(), state.mu_theta_0);
        state.tau_theta_0 = self.draw_precision(rng, soc_count, theta_ss);
    }

    fn update_beta_shape(
        &self,
        rng: &mut StdRng,
        state: &mut ChainState,
        shape: BetaShape,
        scale: f64,
    ) -> bool {
        let lower = self.hyperpriors.beta_shape_lower;
        let current = match shape {
            BetaShape::Alpha => state.alpha_pi,
            BetaShape::Beta => state.beta_pi,
        };
        let current_log = (current - lower).ln();
        let proposal_log = scale.mul_add(variates::standard_normal(rng), current_log);
        let proposal = lower + proposal_log.exp();

        // Random walk on ln(x - lower): the Jacobian adds (x - lower) to the target.
        let log_ratio = self.beta_shape_log_target(state, shape, proposal) + proposal_log
            - self.beta_shape_log_target(state, shape, current)
            - current_log;
        let accepted = should_accept(log_ratio, rng);
        if accepted {
            match shape {
                BetaShape::Alpha => state.alpha_pi = proposal,
                BetaShape::Beta => state.beta_pi = proposal,
            }
        }
        accepted
    }

    fn beta_shape_log_target(&self, state: &ChainState, shape: BetaShape, value: f64) -> f64 {
        let (alpha, beta) = match shape {
            BetaShape::Alpha => (value, state.beta_pi),
            BetaShape::Beta => (state.alpha_pi, value),
        };
        self.hyperpriors.log_beta_shape_prior(value)
            + state
                .pi
                .iter()
                .map(|pi| log_beta_density(*pi, alpha, beta))
                .sum::<f64>()
    }

    fn draw_precision(&self, rng: &mut StdRng, count: f64, sum_of_squares: f64) -> f64 {
        variates::gamma(
            rng,
            0.5f64.mul_add(count, self.hyperpriors.precision_shape),
            0.5f64.mul_add(sum_of_squares, self.hyperpriors.precision_rate),
        )
    }

    /// Joint log density of data and every latent node, up to a constant.
    fn log_posterior(&self, state: &ChainState) -> f64 {
        let hyperpriors = self.hyperpriors;
        let theta: Vec<f64> = (0..self.graph.cell_count())
            .map(|cell| state.theta(cell))
            .collect();
        let mut total = self.graph.log_likelihood(&state.gamma, &theta);

        for (index, cell) in self.graph.cells().iter().enumerate() {
            let slot = cell.soc_slot;
            let pi = state.pi[slot];
            total += log_normal_precision_density(
                state.gamma[index],
                state.mu_gamma[slot],
                state.tau_gamma[slot],
            ) + log_normal_precision_density(
                state.theta1[index],
                state.mu_theta[slot],
                state.tau_theta[slot],
            ) + if state.point_mass[index] {
                pi.ln()
            } else {
                (-pi).ln_1p()
            };
        }

        let precision_prior = |tau: f64| {
            log_gamma_density(tau, hyperpriors.precision_shape, hyperpriors.precision_rate)
        };
        for slot in 0..self.graph.soc_count() {
            total += log_beta_density(state.pi[slot], state.alpha_pi, state.beta_pi)
                + log_normal_precision_density(
                    state.mu_gamma[slot],
                    state.mu_gamma_0,
                    state.tau_gamma_0,
                )
                + precision_prior(state.tau_gamma[slot])
                + log_normal_precision_density(
                    state.mu_theta[slot],
                    state.mu_theta_0,
                    state.tau_theta_0,
                )
                + precision_prior(state.tau_theta[slot]);
        }

        total
            + log_normal_precision_density(state.mu_gamma_0, 0.0, hyperpriors.top_mean_precision)
            + precision_prior(state.tau_gamma_0)
            + log_normal_precision_density(state.mu_theta_0, 0.0, hyperpriors.top_mean_precision)
            + precision_prior(state.tau_theta_0)
            + hyperpriors.log_beta_shape_prior(state.alpha_pi)
            + hyperpriors.log_beta_shape_prior(state.beta_pi)
    }
}

/// Tracked columns in emission order: family, then cell (PT index, then SOC index).
fn tracked_columns(graph: &ModelGraph) -> Vec<ParameterKey> {
    ParameterFamily::ALL
        .into_iter()
        .flat_map(|family| {
            graph
                .cells()
                .iter()
                .map(move |cell| ParameterKey::new(family, cell.group))
        })
        .collect()
}

fn tracked_values(graph: &ModelGraph, state: &ChainState) -> Vec<f64> {
    let cell_count = graph.cell_count();
    let mut values = Vec::with_capacity(ParameterFamily::ALL.len() * cell_count);
    for family in ParameterFamily::ALL {
        values.extend((0..cell_count).map(|cell| {
            let gamma = state.gamma[cell];
            let theta = state.theta(cell);
            match family {
                ParameterFamily::Diff => logistic_stable(gamma + theta) - logistic_stable(gamma),
                ParameterFamily::OddsRatio => theta.exp(),
                ParameterFamily::Gamma => gamma,
                ParameterFamily::Theta => theta,
            }
        }));
    }
    values
}

/// Draw a normal mean given a `(mean, precision)` prior and `count` observations
/// summing to `data_sum`, each with precision `data_precision`.
fn draw_normal_mean(
    rng: &mut StdRng,
    prior: (f64, f64),
    data_sum: f64,
    count: f64,
    data_precision: f64,
) -> f64 {
    let (prior_mean, prior_precision) = prior;
    let precision = count.mul_add(data_precision, prior_precision);
    let mean = prior_precision.mul_add(prior_mean, data_precision * data_sum) / precision;
    variates::normal_precision(rng, mean, precision)
}

fn sum_of_squares(values: impl Iterator<Item = f64>, center: f64) -> f64 {
    values
        .map(|value| {
            let centered = value - center;
            centered * centered
        })
        .sum()
}

/// Empirical logit with a 0.5 continuity correction, so zero counts stay finite.
fn empirical_logit(events: u64, trials: u64) -> f64 {
    let events_f = count_to_f64(events);
    let non_events = count_to_f64(trials.saturating_sub(events));
    ((events_f + EMPIRICAL_CONTINUITY) / (non_events + EMPIRICAL_CONTINUITY)).ln()
}

fn pooled_rate(stats: &[ProposalStats]) -> f64 {
    let pooled = stats
        .iter()
        .fold(ProposalStats::default(), |mut total, cell| {
            total.proposed += cell.proposed;
            total.accepted += cell.accepted;
            total
        });
    pooled.acceptance_rate()
}

fn should_accept(log_acceptance: f64, rng: &mut StdRng) -> bool {
    log_acceptance >= 0.0 || variates::uniform(rng).ln() < log_acceptance
}

fn adapt_proposal_scales(
    scales: &mut ProposalScales,
    window: &AcceptanceCounts,
    tuning: ProposalTuning,
) {
    adapt_cell_scales(&mut scales.gamma, &window.gamma, tuning);
    adapt_cell_scales(&mut scales.theta, &window.theta, tuning);
    scales.alpha_pi = adapt_scalar_scale(scales.alpha_pi, window.alpha_pi, tuning);
    scales.beta_pi = adapt_scalar_scale(scales.beta_pi, window.beta_pi, tuning);
}

fn adapt_cell_scales(scales: &mut [f64], window: &[ProposalStats], tuning: ProposalTuning) {
    for (scale, stats) in scales.iter_mut().zip(window) {
        *scale = adapt_scalar_scale(*scale, *stats, tuning);
    }
}

/// Cells on the point mass propose nothing; their scale is left alone.
fn adapt_scalar_scale(scale: f64, stats: ProposalStats, tuning: ProposalTuning) -> f64 {
    if stats.proposed == 0 {
        return scale;
    }
    (scale * adaptation_factor(stats.acceptance_rate(), tuning)).max(tuning.min_draw_scale)
}

fn adaptation_factor(acceptance: f64, tuning: ProposalTuning) -> f64 {
    if acceptance < tuning.acceptance_target_low {
        tuning.scale_decrease_factor
    } else if acceptance > tuning.acceptance_target_high {
        tuning.scale_increase_factor
    } else {
        1.0
    }
}

fn warn_on_poor_adaptation(chain: usize, window: &AcceptanceCounts, tuning: ProposalTuning) {
    let floor = tuning.acceptance_target_low / 2.0;
    let rates = window.rates();
    let theta_proposed = window.theta.iter().any(|stats| stats.proposed > 0);
    let blocks = [
        ("gamma", rates.gamma, true),
        ("theta", rates.theta, theta_proposed),
        ("alpha.pi", rates.alpha_pi, true),
        ("beta.pi", rates.beta_pi, true),
    ];
    for (block, rate, proposed) in blocks {
        if proposed && rate < floor {
            warn!(chain, block, rate, "Low acceptance rate at the end of adaptation");
        }
    }
}
