use ae_hierarchical_models::{
    AeDataset, AeRecord, ExecutionMode, InitialValues, McmcSchedule, MultiChainOptions,
    ProposalTuning, SamplerConfig, run_chains_with_options,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let data = AeDataset::new(vec![
        AeRecord::new(1, 1, 180, 182, 5, 14, "Cardiac disorders", "Palpitations"),
        AeRecord::new(1, 2, 180, 182, 3, 4, "Cardiac disorders", "Tachycardia"),
        AeRecord::new(2, 1, 180, 182, 11, 12, "Vascular disorders", "Hypertension"),
        AeRecord::new(2, 2, 180, 182, 2, 6, "Vascular disorders", "Flushing"),
    ])?;

    let config = SamplerConfig {
        schedule: McmcSchedule {
            n_adapt: 1_000,
            n_burn: 1_000,
            n_iter: 4_000,
            thin: 4,
        },
        proposal_tuning: ProposalTuning {
            adaptation_interval: 100,
            ..ProposalTuning::default()
        },
        ..SamplerConfig::default()
    };
    let options = MultiChainOptions {
        chains: 4,
        base_seed: 2_026,
        execution: ExecutionMode::Parallel,
        ..MultiChainOptions::default()
    };
    let inits = vec![InitialValues::default(); options.chains];

    let run = run_chains_with_options(&data, &inits, config, options)?;

    for chain in &run.chains {
        let rates = chain.acceptance_rates;
        println!(
            "chain {} (seed {}): retained={}, acceptance gamma={:.2}, theta={:.2}, alpha.pi={:.2}, beta.pi={:.2}",
            chain.chain,
            chain.seed,
            chain.retained_draws,
            rates.gamma,
            rates.theta,
            rates.alpha_pi,
            rates.beta_pi
        );
    }

    if let Some(convergence) = &run.convergence {
        println!(
            "Convergence: chains={}, draws/chain={}, max split-R-hat={:.3}, min ESS={:.1}",
            convergence.chain_count,
            convergence.draws_per_chain_used,
            convergence.max_split_rhat.unwrap_or(f64::NAN),
            convergence.min_effective_sample_size.unwrap_or(f64::NAN)
        );
        for (key, rhat) in convergence.flagged(1.05) {
            println!("  {key} split-R-hat={rhat:.3}");
        }
    }

    Ok(())
}
