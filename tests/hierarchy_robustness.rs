use ae_hierarchical_models::{
    AeDataset, AeInputError, AeRecord, ExecutionMode, GroupCell, HierarchicalModel,
    HierarchyError, InitialValues, McmcSchedule, MultiChainOptions, ParameterFamily,
    ParameterKey, SamplerConfig, run_chain, run_chains, run_chains_with_options, summarize,
};

fn schedule() -> McmcSchedule {
    McmcSchedule {
        n_adapt: 200,
        n_burn: 200,
        n_iter: 400,
        thin: 2,
    }
}

#[test]
fn zero_event_cells_sample_without_divergence() {
    let data = AeDataset::new(vec![
        AeRecord::new(1, 1, 60, 60, 0, 0, "Renal", "Proteinuria"),
        AeRecord::new(1, 2, 60, 60, 0, 1, "Renal", "Haematuria"),
    ])
    .expect("records should be valid");
    let posterior = run_chain(
        &HierarchicalModel::default(),
        &data,
        &InitialValues::default(),
        schedule(),
    )
    .expect("sparse counts should still sample");

    assert_eq!(posterior.len(), 200);
    for key in posterior.columns() {
        let column = posterior.column(key).expect("column exists");
        assert!(column.iter().all(|value| value.is_finite()));
    }
}

#[test]
fn shared_cells_with_very_large_arms_sample() {
    let data = AeDataset::new(vec![
        AeRecord::new(1, 1, 3_000_000_000, 3_000_000_000, 12, 30, "Renal", "Proteinuria"),
        AeRecord::new(1, 1, 3_000_000_000, 3_000_000_000, 8, 20, "Renal", "Haematuria"),
    ])
    .expect("records should be valid");
    let schedule = McmcSchedule {
        n_adapt: 50,
        n_burn: 50,
        n_iter: 50,
        thin: 1,
    };
    let posterior = run_chain(
        &HierarchicalModel::default(),
        &data,
        &InitialValues::default(),
        schedule,
    )
    .expect("pooled counts beyond u32 should still sample");

    let gamma = posterior
        .column(&ParameterKey::new(ParameterFamily::Gamma, GroupCell::new(1, 1)))
        .expect("gamma column exists");
    assert_eq!(gamma.len(), 50);
    assert!(gamma.iter().all(|value| value.is_finite() && *value < -10.0));
}

#[test]
fn strong_treatment_signal_raises_odds_ratio() {
    let data = AeDataset::new(vec![
        AeRecord::new(1, 1, 300, 300, 3, 45, "Hepatobiliary", "Hepatotoxicity"),
        AeRecord::new(1, 2, 300, 300, 4, 5, "Hepatobiliary", "Cholestasis"),
    ])
    .expect("records should be valid");
    let inits = vec![InitialValues::default(); 2];
    let posterior = run_chains(&HierarchicalModel::default(), &data, &inits, 2, schedule())
        .expect("chains should run");

    let odds = posterior
        .column(&ParameterKey::new(ParameterFamily::OddsRatio, GroupCell::new(1, 1)))
        .expect("OR column");
    let diff = posterior
        .column(&ParameterKey::new(ParameterFamily::Diff, GroupCell::new(1, 1)))
        .expect("Diff column");
    assert!(summarize(&odds).p50 > 2.0);
    assert!(summarize(&diff).mean > 0.05);
}

#[test]
fn multi_chain_runs_are_reproducible() {
    let data = AeDataset::new(vec![
        AeRecord::new(1, 1, 90, 90, 5, 8, "Respiratory", "Cough"),
        AeRecord::new(2, 1, 90, 90, 2, 2, "Vascular", "Hypertension"),
    ])
    .expect("records should be valid");
    let config = SamplerConfig {
        schedule: McmcSchedule {
            n_adapt: 50,
            n_burn: 50,
            n_iter: 80,
            thin: 4,
        },
        ..SamplerConfig::default()
    };
    let options = MultiChainOptions {
        chains: 3,
        base_seed: 2_026,
        seed_stride: 31,
        execution: ExecutionMode::Parallel,
    };
    let inits = vec![InitialValues::default(); 3];

    let first = run_chains_with_options(&data, &inits, config, options).expect("first run");
    let second = run_chains_with_options(&data, &inits, config, options).expect("second run");

    assert_eq!(first.table.len(), 60);
    assert_eq!(first.table.chain_lengths(), &[20, 20, 20]);
    for row in 0..first.table.len() {
        assert_eq!(first.table.draw(row), second.table.draw(row));
    }
    let convergence = first.convergence.expect("three chains are summarized");
    assert_eq!(convergence.chain_count, 3);
    assert_eq!(convergence.split_rhat.len(), first.table.columns().len());
}

#[test]
fn invalid_inputs_are_rejected_before_sampling() {
    let error = AeDataset::new(vec![AeRecord::new(1, 1, 10, 10, 11, 0, "A", "a")])
        .expect_err("events exceed enrollment");
    assert!(matches!(error, AeInputError::CountExceedsEnrollment { .. }));

    let data = AeDataset::new(vec![AeRecord::new(1, 1, 10, 10, 1, 1, "A", "a")])
        .expect("records should be valid");
    let error = run_chains(&HierarchicalModel::default(), &data, &[], 0, schedule())
        .expect_err("zero chains");
    assert!(matches!(error, HierarchyError::InvalidChainCount { .. }));
}

#[test]
fn invalid_initial_values_surface_as_divergence() {
    let data = AeDataset::new(vec![AeRecord::new(1, 1, 40, 40, 2, 3, "A", "a")])
        .expect("records should be valid");
    let inits = InitialValues {
        alpha_pi: f64::NAN,
        ..InitialValues::default()
    };
    let error = run_chain(&HierarchicalModel::default(), &data, &inits, schedule())
        .expect_err("NaN init");
    let message = error.to_string();
    assert!(matches!(error, HierarchyError::SamplerDivergence { chain: 0, .. }));
    assert!(message.contains("alpha.pi"));
}
