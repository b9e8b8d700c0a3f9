use ae_hierarchical_models::{
    AeDataset, AeRecord, HierarchicalModel, InitialValues, McmcSchedule, build_report,
    extract_probabilities, render_report, run_chains, summarize,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let data = synthetic_safety_data()?;
    let schedule = McmcSchedule {
        n_adapt: 500,
        n_burn: 500,
        n_iter: 2_000,
        thin: 2,
    };
    let inits = vec![
        InitialValues::default(),
        InitialValues {
            mu_theta_0: 0.5,
            tau_theta_0: 5.0,
            ..InitialValues::default()
        },
        InitialValues {
            mu_gamma_0: -2.0,
            alpha_pi: 3.0,
            beta_pi: 1.5,
            ..InitialValues::default()
        },
    ];

    let posterior = run_chains(&HierarchicalModel::default(), &data, &inits, 3, schedule)?;
    println!(
        "Sampling complete: chains={}, draws={}, columns={}",
        posterior.chain_count(),
        posterior.len(),
        posterior.columns().len()
    );

    let report = build_report(&data, &posterior)?;
    println!("{}", render_report(&report));

    let incidence = extract_probabilities(&data, &posterior)?;
    for (treatment, control) in incidence.pit.rows().iter().zip(incidence.pic.rows()) {
        let pit = summarize(&treatment.draws);
        let pic = summarize(&control.draws);
        println!(
            "{:<28} {:<18} pit={:.3} [{:.3}, {:.3}]  pic={:.3} [{:.3}, {:.3}]",
            treatment.soc,
            treatment.pt,
            pit.mean,
            pit.p2_5,
            pit.p97_5,
            pic.mean,
            pic.p2_5,
            pic.p97_5
        );
    }

    Ok(())
}

fn synthetic_safety_data() -> Result<AeDataset, ae_hierarchical_models::AeInputError> {
    let (nc, nt) = (224, 226);
    AeDataset::new(vec![
        AeRecord::new(1, 1, nc, nt, 12, 21, "Gastrointestinal disorders", "Nausea"),
        AeRecord::new(1, 2, nc, nt, 9, 11, "Gastrointestinal disorders", "Diarrhoea"),
        AeRecord::new(1, 3, nc, nt, 4, 10, "Gastrointestinal disorders", "Vomiting"),
        AeRecord::new(1, 4, nc, nt, 3, 3, "Gastrointestinal disorders", "Dyspepsia"),
        AeRecord::new(2, 1, nc, nt, 18, 20, "Nervous system disorders", "Headache"),
        AeRecord::new(2, 2, nc, nt, 6, 7, "Nervous system disorders", "Dizziness"),
        AeRecord::new(2, 3, nc, nt, 1, 2, "Nervous system disorders", "Somnolence"),
        AeRecord::new(3, 1, nc, nt, 2, 9, "Skin and subcutaneous tissue disorders", "Rash"),
        AeRecord::new(3, 2, nc, nt, 1, 4, "Skin and subcutaneous tissue disorders", "Pruritus"),
        AeRecord::new(4, 1, nc, nt, 7, 8, "Infections and infestations", "Nasopharyngitis"),
    ])
}
