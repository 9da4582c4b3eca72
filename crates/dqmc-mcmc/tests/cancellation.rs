use dqmc_engine::ModelParams;
use dqmc_mcmc::{run_with_field, CancelToken, MonteCarloConfig, RunConfig};

fn config() -> RunConfig {
    let mut config = RunConfig::default();
    config.model = ModelParams {
        ll: 2,
        lt: 4,
        beta: 0.5,
        nwrap: 2,
        ..ModelParams::default()
    };
    config.monte_carlo = MonteCarloConfig {
        nwarm: Some(2),
        nbin: 4,
        nsweep: 2,
        n_between_bins: 0,
    };
    config
}

#[test]
fn cancelled_token_stops_before_the_first_bin() {
    let token = CancelToken::new();
    token.clone().cancel();
    assert!(token.is_cancelled());

    let outcome = run_with_field(&config(), 5, None, &token).unwrap();
    assert!(outcome.summary.cancelled);
    assert_eq!(outcome.summary.bins_completed, 0);
    assert!(outcome.summary.eqtime.is_none());
    assert!(outcome.summary.dynamic.is_none());
    assert_eq!(outcome.summary.warm_sweeps, 2);
}

#[test]
fn untouched_token_completes_every_bin() {
    let outcome = run_with_field(&config(), 5, None, &CancelToken::new()).unwrap();
    assert!(!outcome.summary.cancelled);
    assert_eq!(outcome.summary.bins_completed, 4);
    let eqtime = outcome.summary.eqtime.unwrap();
    assert_eq!(eqtime.sign.bins, 4);
    assert_eq!(outcome.summary.dynamic.unwrap().matsubara_greens.bins, 4);
}
