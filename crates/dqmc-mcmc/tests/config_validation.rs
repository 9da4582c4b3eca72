use std::fs;

use dqmc_mcmc::RunConfig;
use tempfile::tempdir;

#[test]
fn empty_document_yields_defaults() {
    let config = RunConfig::from_yaml("{}").unwrap();
    assert_eq!(config, RunConfig::default());
    assert_eq!(config.model.ll, 4);
    assert_eq!(config.model.lt, 80);
    assert_eq!(config.monte_carlo.nbin, 20);
    assert_eq!(config.resolved_nwarm(), 4 * 16 * 4);
    assert!(config.controls.warm_up);
    assert_eq!(config.momentum.radians(), [std::f64::consts::PI; 2]);
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let yaml = "model:\n  ll: 6\n  u: 2.0\nmonte_carlo:\n  nwarm: 12\nmomentum:\n  qx: 0.5\n";
    let config = RunConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.model.ll, 6);
    assert_eq!(config.model.u, 2.0);
    assert_eq!(config.model.nwrap, 10);
    assert_eq!(config.resolved_nwarm(), 12);
    assert_eq!(config.momentum.qx, 0.5);
    assert_eq!(config.momentum.qy, 1.0);
}

#[test]
fn inconsistent_values_are_rejected() {
    let cases = [
        ("monte_carlo:\n  nbin: 0\n", "nbin"),
        ("model:\n  nwrap: 0\n", "nwrap"),
        ("model:\n  beta: -1.0\n", "beta"),
        ("model:\n  ll: 5\n  checkerboard: true\n", "ll"),
        ("monte_carlo:\n  nsweep: 1\n", "nsweep"),
        ("stabilization:\n  max_wrap_breaches: 0\n", "max_wrap_breaches"),
    ];
    for (yaml, key) in cases {
        let err = RunConfig::from_yaml(yaml).unwrap_err();
        assert_eq!(err.info().code, "invalid-parameter", "{yaml}");
        assert!(err.info().context.contains_key(key), "{yaml}: {err}");
    }
}

#[test]
fn load_reports_missing_and_malformed_files() {
    let dir = tempdir().unwrap();
    let missing = RunConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(missing.info().code, "config-read");

    let path = dir.path().join("broken.yaml");
    fs::write(&path, "model: [1, 2\n").unwrap();
    let broken = RunConfig::load(&path).unwrap_err();
    assert_eq!(broken.info().code, "config-parse");
    assert!(broken.info().context.contains_key("path"));
}
