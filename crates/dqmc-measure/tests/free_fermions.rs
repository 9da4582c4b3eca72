use dqmc_core::rng::RngHandle;
use dqmc_engine::{AuxiliaryField, ModelParams, SimulationState, StabilizationPolicy};
use dqmc_lattice::SquareLattice;
use dqmc_measure::eqtime::equal_time_values;
use dqmc_measure::{DynamicMeasure, EqualTimeMeasure, EQUAL_TIME_OBSERVABLES};
use nalgebra::DMatrix;

fn free_state() -> SimulationState {
    let params = ModelParams {
        ll: 4,
        lt: 20,
        beta: 2.0,
        t: 1.0,
        u: 0.0,
        mu: 0.0,
        nwrap: 5,
        ..ModelParams::default()
    };
    let mut rng = RngHandle::from_seed(1);
    let field = AuxiliaryField::random(params.num_sites(), params.lt, &mut rng);
    SimulationState::new(params, field, StabilizationPolicy::default()).unwrap()
}

#[test]
fn infinite_temperature_values() {
    let lattice = SquareLattice::new(4).unwrap();
    let g = DMatrix::<f64>::identity(16, 16) * 0.5;
    let values = equal_time_values(&lattice, 1.0, [std::f64::consts::PI, 0.0], &g, &g);
    let expected = [0.25, 0.0, 0.5, 1.0, 0.5];
    for (value, want) in values.iter().zip(expected) {
        assert!((value - want).abs() < 1e-12, "{value} != {want}");
    }
}

#[test]
fn free_equal_time_observables_match_band_structure() {
    let state = free_state();
    let mut eq = EqualTimeMeasure::new(1, [0.0, 0.0]);
    eq.measure(&state);
    eq.normalize();
    eq.commit();
    let report = eq.analyse().unwrap();
    assert_eq!(
        report.observables.keys().map(String::as_str).collect::<Vec<_>>(),
        EQUAL_TIME_OBSERVABLES.to_vec()
    );
    assert!((report.sign.mean - 1.0).abs() < 1e-12);
    let occupancy = report.observables["double_occupancy"].mean;
    assert!((occupancy - 0.25).abs() < 1e-10);
    let n_k0 = report.observables["momentum_distribution"].mean;
    let expected = 2.0 / (1.0 + (-8.0_f64).exp());
    assert!((n_k0 - expected).abs() < 1e-10);
    assert!(report.observables["kinetic_energy"].mean < 0.0);
}

#[test]
fn free_matsubara_greens_function_decays_exponentially() {
    let mut state = free_state();
    state.wrap_forward().unwrap();
    let snapshot = state.measure_displaced().unwrap();
    let mut dynamic = DynamicMeasure::new(1, 20, [0.0, 0.0]);
    dynamic.measure(&snapshot, state.lattice(), 1.0);
    dynamic.normalize();
    dynamic.commit();
    let report = dynamic.analyse().unwrap();

    let dtau = 0.1;
    for l in [0usize, 1, 7, 19] {
        let tau = l as f64 * dtau;
        // epsilon(k = 0) = -4t
        let expected = (4.0 * tau).exp() / (1.0 + 8.0_f64.exp());
        let got = report.matsubara_greens.mean[l];
        assert!((got - expected).abs() < 1e-10 * expected.max(1.0), "l={l}: {got} vs {expected}");
    }
    assert!((report.density_of_states.mean[0] - 0.5).abs() < 1e-10);
    assert!(report.superfluid_stiffness.mean.is_finite());
    assert_eq!(dynamic.matsubara_bins().len(), 1);
}
