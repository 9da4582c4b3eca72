use dqmc_core::rng::RngHandle;
use dqmc_engine::greens::{displaced, equal_time, wrap_error};
use dqmc_engine::{
    AuxiliaryField, ModelParams, Propagator, SimulationState, Spin, StabilizationPolicy, SvdStack,
};
use dqmc_lattice::SquareLattice;
use nalgebra::DMatrix;

fn params(lt: usize, beta: f64, nwrap: usize) -> ModelParams {
    ModelParams {
        ll: 4,
        lt,
        beta,
        u: -4.0,
        nwrap,
        ..ModelParams::default()
    }
}

fn random_field(p: &ModelParams, seed: u64) -> AuxiliaryField {
    let mut rng = RngHandle::from_seed(seed);
    AuxiliaryField::random(p.num_sites(), p.lt, &mut rng)
}

fn dense_product(prop: &Propagator, field: &AuxiliaryField, start: usize, end: usize) -> DMatrix<f64> {
    prop.chunk_product(field, start, end, Spin::Up)
}

#[test]
fn stable_reconstruction_matches_direct_inverse_at_high_temperature() {
    let p = params(12, 1.0, 3);
    let lattice = SquareLattice::new(p.ll).unwrap();
    let prop = Propagator::new(&p, &lattice).unwrap();
    let field = random_field(&p, 21);
    let n = p.num_sites();
    let tau = 6;

    let mut left = SvdStack::new(n);
    for chunk in 0..2 {
        let (a, b) = p.chunk_bounds(chunk);
        left.push(&dense_product(&prop, &field, a, b)).unwrap();
    }
    let mut right = SvdStack::new(n);
    for chunk in (2..4).rev() {
        let (a, b) = p.chunk_bounds(chunk);
        right.push(&dense_product(&prop, &field, a, b).transpose()).unwrap();
    }

    let b_tau0 = dense_product(&prop, &field, 0, tau);
    let b_betatau = dense_product(&prop, &field, tau, p.lt);
    let id = DMatrix::<f64>::identity(n, n);
    let gtt = (&id + &b_tau0 * &b_betatau).try_inverse().unwrap();
    let gt0 = &b_tau0 * (&id + &b_betatau * &b_tau0).try_inverse().unwrap();
    let g0t = -(&b_betatau * &gtt);

    let stable = equal_time(left.get(), right.get()).unwrap();
    assert!(wrap_error(&stable, &gtt) < 1e-10);
    let full = displaced(left.get(), right.get()).unwrap();
    assert!(wrap_error(&full.gtt, &gtt) < 1e-10);
    assert!(wrap_error(&full.gt0, &gt0) < 1e-10);
    assert!(wrap_error(&full.g0t, &g0t) < 1e-10);
}

#[test]
fn low_temperature_reconstruction_is_independent_of_chunking() {
    let p = params(160, 16.0, 4);
    let field = random_field(&p, 4);
    let coarser = ModelParams {
        nwrap: 8,
        ..p.clone()
    };
    let a = SimulationState::new(p, field.clone(), StabilizationPolicy::default()).unwrap();
    let b = SimulationState::new(coarser, field, StabilizationPolicy::default()).unwrap();
    for spin in Spin::ALL {
        assert!(a.green(spin).iter().all(|x| x.is_finite()));
        assert!(wrap_error(a.green(spin), b.green(spin)) < 1e-6);
    }
    assert_eq!(a.sign(), 1.0);
}

#[test]
fn smaller_nwrap_gives_smaller_wrap_error() {
    let coarse = params(60, 6.0, 30);
    let field = random_field(&coarse, 99);
    let fine = ModelParams {
        nwrap: 2,
        ..coarse.clone()
    };

    let mut coarse_state =
        SimulationState::new(coarse, field.clone(), StabilizationPolicy::default()).unwrap();
    let mut fine_state = SimulationState::new(fine, field, StabilizationPolicy::default()).unwrap();
    let coarse_error = coarse_state.wrap_forward().unwrap();
    let fine_error = fine_state.wrap_forward().unwrap();

    assert!(fine_error < coarse_error, "{fine_error} >= {coarse_error}");
    assert_eq!(coarse_state.diagnostics().max_wrap_eqtime, coarse_error);
}

#[test]
fn repeated_hard_limit_breaches_abort_the_run() {
    let p = params(60, 6.0, 30);
    let field = random_field(&p, 99);
    let policy = StabilizationPolicy {
        wrap_tolerance: 0.0,
        wrap_hard_limit: 0.0,
        max_wrap_breaches: 2,
    };
    let mut state = SimulationState::new(p, field, policy).unwrap();
    let err = state.wrap_forward().unwrap_err();
    assert_eq!(err.info().code, "wrap-limit");
    assert!(err.is_fatal_to_run());
}

#[test]
fn displaced_greens_at_beta_closes_the_time_loop() {
    let p = params(40, 4.0, 10);
    let field = random_field(&p, 8);
    let mut state = SimulationState::new(p.clone(), field, StabilizationPolicy::default()).unwrap();
    let g00 = state.green(Spin::Up).clone();
    state.wrap_forward().unwrap();
    let snapshot = state.measure_displaced().unwrap();
    assert_eq!(snapshot.len(), p.lt);

    let last = snapshot.slice(p.lt - 1);
    assert!(wrap_error(last.gtt(Spin::Up), &g00) < 1e-8);
    let id = DMatrix::<f64>::identity(p.num_sites(), p.num_sites());
    assert!(wrap_error(last.gt0(Spin::Up), &(&id - &g00)) < 1e-8);
    assert!(state.diagnostics().max_wrap_dynamic < 1e-6);
    assert!(state.at_end());
}

#[test]
fn displaced_pass_requires_a_completed_forward_sweep() {
    let p = params(8, 1.0, 4);
    let field = random_field(&p, 1);
    let mut state = SimulationState::new(p, field, StabilizationPolicy::default()).unwrap();
    let err = state.measure_displaced().unwrap_err();
    assert_eq!(err.info().code, "sweep-order");
}
