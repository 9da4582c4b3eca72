use criterion::{criterion_group, criterion_main, Criterion};
use dqmc_core::rng::RngHandle;
use dqmc_engine::{AuxiliaryField, ModelParams, SimulationState, StabilizationPolicy};

fn sample_state(checkerboard: bool) -> SimulationState {
    let params = ModelParams {
        ll: 4,
        lt: 40,
        beta: 4.0,
        u: -4.0,
        nwrap: 10,
        checkerboard,
        ..ModelParams::default()
    };
    let mut rng = RngHandle::from_seed(7);
    let field = AuxiliaryField::random(params.num_sites(), params.lt, &mut rng);
    SimulationState::new(params, field, StabilizationPolicy::default()).unwrap()
}

fn bench_sweep(c: &mut Criterion) {
    for (name, checkerboard) in [("dense", false), ("checkerboard", true)] {
        let mut state = sample_state(checkerboard);
        let mut rng = RngHandle::from_seed(11);
        c.bench_function(&format!("sweep_pair_{name}"), |b| {
            b.iter(|| {
                state.sweep_forward(&mut rng).unwrap();
                state.sweep_backward(&mut rng).unwrap();
            })
        });
    }
}

fn bench_displaced(c: &mut Criterion) {
    let mut state = sample_state(false);
    let mut rng = RngHandle::from_seed(3);
    state.sweep_forward(&mut rng).unwrap();
    c.bench_function("time_displaced_pass", |b| {
        b.iter(|| state.measure_displaced().unwrap())
    });
}

criterion_group!(benches, bench_sweep, bench_displaced);
criterion_main!(benches);
