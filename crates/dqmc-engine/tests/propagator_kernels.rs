use dqmc_core::rng::RngHandle;
use dqmc_engine::{AuxiliaryField, ModelParams, Propagator, Spin};
use dqmc_lattice::SquareLattice;
use nalgebra::DMatrix;

fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a - b).amax()
}

fn setup(checkerboard: bool, ll: usize, lt: usize) -> (ModelParams, Propagator, AuxiliaryField) {
    let params = ModelParams {
        ll,
        lt,
        beta: 2.0,
        u: 4.0,
        mu: 0.3,
        nwrap: 5,
        checkerboard,
        ..ModelParams::default()
    };
    let lattice = SquareLattice::new(params.ll).unwrap();
    let propagator = Propagator::new(&params, &lattice).unwrap();
    let mut rng = RngHandle::from_seed(3);
    let field = AuxiliaryField::random(params.num_sites(), params.lt, &mut rng);
    (params, propagator, field)
}

#[test]
fn inverse_multiplication_undoes_forward_multiplication() {
    for checkerboard in [false, true] {
        let (params, propagator, field) = setup(checkerboard, 4, 20);
        let ls = params.num_sites();
        for spin in Spin::ALL {
            let mut m = propagator.b_matrix(&field, 3, spin);
            propagator.mult_left_inv(&field, 3, spin, &mut m);
            assert!(max_abs_diff(&m, &DMatrix::identity(ls, ls)) < 1e-12);

            let mut m = propagator.b_matrix(&field, 7, spin);
            propagator.mult_right_inv(&field, 7, spin, &mut m);
            assert!(max_abs_diff(&m, &DMatrix::identity(ls, ls)) < 1e-12);
        }
    }
}

#[test]
fn right_multiplication_agrees_with_dense_b_matrix() {
    for checkerboard in [false, true] {
        let (params, propagator, field) = setup(checkerboard, 4, 20);
        let ls = params.num_sites();
        let seed = DMatrix::from_fn(ls, ls, |i, j| ((i * 7 + j * 3) % 5) as f64 - 2.0);
        let b = propagator.b_matrix(&field, 4, Spin::Down);
        let mut m = seed.clone();
        propagator.mult_right(&field, 4, Spin::Down, &mut m);
        assert!(max_abs_diff(&m, &(&seed * &b)) < 1e-12);
    }
}

#[test]
fn checkerboard_approximates_dense_kernel() {
    let (_, dense, field) = setup(false, 6, 40);
    let (_, sparse, _) = setup(true, 6, 40);
    let a = dense.b_matrix(&field, 0, Spin::Up);
    let b = sparse.b_matrix(&field, 0, Spin::Up);
    // dtau = 0.05, so the break-up error is of order dtau^2 t^2.
    assert!(max_abs_diff(&a, &b) < 1e-2);
    assert!(max_abs_diff(&a, &b) > 1e-8);
}

#[test]
fn free_propagator_ignores_the_field() {
    let params = ModelParams {
        u: 0.0,
        lt: 10,
        ..ModelParams::default()
    };
    let lattice = SquareLattice::new(params.ll).unwrap();
    let propagator = Propagator::new(&params, &lattice).unwrap();
    let mut rng = RngHandle::from_seed(1);
    let field = AuxiliaryField::random(params.num_sites(), params.lt, &mut rng);
    let a = propagator.b_matrix(&field, 0, Spin::Up);
    let b = propagator.b_matrix(&field, 5, Spin::Down);
    assert!(max_abs_diff(&a, &b) < 1e-14);
}
