use dqmc_engine::SvdStack;
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;

fn relative_error(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a - b).amax() / b.amax()
}

#[test]
fn empty_stack_is_identity() {
    let stack = SvdStack::new(3);
    assert!(stack.is_empty());
    assert_eq!(stack.get().reconstruct(), DMatrix::identity(3, 3));
    assert!(stack.frame(1).is_none());
}

#[test]
fn pop_restores_previous_product() {
    let mut stack = SvdStack::new(2);
    let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.5, 3.0]);
    let b = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 0.25, 1.0]);
    stack.push(&a).unwrap();
    stack.push(&b).unwrap();
    assert_eq!(stack.len(), 2);
    assert!(relative_error(&stack.get().reconstruct(), &(&b * &a)) < 1e-12);
    stack.pop();
    assert!(relative_error(&stack.get().reconstruct(), &a) < 1e-12);
    assert_eq!(stack.frame(1), Some(stack.get()));
}

#[test]
fn scales_spanning_many_decades_stay_accurate() {
    let n = 4;
    let mut stack = SvdStack::new(n);
    let step = DMatrix::from_fn(n, n, |i, j| if i == j { 10.0_f64.powi(i as i32) } else { 0.0 });
    for _ in 0..20 {
        stack.push(&step).unwrap();
    }
    let d = &stack.get().d;
    let largest = d.max();
    let smallest = d.min();
    assert!((largest.log10() - 60.0).abs() < 1e-9);
    assert!(smallest > 0.5 && smallest < 2.0);
}

#[test]
fn graded_products_beyond_machine_precision_keep_every_scale() {
    // Q diag(e^a) Q^T with a fixed rotation Q; 20 pushes spread the scales over 1e52.
    let n = 4;
    let (c, s) = (0.6_f64, 0.8_f64);
    let givens = |i: usize, j: usize| {
        let mut g = DMatrix::<f64>::identity(n, n);
        g[(i, i)] = c;
        g[(j, j)] = c;
        g[(i, j)] = -s;
        g[(j, i)] = s;
        g
    };
    let q = givens(0, 1) * givens(1, 2) * givens(2, 3) * givens(0, 3);
    let exponents = [3.0, 1.0, -1.0, -3.0];
    let diag = DMatrix::from_diagonal(&DVector::from_iterator(n, exponents.map(f64::exp)));
    let step = &q * diag * q.transpose();

    let pushes = 20;
    let mut stack = SvdStack::new(n);
    for _ in 0..pushes {
        stack.push(&step).unwrap();
    }
    let frame = stack.get();
    let mut logs: Vec<f64> = frame.d.iter().map(|d| d.ln()).collect();
    logs.sort_by(|a, b| b.total_cmp(a));
    for (log, a) in logs.iter().zip(exponents) {
        assert!((log - pushes as f64 * a).abs() < 2.0, "{logs:?}");
    }
    assert!(frame.t.iter().all(|x| x.is_finite()));
}

#[test]
fn rank_deficient_product_is_rejected_and_stack_kept() {
    let mut stack = SvdStack::new(2);
    let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 1.0]);
    stack.push(&a).unwrap();
    let singular = DMatrix::<f64>::zeros(2, 2);
    let err = stack.push(&singular).unwrap_err();
    assert_eq!(err.info().code, "svd-degenerate");
    assert!(err.is_fatal_to_run());
    assert_eq!(stack.len(), 1);
    assert!(relative_error(&stack.get().reconstruct(), &a) < 1e-12);
}

proptest! {
    #[test]
    fn cumulative_frames_reconstruct_products(
        entries in proptest::collection::vec(-0.5f64..0.5, 3 * 9),
    ) {
        let n = 3;
        let mut stack = SvdStack::new(n);
        let mut product = DMatrix::<f64>::identity(n, n);
        for chunk in entries.chunks(9) {
            let b = DMatrix::from_row_slice(n, n, chunk) + DMatrix::<f64>::identity(n, n) * 2.0;
            stack.push(&b).unwrap();
            product = &b * product;
            let frame = stack.get();
            prop_assert!(relative_error(&frame.reconstruct(), &product) < 1e-10);
            let uu = frame.u.transpose() * &frame.u;
            prop_assert!((uu - DMatrix::<f64>::identity(n, n)).amax() < 1e-10);
        }
    }
}
