//! The left stack factorizes `B(tau, 0) = U_l D_l T_l`, the right stack the transpose
//! `B(beta, tau)^T = U_r D_r T_r`. Splitting every scale vector into its large part
//! `max(d, 1)` and small part `min(d, 1)` gives
//!
//! ```text
//! I + B(tau, 0) B(beta, tau) = U_l Dl_max M Dr_max U_r^T
//! M = Dl_max^-1 U_l^T U_r Dr_max^-1 + Dl_min T_l T_r^T Dr_min
//! ```
//!
//! where `M` has entries of order one, so only `M` is ever inverted.

use dqmc_core::errors::{DqmcError, ErrorInfo};
use nalgebra::{DMatrix, LU};

use crate::propagator::{scale_columns, scale_rows};
use crate::svd::SvdFrame;

/// Green's functions at one imaginary time `tau`.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacedGreens {
    /// `G(tau, tau)`.
    pub gtt: DMatrix<f64>,
    /// `G(tau, 0)`.
    pub gt0: DMatrix<f64>,
    /// `G(0, tau)`.
    pub g0t: DMatrix<f64>,
}

struct Middle {
    lu: LU<f64, nalgebra::Dyn, nalgebra::Dyn>,
    dl_max_inv: Vec<f64>,
    dl_min: Vec<f64>,
    dr_max_inv: Vec<f64>,
    dr_min: Vec<f64>,
}

impl Middle {
    fn assemble(left: &SvdFrame, right: &SvdFrame) -> Result<Self, DqmcError> {
        let dl_max_inv: Vec<f64> = left.d.iter().map(|d| 1.0 / d.max(1.0)).collect();
        let dl_min: Vec<f64> = left.d.iter().map(|d| d.min(1.0)).collect();
        let dr_max_inv: Vec<f64> = right.d.iter().map(|d| 1.0 / d.max(1.0)).collect();
        let dr_min: Vec<f64> = right.d.iter().map(|d| d.min(1.0)).collect();

        let mut large = left.u.transpose() * &right.u;
        scale_rows(&mut large, &dl_max_inv);
        scale_columns(&mut large, &dr_max_inv);
        let mut small = &left.t * right.t.transpose();
        scale_rows(&mut small, &dl_min);
        scale_columns(&mut small, &dr_min);

        let middle = large + small;
        if middle.iter().any(|x| !x.is_finite()) {
            return Err(singular("middle matrix has non-finite entries"));
        }
        Ok(Self {
            lu: middle.lu(),
            dl_max_inv,
            dl_min,
            dr_max_inv,
            dr_min,
        })
    }

    /// `M^-1 rhs`.
    fn solve(&self, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>, DqmcError> {
        let x = self
            .lu
            .solve(rhs)
            .ok_or_else(|| singular("middle matrix is singular"))?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(singular("middle matrix is numerically singular"));
        }
        Ok(x)
    }

    /// `M^-1 Dl_max^-1 U_l^T`.
    fn solve_upper(&self, left: &SvdFrame) -> Result<DMatrix<f64>, DqmcError> {
        let mut rhs = left.u.transpose();
        scale_rows(&mut rhs, &self.dl_max_inv);
        self.solve(&rhs)
    }
}

fn singular(message: &str) -> DqmcError {
    DqmcError::Stabilization(ErrorInfo::new("greens-singular", message))
}

/// `G(tau, tau) = (I + B(tau, 0) B(beta, tau))^-1` from the two stack tops.
pub fn equal_time(left: &SvdFrame, right: &SvdFrame) -> Result<DMatrix<f64>, DqmcError> {
    let middle = Middle::assemble(left, right)?;
    let mut x = middle.solve_upper(left)?;
    scale_rows(&mut x, &middle.dr_max_inv);
    Ok(&right.u * x)
}

/// Sign of `det G(tau, tau)`. The scale factors are positive, so only the orthogonal
/// factors and `M` contribute.
pub fn determinant_sign(left: &SvdFrame, right: &SvdFrame) -> Result<f64, DqmcError> {
    let middle = Middle::assemble(left, right)?;
    let det_m = middle.lu.determinant();
    if det_m == 0.0 || det_m.is_nan() {
        return Err(singular("middle matrix is singular"));
    }
    let det_ul = left.u.determinant();
    let det_ur = right.u.determinant();
    Ok((det_ul * det_ur).signum() * det_m.signum())
}

/// `G(tau, tau)`, `G(tau, 0)` and `G(0, tau)` from the two stack tops.
pub fn displaced(left: &SvdFrame, right: &SvdFrame) -> Result<DisplacedGreens, DqmcError> {
    let middle = Middle::assemble(left, right)?;

    let mut upper = middle.solve_upper(left)?;
    let mut gtt_inner = upper.clone();
    scale_rows(&mut gtt_inner, &middle.dr_max_inv);
    let gtt = &right.u * gtt_inner;

    let mut lower_rhs = left.t.clone();
    scale_rows(&mut lower_rhs, &middle.dl_min);
    let mut lower = middle.solve(&lower_rhs)?;
    scale_rows(&mut lower, &middle.dr_max_inv);
    let gt0 = &right.u * lower;

    scale_rows(&mut upper, &middle.dr_min);
    let g0t = -(right.t.transpose() * upper);

    Ok(DisplacedGreens { gtt, gt0, g0t })
}

/// Largest elementwise deviation between two Green's functions.
pub fn wrap_error(fresh: &DMatrix<f64>, propagated: &DMatrix<f64>) -> f64 {
    fresh
        .iter()
        .zip(propagated.iter())
        .fold(0.0, |acc, (a, b)| acc.max((a - b).abs()))
}
