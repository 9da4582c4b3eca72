//! Cumulative B-matrix products kept as `U diag(D) T` frames.
//!
//! `U` is orthogonal, `D` carries the scales of the product and `T` is upper triangular
//! up to a column permutation with entries of order one. Each push refactorizes
//! `(B U) diag(D)` with a column-pivoted QR, which resolves scales down to the smallest
//! one even when they span far more than `1 / f64::EPSILON`.

use dqmc_core::errors::{DqmcError, ErrorInfo};
use nalgebra::{DMatrix, DVector};

use crate::propagator::{scale_columns, scale_rows};

/// Factorization `U diag(D) T` of a partial B-matrix product.
#[derive(Debug, Clone, PartialEq)]
pub struct SvdFrame {
    /// Orthogonal left factor.
    pub u: DMatrix<f64>,
    /// Positive scales of the product.
    pub d: DVector<f64>,
    /// Well-conditioned right factor.
    pub t: DMatrix<f64>,
}

impl SvdFrame {
    /// Factorization of the identity.
    pub fn identity(n: usize) -> Self {
        Self {
            u: DMatrix::identity(n, n),
            d: DVector::from_element(n, 1.0),
            t: DMatrix::identity(n, n),
        }
    }

    /// Multiplies the factors back together. Only meaningful for well-conditioned products.
    pub fn reconstruct(&self) -> DMatrix<f64> {
        let mut ud = self.u.clone();
        scale_columns(&mut ud, self.d.as_slice());
        ud * &self.t
    }
}

/// Stack of cumulative factorizations; frame `k` holds the product of the first `k + 1`
/// pushed matrices, the latest one leftmost.
#[derive(Debug, Clone)]
pub struct SvdStack {
    frames: Vec<SvdFrame>,
    identity: SvdFrame,
}

impl SvdStack {
    /// Empty stack for `n x n` products.
    pub fn new(n: usize) -> Self {
        Self {
            frames: Vec::new(),
            identity: SvdFrame::identity(n),
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` when no frame is stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Left-multiplies the stored product by `b` and refactorizes.
    ///
    /// On failure the stack is left unchanged.
    pub fn push(&mut self, b: &DMatrix<f64>) -> Result<(), DqmcError> {
        let frame = match self.frames.last() {
            None => self.factorize(b.clone())?,
            Some(top) => {
                let mut m = b * &top.u;
                scale_columns(&mut m, top.d.as_slice());
                let fresh = self.factorize(m)?;
                SvdFrame {
                    u: fresh.u,
                    d: fresh.d,
                    t: fresh.t * &top.t,
                }
            }
        };
        self.frames.push(frame);
        Ok(())
    }

    /// Removes the top frame.
    pub fn pop(&mut self) -> Option<SvdFrame> {
        self.frames.pop()
    }

    /// Factorization of the full stored product, the identity when empty.
    pub fn get(&self) -> &SvdFrame {
        self.frames.last().unwrap_or(&self.identity)
    }

    /// Factorization of the product of the first `depth` pushed matrices.
    pub fn frame(&self, depth: usize) -> Option<&SvdFrame> {
        match depth {
            0 => Some(&self.identity),
            _ => self.frames.get(depth - 1),
        }
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// `m P = Q R` becomes `m = Q diag(|R_ii|) (diag(|R_ii|)^-1 R P^T)`.
    fn factorize(&self, m: DMatrix<f64>) -> Result<SvdFrame, DqmcError> {
        let depth = self.frames.len();
        if m.iter().any(|x| !x.is_finite()) {
            return Err(degenerate(depth, "product has non-finite entries"));
        }
        let (u, r, permutation) = m.col_piv_qr().unpack();
        let d = r.diagonal();
        if d.iter().any(|x| !x.is_finite() || *x == 0.0) {
            return Err(degenerate(depth, "product is rank deficient"));
        }
        let inverse: Vec<f64> = d.iter().map(|x| 1.0 / x).collect();
        let mut t = r;
        scale_rows(&mut t, &inverse);
        permutation.inv_permute_columns(&mut t);
        if t.iter().chain(u.iter()).any(|x| !x.is_finite()) {
            return Err(degenerate(depth, "factorization produced non-finite factors"));
        }
        Ok(SvdFrame { u, d, t })
    }
}

fn degenerate(depth: usize, message: &str) -> DqmcError {
    DqmcError::Stabilization(
        ErrorInfo::new("svd-degenerate", message).with_context("depth", depth.to_string()),
    )
}
