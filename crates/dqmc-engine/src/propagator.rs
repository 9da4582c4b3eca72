use dqmc_core::errors::DqmcError;
use dqmc_lattice::{Bond, SquareLattice};
use nalgebra::{DMatrix, SymmetricEigen};

use crate::field::AuxiliaryField;
use crate::model::{ModelParams, Spin};

/// Representation of `exp(dtau (t A + mu))`.
#[derive(Debug, Clone)]
enum HoppingKernel {
    Dense {
        exp_k: DMatrix<f64>,
        exp_k_inv: DMatrix<f64>,
    },
    /// `exp(dtau mu) E_0 E_1 E_2 E_3`, one factor per disjoint bond group.
    Checkerboard {
        groups: [Vec<Bond>; 4],
        ch: f64,
        sh: f64,
        mu_factor: f64,
    },
}

/// Builds and applies the transfer operators `B_l = diag(exp(alpha eta s_l)) exp(dtau (t A + mu))`.
#[derive(Debug, Clone)]
pub struct Propagator {
    kernel: HoppingKernel,
    alpha: f64,
    eta: [f64; 2],
    ls: usize,
}

impl Propagator {
    /// Prepares the hopping kernel for `params` on `lattice`.
    pub fn new(params: &ModelParams, lattice: &SquareLattice) -> Result<Self, DqmcError> {
        let dtau = params.dtau();
        let kernel = if params.checkerboard {
            HoppingKernel::Checkerboard {
                groups: lattice.checkerboard_groups()?,
                ch: (dtau * params.t).cosh(),
                sh: (dtau * params.t).sinh(),
                mu_factor: (dtau * params.mu).exp(),
            }
        } else {
            let eigen = SymmetricEigen::new(lattice.hopping_matrix());
            let q = &eigen.eigenvectors;
            let spectrum = eigen
                .eigenvalues
                .map(|lambda| dtau * (params.t * lambda + params.mu));
            let exp_k = q * DMatrix::from_diagonal(&spectrum.map(f64::exp)) * q.transpose();
            let exp_k_inv = q * DMatrix::from_diagonal(&spectrum.map(|x| (-x).exp())) * q.transpose();
            HoppingKernel::Dense { exp_k, exp_k_inv }
        };
        Ok(Self {
            kernel,
            alpha: params.alpha(),
            eta: [params.eta(Spin::Up), params.eta(Spin::Down)],
            ls: params.num_sites(),
        })
    }

    /// Coupling constant of the decoupling.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Field sign for `spin`.
    pub fn eta(&self, spin: Spin) -> f64 {
        self.eta[spin.index()]
    }

    fn potential(&self, field: &AuxiliaryField, slice: usize, spin: Spin, sign: f64) -> Vec<f64> {
        let scale = sign * self.alpha * self.eta(spin);
        field.slice(slice).iter().map(|s| (scale * s).exp()).collect()
    }

    /// `m <- B_l m`.
    pub fn mult_left(&self, field: &AuxiliaryField, slice: usize, spin: Spin, m: &mut DMatrix<f64>) {
        self.kernel_left(m, false);
        scale_rows(m, &self.potential(field, slice, spin, 1.0));
    }

    /// `m <- B_l^{-1} m`.
    pub fn mult_left_inv(
        &self,
        field: &AuxiliaryField,
        slice: usize,
        spin: Spin,
        m: &mut DMatrix<f64>,
    ) {
        scale_rows(m, &self.potential(field, slice, spin, -1.0));
        self.kernel_left(m, true);
    }

    /// `m <- m B_l`.
    pub fn mult_right(&self, field: &AuxiliaryField, slice: usize, spin: Spin, m: &mut DMatrix<f64>) {
        scale_columns(m, &self.potential(field, slice, spin, 1.0));
        self.kernel_right(m, false);
    }

    /// `m <- m B_l^{-1}`.
    pub fn mult_right_inv(
        &self,
        field: &AuxiliaryField,
        slice: usize,
        spin: Spin,
        m: &mut DMatrix<f64>,
    ) {
        self.kernel_right(m, true);
        scale_columns(m, &self.potential(field, slice, spin, -1.0));
    }

    /// Dense `B_l` for `spin`.
    pub fn b_matrix(&self, field: &AuxiliaryField, slice: usize, spin: Spin) -> DMatrix<f64> {
        let mut b = DMatrix::identity(self.ls, self.ls);
        self.mult_left(field, slice, spin, &mut b);
        b
    }

    /// Product `B_{end-1} ... B_{start}` over the slices of one chunk.
    pub fn chunk_product(
        &self,
        field: &AuxiliaryField,
        start: usize,
        end: usize,
        spin: Spin,
    ) -> DMatrix<f64> {
        let mut product = DMatrix::identity(self.ls, self.ls);
        for slice in start..end {
            self.mult_left(field, slice, spin, &mut product);
        }
        product
    }

    fn kernel_left(&self, m: &mut DMatrix<f64>, inverse: bool) {
        match &self.kernel {
            HoppingKernel::Dense { exp_k, exp_k_inv } => {
                let factor = if inverse { exp_k_inv } else { exp_k };
                *m = factor * &*m;
            }
            HoppingKernel::Checkerboard {
                groups,
                ch,
                sh,
                mu_factor,
            } => {
                if inverse {
                    for group in groups.iter() {
                        rotate_rows(m, group, *ch, -sh);
                    }
                    *m /= *mu_factor;
                } else {
                    for group in groups.iter().rev() {
                        rotate_rows(m, group, *ch, *sh);
                    }
                    *m *= *mu_factor;
                }
            }
        }
    }

    fn kernel_right(&self, m: &mut DMatrix<f64>, inverse: bool) {
        match &self.kernel {
            HoppingKernel::Dense { exp_k, exp_k_inv } => {
                let factor = if inverse { exp_k_inv } else { exp_k };
                *m = &*m * factor;
            }
            HoppingKernel::Checkerboard {
                groups,
                ch,
                sh,
                mu_factor,
            } => {
                if inverse {
                    for group in groups.iter().rev() {
                        rotate_columns(m, group, *ch, -sh);
                    }
                    *m /= *mu_factor;
                } else {
                    for group in groups.iter() {
                        rotate_columns(m, group, *ch, *sh);
                    }
                    *m *= *mu_factor;
                }
            }
        }
    }
}

/// Scales row `i` of `m` by `d[i]`.
pub(crate) fn scale_rows(m: &mut DMatrix<f64>, d: &[f64]) {
    for (i, &factor) in d.iter().enumerate() {
        m.row_mut(i).scale_mut(factor);
    }
}

/// Scales column `j` of `m` by `d[j]`.
pub(crate) fn scale_columns(m: &mut DMatrix<f64>, d: &[f64]) {
    for (j, &factor) in d.iter().enumerate() {
        m.column_mut(j).scale_mut(factor);
    }
}

// Bonds within a group share no site, so each 2x2 block acts independently.
fn rotate_rows(m: &mut DMatrix<f64>, group: &[Bond], ch: f64, sh: f64) {
    for bond in group {
        let a = m.row(bond.from).clone_owned();
        let b = m.row(bond.to).clone_owned();
        m.set_row(bond.from, &(&a * ch + &b * sh));
        m.set_row(bond.to, &(&a * sh + &b * ch));
    }
}

fn rotate_columns(m: &mut DMatrix<f64>, group: &[Bond], ch: f64, sh: f64) {
    for bond in group {
        let a = m.column(bond.from).clone_owned();
        let b = m.column(bond.to).clone_owned();
        m.set_column(bond.from, &(&a * ch + &b * sh));
        m.set_column(bond.to, &(&a * sh + &b * ch));
    }
}
