use dqmc_core::errors::DqmcError;
use dqmc_core::rng::RngHandle;
use nalgebra::DMatrix;
use tracing::debug;

use crate::greens::{self, DisplacedGreens};
use crate::model::{Interaction, Spin};
use crate::state::{SimulationState, WrapKind};
use crate::svd::SvdStack;

/// Green's functions of both spins at one imaginary time.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacedSlice {
    gtt: [DMatrix<f64>; 2],
    gt0: [DMatrix<f64>; 2],
    g0t: [DMatrix<f64>; 2],
}

impl DisplacedSlice {
    /// Slice from `[up, down]` pairs of `G(tau, tau)`, `G(tau, 0)` and `G(0, tau)`.
    pub fn new(
        gtt: [DMatrix<f64>; 2],
        gt0: [DMatrix<f64>; 2],
        g0t: [DMatrix<f64>; 2],
    ) -> Self {
        Self { gtt, gt0, g0t }
    }

    fn from_pair(pair: &[DisplacedGreens; 2]) -> Self {
        Self::new(
            [pair[0].gtt.clone(), pair[1].gtt.clone()],
            [pair[0].gt0.clone(), pair[1].gt0.clone()],
            [pair[0].g0t.clone(), pair[1].g0t.clone()],
        )
    }

    /// `G(tau, tau)`.
    pub fn gtt(&self, spin: Spin) -> &DMatrix<f64> {
        &self.gtt[spin.index()]
    }

    /// `G(tau, 0)`.
    pub fn gt0(&self, spin: Spin) -> &DMatrix<f64> {
        &self.gt0[spin.index()]
    }

    /// `G(0, tau)`.
    pub fn g0t(&self, spin: Spin) -> &DMatrix<f64> {
        &self.g0t[spin.index()]
    }
}

/// Time-displaced Green's functions of one configuration; entry `l` holds
/// `tau = (l + 1) dtau`, so the last entry is `tau = beta`.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacedSnapshot {
    slices: Vec<DisplacedSlice>,
    sign: f64,
}

impl DisplacedSnapshot {
    /// Snapshot whose entry `l` holds `tau = (l + 1) dtau`, taken on a configuration of
    /// sign `sign`.
    pub fn new(slices: Vec<DisplacedSlice>, sign: f64) -> Self {
        Self { slices, sign }
    }

    /// Number of stored times, equal to `lt`.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Green's functions at `tau = (index + 1) dtau`.
    pub fn slice(&self, index: usize) -> &DisplacedSlice {
        &self.slices[index]
    }

    /// Configuration sign at the time of the pass.
    pub fn sign(&self) -> f64 {
        self.sign
    }
}

impl SimulationState {
    /// Sweeps from `tau = 0` to `tau = beta`, proposing a flip on every site of every slice.
    pub fn sweep_forward(&mut self, rng: &mut RngHandle) -> Result<(), DqmcError> {
        self.forward(Some(rng)).map(|_| ())
    }

    /// Sweeps from `tau = beta` back to `tau = 0`, proposing a flip on every site of every
    /// slice.
    pub fn sweep_backward(&mut self, rng: &mut RngHandle) -> Result<(), DqmcError> {
        if !self.at_end() {
            return Err(self.sweep_order_error("end"));
        }
        let lt = self.params.lt;
        let mut max_error: f64 = 0.0;
        for slice in (0..lt).rev() {
            self.update_slice(slice, rng);
            for spin in Spin::ALL {
                let g = &mut self.green[spin.index()];
                self.propagator.mult_left_inv(&self.field, slice, spin, g);
                self.propagator.mult_right(&self.field, slice, spin, g);
            }
            let (start, end) = self.params.chunk_bounds(slice / self.params.nwrap);
            if slice == start {
                for spin in Spin::ALL {
                    let s = spin.index();
                    self.left[s].pop();
                    let product = self.propagator.chunk_product(&self.field, start, end, spin);
                    self.right[s].push(&product.transpose())?;
                }
                let error = self.restabilize()?;
                self.record_wrap(error, WrapKind::EqualTime, slice)?;
                max_error = max_error.max(error);
            }
        }
        debug!(direction = "backward", max_error, sign = self.sign, "sweep finished");
        Ok(())
    }

    /// Propagates `G` from `tau = 0` to `tau = beta` without proposing flips and returns
    /// the largest wrap error of the pass.
    pub fn wrap_forward(&mut self) -> Result<f64, DqmcError> {
        self.forward(None)
    }

    fn forward(&mut self, mut rng: Option<&mut RngHandle>) -> Result<f64, DqmcError> {
        if !self.at_beginning() {
            return Err(self.sweep_order_error("beginning"));
        }
        let lt = self.params.lt;
        let mut max_error: f64 = 0.0;
        for slice in 0..lt {
            for spin in Spin::ALL {
                let g = &mut self.green[spin.index()];
                self.propagator.mult_left(&self.field, slice, spin, g);
                self.propagator.mult_right_inv(&self.field, slice, spin, g);
            }
            if let Some(rng) = rng.as_deref_mut() {
                self.update_slice(slice, rng);
            }
            let (start, end) = self.params.chunk_bounds(slice / self.params.nwrap);
            if slice + 1 == end {
                for spin in Spin::ALL {
                    let s = spin.index();
                    self.right[s].pop();
                    let product = self.propagator.chunk_product(&self.field, start, end, spin);
                    self.left[s].push(&product)?;
                }
                let error = self.restabilize()?;
                self.record_wrap(error, WrapKind::EqualTime, slice)?;
                max_error = max_error.max(error);
            }
        }
        debug!(direction = "forward", max_error, sign = self.sign, "sweep finished");
        Ok(max_error)
    }

    /// Proposes a flip of every field component on `slice`. `G` must have `B_slice` as
    /// its leftmost factor.
    fn update_slice(&mut self, slice: usize, rng: &mut RngHandle) {
        let alpha = self.propagator.alpha();
        if self.params.interaction() == Interaction::Free {
            return;
        }
        for site in 0..self.params.num_sites() {
            let s = self.field.get(site, slice);
            let mut deltas = [0.0; 2];
            let mut ratios = [0.0; 2];
            for spin in Spin::ALL {
                let idx = spin.index();
                deltas[idx] = (-2.0 * alpha * self.propagator.eta(spin) * s).exp() - 1.0;
                ratios[idx] = 1.0 + deltas[idx] * (1.0 - self.green[idx][(site, site)]);
            }
            let mut ratio = ratios[0] * ratios[1];
            if self.params.interaction() == Interaction::Attractive {
                ratio *= (2.0 * alpha * s).exp();
            }
            self.diagnostics.proposed += 1;
            if rng.metropolis(ratio) {
                self.diagnostics.accepted += 1;
                self.sign *= ratio.signum();
                self.field.flip(site, slice);
                for idx in 0..2 {
                    rank_one_update(&mut self.green[idx], site, deltas[idx], ratios[idx]);
                }
            }
        }
    }

    /// Runs the time-displaced pass on the current configuration. The state must sit at
    /// the end of a forward sweep and is left unchanged apart from the wrap diagnostics.
    pub fn measure_displaced(&mut self) -> Result<DisplacedSnapshot, DqmcError> {
        if !self.at_end() {
            return Err(self.sweep_order_error("end"));
        }
        let lt = self.params.lt;
        let ls = self.params.num_sites();
        let chunks = self.params.num_chunks();

        let mut pending: [SvdStack; 2] = [SvdStack::new(ls), SvdStack::new(ls)];
        let mut current = Vec::with_capacity(2);
        for spin in Spin::ALL {
            let s = spin.index();
            for chunk in (0..chunks).rev() {
                let (start, end) = self.params.chunk_bounds(chunk);
                let product = self.propagator.chunk_product(&self.field, start, end, spin);
                pending[s].push(&product.transpose())?;
            }
            let start_frame = self.left[s]
                .frame(0)
                .ok_or_else(|| self.sweep_order_error("end"))?;
            current.push(greens::displaced(start_frame, pending[s].get())?);
        }
        let mut current: [DisplacedGreens; 2] = match current.try_into() {
            Ok(pair) => pair,
            Err(_) => return Err(self.sweep_order_error("end")),
        };

        let mut slices = Vec::with_capacity(lt);
        for slice in 0..lt {
            for spin in Spin::ALL {
                let g = &mut current[spin.index()];
                self.propagator.mult_left(&self.field, slice, spin, &mut g.gt0);
                self.propagator.mult_right_inv(&self.field, slice, spin, &mut g.g0t);
                self.propagator.mult_left(&self.field, slice, spin, &mut g.gtt);
                self.propagator.mult_right_inv(&self.field, slice, spin, &mut g.gtt);
            }
            let chunk = slice / self.params.nwrap;
            let (_, end) = self.params.chunk_bounds(chunk);
            if slice + 1 == end {
                let mut error: f64 = 0.0;
                for spin in Spin::ALL {
                    let s = spin.index();
                    pending[s].pop();
                    let left = self.left[s]
                        .frame(chunk + 1)
                        .ok_or_else(|| self.sweep_order_error("end"))?;
                    let fresh = greens::displaced(left, pending[s].get())?;
                    error = error
                        .max(greens::wrap_error(&fresh.gtt, &current[s].gtt))
                        .max(greens::wrap_error(&fresh.gt0, &current[s].gt0))
                        .max(greens::wrap_error(&fresh.g0t, &current[s].g0t));
                    current[s] = fresh;
                }
                self.record_wrap(error, WrapKind::Displaced, slice)?;
            }
            slices.push(DisplacedSlice::from_pair(&current));
        }
        debug!(slices = lt, "time-displaced pass finished");
        Ok(DisplacedSnapshot::new(slices, self.sign))
    }
}

/// `G <- G - (delta / ratio) G[:, site] (e_site - G[site, :])`.
pub(crate) fn rank_one_update(g: &mut DMatrix<f64>, site: usize, delta: f64, ratio: f64) {
    let column = g.column(site).clone_owned();
    let mut row = -g.row(site).transpose();
    row[site] += 1.0;
    g.ger(-delta / ratio, &column, &row, 1.0);
}
