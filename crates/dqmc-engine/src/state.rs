use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_lattice::SquareLattice;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::field::AuxiliaryField;
use crate::greens;
use crate::model::{ModelParams, Spin};
use crate::propagator::Propagator;
use crate::svd::SvdStack;

/// Thresholds applied to the wrap error at every stabilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizationPolicy {
    /// Wrap errors above this value are logged.
    #[serde(default = "default_wrap_tolerance")]
    pub wrap_tolerance: f64,
    /// Wrap errors above this value count as a breach.
    #[serde(default = "default_wrap_hard_limit")]
    pub wrap_hard_limit: f64,
    /// Consecutive breaches that abort the run.
    #[serde(default = "default_max_wrap_breaches")]
    pub max_wrap_breaches: usize,
}

fn default_wrap_tolerance() -> f64 {
    1e-6
}

fn default_wrap_hard_limit() -> f64 {
    1e-2
}

fn default_max_wrap_breaches() -> usize {
    3
}

impl Default for StabilizationPolicy {
    fn default() -> Self {
        Self {
            wrap_tolerance: default_wrap_tolerance(),
            wrap_hard_limit: default_wrap_hard_limit(),
            max_wrap_breaches: default_max_wrap_breaches(),
        }
    }
}

/// Counters accumulated over the lifetime of a state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepDiagnostics {
    /// Proposed local flips.
    pub proposed: u64,
    /// Accepted local flips.
    pub accepted: u64,
    /// Largest equal-time wrap error seen.
    pub max_wrap_eqtime: f64,
    /// Largest time-displaced wrap error seen.
    pub max_wrap_dynamic: f64,
}

impl SweepDiagnostics {
    /// Fraction of accepted proposals, zero before the first proposal.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum WrapKind {
    EqualTime,
    Displaced,
}

/// Mutable state of one Markov chain: field, Green's functions, stacks and sign.
///
/// Between sweeps the state sits at one of the two ends of the imaginary-time axis.
/// At the beginning the right stacks hold every chunk; at the end the left stacks do.
/// In both positions the Green's functions equal `G(0) = G(beta)`.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub(crate) params: ModelParams,
    pub(crate) lattice: SquareLattice,
    pub(crate) propagator: Propagator,
    pub(crate) field: AuxiliaryField,
    pub(crate) green: [DMatrix<f64>; 2],
    pub(crate) left: [SvdStack; 2],
    pub(crate) right: [SvdStack; 2],
    pub(crate) sign: f64,
    pub(crate) policy: StabilizationPolicy,
    pub(crate) diagnostics: SweepDiagnostics,
    consecutive_breaches: usize,
}

impl SimulationState {
    /// Builds the state for `params` starting from `field`.
    pub fn new(
        params: ModelParams,
        field: AuxiliaryField,
        policy: StabilizationPolicy,
    ) -> Result<Self, DqmcError> {
        params.validate()?;
        let ls = params.num_sites();
        if field.num_sites() != ls || field.num_slices() != params.lt {
            return Err(DqmcError::Config(
                ErrorInfo::new("field-shape", "auxiliary field does not match the model size")
                    .with_context("expected", format!("{ls}x{}", params.lt))
                    .with_context(
                        "found",
                        format!("{}x{}", field.num_sites(), field.num_slices()),
                    ),
            ));
        }
        let lattice = SquareLattice::new(params.ll)?;
        let propagator = Propagator::new(&params, &lattice)?;
        let stack = SvdStack::new(ls);
        let mut state = Self {
            params,
            lattice,
            propagator,
            field,
            green: [DMatrix::identity(ls, ls), DMatrix::identity(ls, ls)],
            left: [stack.clone(), stack.clone()],
            right: [stack.clone(), stack],
            sign: 1.0,
            policy,
            diagnostics: SweepDiagnostics::default(),
            consecutive_breaches: 0,
        };
        state.rebuild()?;
        Ok(state)
    }

    /// Refactorizes every chunk from the current field and resets the state to the
    /// beginning of the time axis. Recomputes the sign from scratch.
    pub fn rebuild(&mut self) -> Result<(), DqmcError> {
        let mut sign = 1.0;
        for spin in Spin::ALL {
            let s = spin.index();
            self.left[s].clear();
            self.right[s].clear();
            for chunk in (0..self.params.num_chunks()).rev() {
                let (start, end) = self.params.chunk_bounds(chunk);
                let product = self.propagator.chunk_product(&self.field, start, end, spin);
                self.right[s].push(&product.transpose())?;
            }
            self.green[s] = greens::equal_time(self.left[s].get(), self.right[s].get())?;
            sign *= greens::determinant_sign(self.left[s].get(), self.right[s].get())?;
        }
        self.sign = sign;
        Ok(())
    }

    /// Model parameters.
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Lattice geometry.
    pub fn lattice(&self) -> &SquareLattice {
        &self.lattice
    }

    /// Current auxiliary field.
    pub fn field(&self) -> &AuxiliaryField {
        &self.field
    }

    /// Consumes the state, returning the field.
    pub fn into_field(self) -> AuxiliaryField {
        self.field
    }

    /// Transfer-operator builder.
    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Current equal-time Green's function of `spin`.
    pub fn green(&self, spin: Spin) -> &DMatrix<f64> {
        &self.green[spin.index()]
    }

    /// Sign of the current configuration weight.
    pub fn sign(&self) -> f64 {
        self.sign
    }

    /// Acceptance and wrap-error counters.
    pub fn diagnostics(&self) -> &SweepDiagnostics {
        &self.diagnostics
    }

    /// Returns `true` when the state sits at `tau = 0` with full right stacks.
    pub fn at_beginning(&self) -> bool {
        self.left[0].is_empty() && self.right[0].len() == self.params.num_chunks()
    }

    /// Returns `true` when the state sits at `tau = beta` with full left stacks.
    pub fn at_end(&self) -> bool {
        self.right[0].is_empty() && self.left[0].len() == self.params.num_chunks()
    }

    /// Replaces the propagated Green's functions by fresh ones from the stack tops and
    /// returns the wrap error.
    pub(crate) fn restabilize(&mut self) -> Result<f64, DqmcError> {
        let mut fresh = Vec::with_capacity(2);
        for spin in Spin::ALL {
            let s = spin.index();
            fresh.push(greens::equal_time(self.left[s].get(), self.right[s].get())?);
        }
        let mut error: f64 = 0.0;
        for (s, g) in fresh.into_iter().enumerate() {
            error = error.max(greens::wrap_error(&g, &self.green[s]));
            self.green[s] = g;
        }
        Ok(error)
    }

    pub(crate) fn record_wrap(
        &mut self,
        error: f64,
        kind: WrapKind,
        slice: usize,
    ) -> Result<(), DqmcError> {
        let slot = match kind {
            WrapKind::EqualTime => &mut self.diagnostics.max_wrap_eqtime,
            WrapKind::Displaced => &mut self.diagnostics.max_wrap_dynamic,
        };
        *slot = slot.max(error);
        if error > self.policy.wrap_tolerance || error.is_nan() {
            warn!(?kind, slice, error, nwrap = self.params.nwrap, "wrap error above tolerance");
        }
        if error > self.policy.wrap_hard_limit || error.is_nan() {
            self.consecutive_breaches += 1;
            if self.consecutive_breaches >= self.policy.max_wrap_breaches {
                return Err(DqmcError::Stabilization(
                    ErrorInfo::new("wrap-limit", "wrap error exceeded the hard limit repeatedly")
                        .with_context("error", error.to_string())
                        .with_context("slice", slice.to_string())
                        .with_context("breaches", self.consecutive_breaches.to_string())
                        .with_hint("reduce nwrap"),
                ));
            }
        } else {
            self.consecutive_breaches = 0;
        }
        Ok(())
    }

    pub(crate) fn sweep_order_error(&self, expected: &str) -> DqmcError {
        DqmcError::Config(
            ErrorInfo::new("sweep-order", "sweep started from the wrong end of the time axis")
                .with_context("expected", expected),
        )
    }
}
