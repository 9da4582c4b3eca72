use dqmc_core::errors::{DqmcError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Fermion spin species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spin {
    /// Spin up.
    Up,
    /// Spin down.
    Down,
}

impl Spin {
    /// Both species in storage order.
    pub const ALL: [Spin; 2] = [Spin::Up, Spin::Down];

    /// Storage index of the species.
    pub fn index(self) -> usize {
        match self {
            Spin::Up => 0,
            Spin::Down => 1,
        }
    }
}

/// Channel used by the discrete Hubbard–Stratonovich decoupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interaction {
    /// `U < 0`: the field couples to the charge, both spins with the same sign.
    Attractive,
    /// `U > 0`: the field couples to the magnetization, spins with opposite signs.
    Repulsive,
    /// `U = 0`: the field decouples entirely.
    Free,
}

/// Hubbard model on an `ll x ll` periodic square lattice discretized into `lt` slices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Linear lattice size.
    #[serde(default = "default_ll")]
    pub ll: usize,
    /// Number of imaginary-time slices.
    #[serde(default = "default_lt")]
    pub lt: usize,
    /// Inverse temperature.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Nearest-neighbour hopping amplitude.
    #[serde(default = "default_t")]
    pub t: f64,
    /// On-site interaction strength.
    #[serde(default = "default_u")]
    pub u: f64,
    /// Chemical potential measured from half filling.
    #[serde(default)]
    pub mu: f64,
    /// Number of slices between stabilizations.
    #[serde(default = "default_nwrap")]
    pub nwrap: usize,
    /// Use the checkerboard break-up of the hopping exponential.
    #[serde(default)]
    pub checkerboard: bool,
}

fn default_ll() -> usize {
    4
}

fn default_lt() -> usize {
    80
}

fn default_beta() -> f64 {
    4.0
}

fn default_t() -> f64 {
    1.0
}

fn default_u() -> f64 {
    -4.0
}

fn default_nwrap() -> usize {
    10
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            ll: default_ll(),
            lt: default_lt(),
            beta: default_beta(),
            t: default_t(),
            u: default_u(),
            mu: 0.0,
            nwrap: default_nwrap(),
            checkerboard: false,
        }
    }
}

impl ModelParams {
    /// Checks that the parameters describe a runnable model.
    pub fn validate(&self) -> Result<(), DqmcError> {
        let invalid = |message: &str, key: &str, value: String| {
            Err(DqmcError::Config(
                ErrorInfo::new("invalid-parameter", message).with_context(key, value),
            ))
        };
        if self.ll < 2 {
            return invalid("lattice side must be at least 2", "ll", self.ll.to_string());
        }
        if self.lt < 1 {
            return invalid("at least one time slice is required", "lt", self.lt.to_string());
        }
        for (key, value) in [("beta", self.beta), ("t", self.t), ("u", self.u), ("mu", self.mu)] {
            if !value.is_finite() {
                return invalid("parameter must be finite", key, value.to_string());
            }
        }
        if self.beta <= 0.0 {
            return invalid("beta must be positive", "beta", self.beta.to_string());
        }
        if self.nwrap == 0 || self.nwrap > self.lt {
            return Err(DqmcError::Config(
                ErrorInfo::new("invalid-parameter", "nwrap must lie in 1..=lt")
                    .with_context("nwrap", self.nwrap.to_string())
                    .with_context("lt", self.lt.to_string()),
            ));
        }
        if self.checkerboard && self.ll % 2 != 0 {
            return Err(DqmcError::Config(
                ErrorInfo::new(
                    "invalid-parameter",
                    "checkerboard break-up requires an even lattice side",
                )
                .with_context("ll", self.ll.to_string())
                .with_hint("disable checkerboard or use an even ll"),
            ));
        }
        Ok(())
    }

    /// Number of lattice sites.
    pub fn num_sites(&self) -> usize {
        self.ll * self.ll
    }

    /// Imaginary-time step.
    pub fn dtau(&self) -> f64 {
        self.beta / self.lt as f64
    }

    /// Number of stabilization chunks, `ceil(lt / nwrap)`.
    pub fn num_chunks(&self) -> usize {
        self.lt.div_ceil(self.nwrap)
    }

    /// Slices `[start, end)` covered by chunk `k`.
    pub fn chunk_bounds(&self, k: usize) -> (usize, usize) {
        let start = k * self.nwrap;
        (start, (start + self.nwrap).min(self.lt))
    }

    /// Decoupling channel selected by the sign of `u`.
    pub fn interaction(&self) -> Interaction {
        if self.u < 0.0 {
            Interaction::Attractive
        } else if self.u > 0.0 {
            Interaction::Repulsive
        } else {
            Interaction::Free
        }
    }

    /// Coupling `alpha` with `cosh(alpha) = exp(dtau |U| / 2)`.
    pub fn alpha(&self) -> f64 {
        (0.5 * self.dtau() * self.u.abs()).exp().acosh()
    }

    /// Sign `eta` with which the field enters the potential of `spin`.
    pub fn eta(&self, spin: Spin) -> f64 {
        match (self.interaction(), spin) {
            (Interaction::Repulsive, Spin::Down) => -1.0,
            _ => 1.0,
        }
    }
}
