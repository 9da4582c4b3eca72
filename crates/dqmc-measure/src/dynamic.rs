use std::f64::consts::PI;

use dqmc_engine::{DisplacedSnapshot, Spin};
use dqmc_lattice::{MomentumProduct, SiteIndexing, SquareLattice};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::observable::Observable;
use crate::stats::Estimate;

/// Analysed time-displaced results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicReport {
    /// Average configuration sign.
    pub sign: Estimate<f64>,
    /// `G(q, tau)` for `tau = l dtau`, `l < lt`.
    pub matsubara_greens: Estimate<DVector<f64>>,
    /// Local `G(tau)` averaged over sites.
    pub density_of_states: Estimate<DVector<f64>>,
    /// Superfluid stiffness `rho_s`.
    pub superfluid_stiffness: Estimate<f64>,
}

/// Accumulates time-displaced observables from the pass following a forward sweep.
#[derive(Debug, Clone)]
pub struct DynamicMeasure {
    q: [f64; 2],
    sign: Observable<f64>,
    matsubara_greens: Observable<DVector<f64>>,
    density_of_states: Observable<DVector<f64>>,
    superfluid_stiffness: Observable<f64>,
}

/// `G(l dtau, 0)` of `spin`. `l = 0` maps to `G(beta, beta) = G(0, 0)`.
fn greens_at(snapshot: &DisplacedSnapshot, l: usize, spin: Spin) -> &DMatrix<f64> {
    if l == 0 {
        snapshot.slice(snapshot.len() - 1).gtt(spin)
    } else {
        snapshot.slice(l - 1).gt0(spin)
    }
}

impl DynamicMeasure {
    /// Measurement engine for `nbin` bins of `lt` times at momentum `q` in radians.
    pub fn new(nbin: usize, lt: usize, q: [f64; 2]) -> Self {
        Self {
            q,
            sign: Observable::new("sign", 0.0, nbin),
            matsubara_greens: Observable::new("matsubara_greens", DVector::zeros(lt), nbin),
            density_of_states: Observable::new("density_of_states", DVector::zeros(lt), nbin),
            superfluid_stiffness: Observable::new("superfluid_stiffness", 0.0, nbin),
        }
    }

    /// Measures one time-displaced snapshot.
    pub fn measure(&mut self, snapshot: &DisplacedSnapshot, lattice: &SquareLattice, t: f64) {
        let sign = snapshot.sign();
        let lt = snapshot.len();
        let ls = lattice.num_sites();
        let inv_ls = 1.0 / ls as f64;

        let mut matsubara = DVector::zeros(lt);
        let mut dos = DVector::zeros(lt);
        for l in 0..lt {
            let g = (greens_at(snapshot, l, Spin::Up) + greens_at(snapshot, l, Spin::Down)) * 0.5;
            let mut sum = 0.0;
            for i in 0..ls {
                for (dx, dy) in lattice.displacements() {
                    let j = lattice.shift(i, dx, dy);
                    sum += lattice.product([dx as f64, dy as f64], self.q).cos() * g[(j, i)];
                }
            }
            matsubara[l] = sign * sum * inv_ls;
            dos[l] = sign * g.trace() * inv_ls;
        }

        self.sign.accumulate(&sign);
        self.matsubara_greens.accumulate(&matsubara);
        self.density_of_states.accumulate(&dos);
        self.superfluid_stiffness
            .accumulate(&(sign * superfluid_stiffness(snapshot, lattice, t)));
        self.sign.increment();
        self.matsubara_greens.increment();
        self.density_of_states.increment();
        self.superfluid_stiffness.increment();
    }

    /// Normalizes the active bin by its sample count and mean sign.
    pub fn normalize(&mut self) {
        self.sign.normalize(1.0);
        let mean_sign = *self.sign.tmp();
        if mean_sign == 0.0 && self.sign.count() > 0 {
            warn!(
                samples = self.sign.count(),
                "time-displaced bin has zero mean sign, its values are not finite"
            );
        }
        self.matsubara_greens.normalize(mean_sign);
        self.density_of_states.normalize(mean_sign);
        self.superfluid_stiffness.normalize(mean_sign);
    }

    /// Stores the active bin and starts a new one.
    pub fn commit(&mut self) {
        self.sign.commit();
        self.matsubara_greens.commit();
        self.density_of_states.commit();
        self.superfluid_stiffness.commit();
    }

    /// Discards the active bin.
    pub fn clear(&mut self) {
        self.sign.clear();
        self.matsubara_greens.clear();
        self.density_of_states.clear();
        self.superfluid_stiffness.clear();
    }

    /// Number of closed bins.
    pub fn committed_bins(&self) -> usize {
        self.sign.bins().len()
    }

    /// Per-bin `G(q, tau)` values.
    pub fn matsubara_bins(&self) -> &[DVector<f64>] {
        self.matsubara_greens.bins()
    }

    /// Per-bin density-of-states values.
    pub fn density_of_states_bins(&self) -> &[DVector<f64>] {
        self.density_of_states.bins()
    }

    /// Per-bin superfluid stiffness values.
    pub fn stiffness_bins(&self) -> &[f64] {
        self.superfluid_stiffness.bins()
    }

    /// Mean and error of every observable, `None` before the first closed bin.
    pub fn analyse(&self) -> Option<DynamicReport> {
        Some(DynamicReport {
            sign: self.sign.analyse()?,
            matsubara_greens: self.matsubara_greens.analyse()?,
            density_of_states: self.density_of_states.analyse()?,
            superfluid_stiffness: self.superfluid_stiffness.analyse()?,
        })
    }
}

/// `rho_s = (Gamma_L - Gamma_T) / 4` from the current-current correlator at the smallest
/// longitudinal and transverse momenta, summed over imaginary time and averaged over
/// base sites.
pub fn superfluid_stiffness(snapshot: &DisplacedSnapshot, lattice: &SquareLattice, t: f64) -> f64 {
    let ll = lattice.side();
    let ls = lattice.num_sites();
    let lt = snapshot.len();
    let qx = [2.0 * PI / ll as f64, 0.0];
    let qy = [0.0, 2.0 * PI / ll as f64];
    let last = snapshot.slice(lt - 1);
    let g00 = [last.gtt(Spin::Up), last.gtt(Spin::Down)];

    let mut total = 0.0;
    for l in 0..lt {
        let slice = snapshot.slice(if l == 0 { lt - 1 } else { l - 1 });
        for i in 0..ls {
            let ipx = lattice.shift(i, 1, 0);
            let current_0: f64 = g00.iter().map(|g| g[(i, ipx)] - g[(ipx, i)]).sum();
            for (dx, dy) in lattice.displacements() {
                let j = lattice.shift(i, dx, dy);
                let jpx = lattice.shift(j, 1, 0);
                let r = [dx as f64, dy as f64];
                let factor = lattice.product(r, qx).cos() - lattice.product(r, qy).cos();

                let mut current_tau = 0.0;
                let mut correlated = 0.0;
                for spin in Spin::ALL {
                    let gtt = slice.gtt(spin);
                    let gt0 = slice.gt0(spin);
                    let g0t = slice.g0t(spin);
                    current_tau += gtt[(j, jpx)] - gtt[(jpx, j)];
                    correlated += -g0t[(ipx, jpx)] * gt0[(j, i)]
                        + g0t[(i, jpx)] * gt0[(j, ipx)]
                        + g0t[(ipx, j)] * gt0[(jpx, i)]
                        - g0t[(i, j)] * gt0[(jpx, ipx)];
                }
                total += t * t * factor * (-current_tau * current_0 + correlated);
            }
        }
    }
    0.25 * total / (ls * ls) as f64
}
