use dqmc_engine::{SimulationState, Spin};
use dqmc_lattice::{BondDirection, MomentumProduct, SiteIndexing, SquareLattice};
use indexmap::IndexMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::observable::Observable;
use crate::stats::Estimate;

/// Equal-time observables in output order.
pub const EQUAL_TIME_OBSERVABLES: [&str; 5] = [
    "double_occupancy",
    "kinetic_energy",
    "structure_factor",
    "momentum_distribution",
    "local_spin_correlation",
];

/// Analysed equal-time results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualTimeReport {
    /// Average configuration sign.
    pub sign: Estimate<f64>,
    /// Estimates keyed by observable name, in [`EQUAL_TIME_OBSERVABLES`] order.
    pub observables: IndexMap<String, Estimate<f64>>,
}

/// Accumulates equal-time observables of `G = <c c^dagger>` at momentum `q`.
#[derive(Debug, Clone)]
pub struct EqualTimeMeasure {
    q: [f64; 2],
    sign: Observable<f64>,
    observables: Vec<Observable<f64>>,
}

impl EqualTimeMeasure {
    /// Measurement engine for `nbin` bins at momentum `q` given in radians.
    pub fn new(nbin: usize, q: [f64; 2]) -> Self {
        Self {
            q,
            sign: Observable::new("sign", 0.0, nbin),
            observables: EQUAL_TIME_OBSERVABLES
                .iter()
                .map(|name| Observable::new(*name, 0.0, nbin))
                .collect(),
        }
    }

    /// Target momentum in radians.
    pub fn momentum(&self) -> [f64; 2] {
        self.q
    }

    /// Measures the current equal-time Green's functions of `state`.
    pub fn measure(&mut self, state: &SimulationState) {
        let values = equal_time_values(
            state.lattice(),
            state.params().t,
            self.q,
            state.green(Spin::Up),
            state.green(Spin::Down),
        );
        self.record(state.sign(), &values);
    }

    /// Adds one sign-weighted sample of the five observables.
    pub fn record(&mut self, sign: f64, values: &[f64; 5]) {
        self.sign.accumulate(&sign);
        self.sign.increment();
        for (obs, value) in self.observables.iter_mut().zip(values) {
            obs.accumulate(&(sign * value));
            obs.increment();
        }
    }

    /// Normalizes the active bin by its sample count and mean sign.
    pub fn normalize(&mut self) {
        self.sign.normalize(1.0);
        let mean_sign = *self.sign.tmp();
        if mean_sign == 0.0 && self.sign.count() > 0 {
            warn!(
                samples = self.sign.count(),
                "equal-time bin has zero mean sign, its values are not finite"
            );
        }
        for obs in &mut self.observables {
            obs.normalize(mean_sign);
        }
    }

    /// Stores the active bin and starts a new one.
    pub fn commit(&mut self) {
        self.sign.commit();
        for obs in &mut self.observables {
            obs.commit();
        }
    }

    /// Discards the active bin.
    pub fn clear(&mut self) {
        self.sign.clear();
        for obs in &mut self.observables {
            obs.clear();
        }
    }

    /// Number of closed bins.
    pub fn committed_bins(&self) -> usize {
        self.sign.bins().len()
    }

    /// Mean and error of every observable, `None` before the first closed bin.
    pub fn analyse(&self) -> Option<EqualTimeReport> {
        let sign = self.sign.analyse()?;
        let mut observables = IndexMap::new();
        for obs in &self.observables {
            observables.insert(obs.name().to_string(), obs.analyse()?);
        }
        Some(EqualTimeReport { sign, observables })
    }
}

/// Double occupancy, kinetic energy, structure factor, momentum distribution and local
/// spin correlation of a single configuration.
pub fn equal_time_values(
    lattice: &SquareLattice,
    t: f64,
    q: [f64; 2],
    g_up: &DMatrix<f64>,
    g_dn: &DMatrix<f64>,
) -> [f64; 5] {
    let ls = lattice.num_sites();
    let inv_ls = 1.0 / ls as f64;
    let n_up: Vec<f64> = (0..ls).map(|i| 1.0 - g_up[(i, i)]).collect();
    let n_dn: Vec<f64> = (0..ls).map(|i| 1.0 - g_dn[(i, i)]).collect();

    let double_occupancy = inv_ls * (0..ls).map(|i| n_up[i] * n_dn[i]).sum::<f64>();

    let mut kinetic = 0.0;
    for direction in [BondDirection::X, BondDirection::Y] {
        for bond in lattice.bonds(direction) {
            for g in [g_up, g_dn] {
                kinetic += g[(bond.from, bond.to)] + g[(bond.to, bond.from)];
            }
        }
    }
    let kinetic_energy = t * kinetic * inv_ls;

    let local_spin_correlation = inv_ls
        * (0..ls)
            .map(|i| n_up[i] + n_dn[i] - 2.0 * n_up[i] * n_dn[i])
            .sum::<f64>();

    let mut fourier_g = 0.0;
    let mut structure = 0.0;
    for i in 0..ls {
        for (dx, dy) in lattice.displacements() {
            let j = lattice.shift(i, dx, dy);
            let phase = lattice.product([dx as f64, dy as f64], q).cos();
            fourier_g += phase * (g_up[(j, i)] + g_dn[(j, i)]);

            let delta = if i == j { 1.0 } else { 0.0 };
            let same_up = n_up[j] * n_up[i] + (delta - g_up[(i, j)]) * g_up[(j, i)];
            let same_dn = n_dn[j] * n_dn[i] + (delta - g_dn[(i, j)]) * g_dn[(j, i)];
            let cross = n_up[j] * n_dn[i] + n_dn[j] * n_up[i];
            structure += phase * (same_up + same_dn - cross);
        }
    }
    let momentum_distribution = 2.0 - inv_ls * fourier_g;
    let structure_factor = inv_ls * structure;

    [
        double_occupancy,
        kinetic_energy,
        structure_factor,
        momentum_distribution,
        local_spin_correlation,
    ]
}
