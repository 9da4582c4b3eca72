//! Square lattice with periodic boundary conditions.

use dqmc_core::errors::{DqmcError, ErrorInfo};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::geometry::{Bond, BondDirection, MomentumProduct, SiteIndexing};

/// `L x L` square lattice; site `(x, y)` has index `x + L * y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareLattice {
    side: usize,
}

impl SquareLattice {
    /// Creates a lattice of linear size `side`. At least two sites per axis are required.
    pub fn new(side: usize) -> Result<Self, DqmcError> {
        if side < 2 {
            return Err(DqmcError::Config(
                ErrorInfo::new("invalid-parameter", "lattice side must be at least 2")
                    .with_context("ll", side.to_string()),
            ));
        }
        Ok(Self { side })
    }

    /// All bonds along `direction`, one per base site.
    pub fn bonds(&self, direction: BondDirection) -> Vec<Bond> {
        (0..self.num_sites())
            .map(|from| {
                let to = match direction {
                    BondDirection::X => self.shift(from, 1, 0),
                    BondDirection::Y => self.shift(from, 0, 1),
                };
                Bond {
                    from,
                    to,
                    direction,
                }
            })
            .collect()
    }

    /// Nearest-neighbour connectivity `A` with `A_ij` counting the bonds between `i` and `j`.
    ///
    /// For `L = 2` the two bonds joining a pair of sites across the boundary are both
    /// counted.
    pub fn hopping_matrix(&self) -> DMatrix<f64> {
        let n = self.num_sites();
        let mut hopping = DMatrix::<f64>::zeros(n, n);
        for direction in [BondDirection::X, BondDirection::Y] {
            for bond in self.bonds(direction) {
                hopping[(bond.from, bond.to)] += 1.0;
                hopping[(bond.to, bond.from)] += 1.0;
            }
        }
        hopping
    }

    /// Splits all bonds into four groups of mutually disjoint bonds:
    /// x-bonds from even `x`, x-bonds from odd `x`, y-bonds from even `y`, y-bonds
    /// from odd `y`. Requires an even side.
    pub fn checkerboard_groups(&self) -> Result<[Vec<Bond>; 4], DqmcError> {
        if self.side % 2 != 0 {
            return Err(DqmcError::Config(
                ErrorInfo::new(
                    "invalid-parameter",
                    "checkerboard decomposition requires an even lattice side",
                )
                .with_context("ll", self.side.to_string()),
            ));
        }
        let parity = |bond: &Bond, axis: usize, even: bool| {
            (self.site_coords(bond.from)[axis] % 2 == 0) == even
        };
        let x = self.bonds(BondDirection::X);
        let y = self.bonds(BondDirection::Y);
        Ok([
            x.iter().copied().filter(|b| parity(b, 0, true)).collect(),
            x.iter().copied().filter(|b| parity(b, 0, false)).collect(),
            y.iter().copied().filter(|b| parity(b, 1, true)).collect(),
            y.iter().copied().filter(|b| parity(b, 1, false)).collect(),
        ])
    }

    /// Iterates over every displacement `(dx, dy)` with `0 <= dx, dy < L`.
    pub fn displacements(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.side).flat_map(move |dx| (0..self.side).map(move |dy| (dx, dy)))
    }
}

impl SiteIndexing for SquareLattice {
    fn side(&self) -> usize {
        self.side
    }

    fn num_sites(&self) -> usize {
        self.side * self.side
    }

    fn site_index(&self, coords: [usize; 2]) -> usize {
        coords[0] % self.side + self.side * (coords[1] % self.side)
    }

    fn site_coords(&self, index: usize) -> [usize; 2] {
        [index % self.side, (index / self.side) % self.side]
    }
}

impl MomentumProduct for SquareLattice {
    fn product(&self, r: [f64; 2], p: [f64; 2]) -> f64 {
        r[0] * p[0] + r[1] * p[1]
    }
}
