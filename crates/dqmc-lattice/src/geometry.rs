//! Capability traits describing a periodic lattice.

use serde::{Deserialize, Serialize};

/// Lattice direction of a nearest-neighbour bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondDirection {
    /// Bond along the first lattice vector.
    X,
    /// Bond along the second lattice vector.
    Y,
}

/// Directed nearest-neighbour pair `from -> from + e_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    /// Base site.
    pub from: usize,
    /// Neighbour one step along `direction`.
    pub to: usize,
    /// Direction of the bond.
    pub direction: BondDirection,
}

/// Mapping between linear site indices and periodic coordinates.
pub trait SiteIndexing {
    /// Linear extent along each axis.
    fn side(&self) -> usize;

    /// Total number of sites.
    fn num_sites(&self) -> usize;

    /// Linear index of the site at `coords`, wrapped periodically.
    fn site_index(&self, coords: [usize; 2]) -> usize;

    /// Coordinates of the site with linear index `index`.
    fn site_coords(&self, index: usize) -> [usize; 2];

    /// Site reached from `index` by the displacement `(dx, dy)`, wrapped periodically.
    fn shift(&self, index: usize, dx: usize, dy: usize) -> usize {
        let [x, y] = self.site_coords(index);
        self.site_index([x + dx, y + dy])
    }
}

/// Geometry dependent product of a real-space vector and a momentum.
pub trait MomentumProduct {
    /// Returns `r . p` for displacement `r` and momentum `p` (radians per site).
    fn product(&self, r: [f64; 2], p: [f64; 2]) -> f64;
}
