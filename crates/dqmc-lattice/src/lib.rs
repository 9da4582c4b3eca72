#![deny(missing_docs)]
#![doc = "Two-dimensional periodic square lattice used by the DQMC engine."]

pub mod geometry;
pub mod square;

pub use geometry::{Bond, BondDirection, MomentumProduct, SiteIndexing};
pub use square::SquareLattice;
