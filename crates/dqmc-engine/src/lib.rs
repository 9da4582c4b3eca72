#![deny(missing_docs)]
#![doc = "Numerically stable Green's-function engine and local-update sweeps for the Hubbard model."]

/// Model parameters and Hubbard–Stratonovich coupling.
pub mod model;
/// Auxiliary Ising field over sites and time slices.
pub mod field;
/// Per-slice transfer operators built from the hopping kernel and the field.
pub mod propagator;
/// Stack of scale-resolving `U D T` factorizations of partial B-matrix products.
pub mod svd;
/// Stable reconstruction of equal-time and time-displaced Green's functions.
pub mod greens;
/// Simulation state owned by one Markov chain.
pub mod state;
/// Directional sweeps, local updates and the time-displaced pass.
pub mod sweep;

pub use field::AuxiliaryField;
pub use greens::DisplacedGreens;
pub use model::{Interaction, ModelParams, Spin};
pub use propagator::Propagator;
pub use state::{SimulationState, StabilizationPolicy, SweepDiagnostics};
pub use svd::{SvdFrame, SvdStack};
pub use sweep::{DisplacedSlice, DisplacedSnapshot};
