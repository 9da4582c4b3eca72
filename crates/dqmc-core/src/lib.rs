#![deny(missing_docs)]
#![doc = "Core error, seeding and provenance types shared by the DQMC crates."]

pub mod errors;
pub mod provenance;
pub mod rng;

pub use errors::{DqmcError, ErrorInfo};
pub use provenance::{stable_hash, RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
