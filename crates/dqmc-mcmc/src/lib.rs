#![deny(missing_docs)]

//! Orchestration of DQMC runs: configuration, warm-up, binned measurement and output.

/// Auxiliary-field file serialization.
pub mod checkpoint;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation for independent chains.
pub mod determinism;
/// Run kernel and the public `run`/`resume` entry points.
pub mod kernel;
/// Run manifest serialization helpers.
pub mod manifest;
/// Fixed-width and CSV result files.
pub mod output;

pub use config::{Controls, Momentum, MonteCarloConfig, OutputConfig, RunConfig, SeedPolicy};
pub use kernel::{resume, run, run_chains, run_with_field, CancelToken, RunOutcome, RunSummary};
pub use manifest::RunManifest;
