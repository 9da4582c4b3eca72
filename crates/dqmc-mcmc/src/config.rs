use std::fs;
use std::path::{Path, PathBuf};

use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_engine::{ModelParams, StabilizationPolicy};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing one simulation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunConfig {
    /// Hubbard model and discretization.
    #[serde(default)]
    pub model: ModelParams,
    /// Sweep and bin counts.
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    /// Which phases of the run execute.
    #[serde(default)]
    pub controls: Controls,
    /// Target momentum for Fourier-transformed observables.
    #[serde(default)]
    pub momentum: Momentum,
    /// Wrap-error thresholds and SVD limits.
    #[serde(default)]
    pub stabilization: StabilizationPolicy,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Monte Carlo schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Warm-up sweeps; defaults to `4 ll^2 beta`. Sweeps run in forward/backward pairs.
    #[serde(default)]
    pub nwarm: Option<usize>,
    /// Number of measurement bins.
    #[serde(default = "default_nbin")]
    pub nbin: usize,
    /// Measurement sweeps per bin.
    #[serde(default = "default_nsweep")]
    pub nsweep: usize,
    /// Decorrelation sweep pairs after each bin.
    #[serde(default = "default_n_between_bins")]
    pub n_between_bins: usize,
}

fn default_nbin() -> usize {
    20
}

fn default_nsweep() -> usize {
    100
}

fn default_n_between_bins() -> usize {
    10
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            nwarm: None,
            nbin: default_nbin(),
            nsweep: default_nsweep(),
            n_between_bins: default_n_between_bins(),
        }
    }
}

/// Toggles for the phases of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    /// Thermalize before measuring.
    #[serde(default = "default_true")]
    pub warm_up: bool,
    /// Measure equal-time observables after every sweep.
    #[serde(default = "default_true")]
    pub measure_eqtime: bool,
    /// Measure time-displaced observables after every forward sweep.
    #[serde(default = "default_true")]
    pub measure_dynamic: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            warm_up: true,
            measure_eqtime: true,
            measure_dynamic: true,
        }
    }
}

impl Controls {
    /// Returns `true` when any measurement is enabled.
    pub fn measuring(&self) -> bool {
        self.measure_eqtime || self.measure_dynamic
    }
}

/// Lattice momentum in units of `pi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    /// x component over `pi`.
    #[serde(default = "default_q")]
    pub qx: f64,
    /// y component over `pi`.
    #[serde(default = "default_q")]
    pub qy: f64,
}

fn default_q() -> f64 {
    1.0
}

impl Default for Momentum {
    fn default() -> Self {
        Self {
            qx: default_q(),
            qy: default_q(),
        }
    }
}

impl Momentum {
    /// Momentum in radians per lattice spacing.
    pub fn radians(&self) -> [f64; 2] {
        [std::f64::consts::PI * self.qx, std::f64::consts::PI * self.qy]
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in the manifest.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x0D0C_5EED_2024_0001_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts; nothing is written when unset.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Equal-time results, relative to `run_directory`.
    #[serde(default = "default_eqtime_file")]
    pub eqtime_file: PathBuf,
    /// Time-displaced results.
    #[serde(default = "default_dynamic_file")]
    pub dynamic_file: PathBuf,
    /// Imaginary-time grid.
    #[serde(default = "default_tau_file")]
    pub tau_file: PathBuf,
    /// Per-bin time-displaced values.
    #[serde(default = "default_bins_file")]
    pub bins_file: PathBuf,
    /// Final auxiliary field.
    #[serde(default = "default_field_file")]
    pub field_file: PathBuf,
    /// Run manifest.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: PathBuf,
    /// Run summary.
    #[serde(default = "default_summary_file")]
    pub summary_file: PathBuf,
    /// Append the equal-time row instead of truncating the file.
    #[serde(default)]
    pub append_eqtime: bool,
}

fn default_eqtime_file() -> PathBuf {
    PathBuf::from("meas-eqtime.dat")
}

fn default_dynamic_file() -> PathBuf {
    PathBuf::from("meas-dynamic.dat")
}

fn default_tau_file() -> PathBuf {
    PathBuf::from("tau.dat")
}

fn default_bins_file() -> PathBuf {
    PathBuf::from("bins-dynamic.csv")
}

fn default_field_file() -> PathBuf {
    PathBuf::from("config.dat")
}

fn default_manifest_file() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_summary_file() -> PathBuf {
    PathBuf::from("summary.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            eqtime_file: default_eqtime_file(),
            dynamic_file: default_dynamic_file(),
            tau_file: default_tau_file(),
            bins_file: default_bins_file(),
            field_file: default_field_file(),
            manifest_file: default_manifest_file(),
            summary_file: default_summary_file(),
            append_eqtime: false,
        }
    }
}

impl RunConfig {
    /// Reads and validates a YAML configuration.
    pub fn load(path: &Path) -> Result<Self, DqmcError> {
        let contents =
            fs::read_to_string(path).map_err(|err| DqmcError::io("config-read", &err, path))?;
        let config = Self::from_yaml(&contents).map_err(|err| match err {
            DqmcError::Config(info) => {
                DqmcError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })?;
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, DqmcError> {
        let config: RunConfig = serde_yaml::from_str(contents)
            .map_err(|err| DqmcError::Config(ErrorInfo::new("config-parse", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Warm-up sweeps after applying the `4 ll^2 beta` default.
    pub fn resolved_nwarm(&self) -> usize {
        self.monte_carlo.nwarm.unwrap_or_else(|| {
            4 * self.model.ll * self.model.ll * self.model.beta.max(0.0) as usize
        })
    }

    /// Checks internal consistency before any sweep runs.
    pub fn validate(&self) -> Result<(), DqmcError> {
        self.model.validate()?;
        let invalid = |message: &str, key: &str, value: String| {
            Err(DqmcError::Config(
                ErrorInfo::new("invalid-parameter", message).with_context(key, value),
            ))
        };
        if self.monte_carlo.nbin == 0 {
            return invalid("at least one bin is required", "nbin", "0".into());
        }
        if self.controls.measuring() && self.monte_carlo.nsweep < 2 {
            return invalid(
                "a bin needs at least one forward/backward sweep pair",
                "nsweep",
                self.monte_carlo.nsweep.to_string(),
            );
        }
        for (key, value) in [("qx", self.momentum.qx), ("qy", self.momentum.qy)] {
            if !value.is_finite() {
                return invalid("momentum must be finite", key, value.to_string());
            }
        }
        let policy = &self.stabilization;
        if !(policy.wrap_tolerance >= 0.0 && policy.wrap_tolerance.is_finite()) {
            return invalid(
                "wrap tolerance must be a finite non-negative number",
                "wrap_tolerance",
                policy.wrap_tolerance.to_string(),
            );
        }
        if !(policy.wrap_hard_limit >= policy.wrap_tolerance) {
            return invalid(
                "wrap hard limit must not be below the tolerance",
                "wrap_hard_limit",
                policy.wrap_hard_limit.to_string(),
            );
        }
        if policy.max_wrap_breaches == 0 {
            return invalid(
                "at least one breach must be allowed",
                "max_wrap_breaches",
                "0".into(),
            );
        }
        Ok(())
    }
}
