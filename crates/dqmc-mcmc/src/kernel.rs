use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_core::{RngHandle, RunProvenance, SchemaVersion};
use dqmc_engine::{AuxiliaryField, SimulationState};
use dqmc_measure::{DynamicMeasure, DynamicReport, EqualTimeMeasure, EqualTimeReport};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkpoint;
use crate::config::{OutputConfig, RunConfig};
use crate::determinism;
use crate::manifest::RunManifest;
use crate::output;

/// Cooperative cancellation flag, honoured only between bins.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to stop at the next bin boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Seed of the sweep stream.
    pub seed: u64,
    /// Bins committed to the accumulators.
    pub bins_completed: usize,
    /// Whether the run stopped early on request.
    pub cancelled: bool,
    /// Warm-up sweeps performed.
    pub warm_sweeps: usize,
    /// Accepted over proposed local flips, warm-up included.
    pub acceptance_rate: f64,
    /// Largest equal-time wrap error of the run.
    pub max_wrap_eqtime: f64,
    /// Largest time-displaced wrap error of the run.
    pub max_wrap_dynamic: f64,
    /// Equal-time estimates, when measured.
    pub eqtime: Option<EqualTimeReport>,
    /// Time-displaced estimates, when measured.
    pub dynamic: Option<DynamicReport>,
    /// Files written during the run.
    pub outputs: Vec<PathBuf>,
    /// Manifest path, if emitted.
    pub manifest_path: Option<PathBuf>,
}

/// Summary plus the final auxiliary field, for chaining runs.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Run results.
    pub summary: RunSummary,
    /// Field at the end of the last sweep.
    pub field: AuxiliaryField,
}

/// Runs a chain from a random field.
pub fn run(config: &RunConfig, seed: u64) -> Result<RunOutcome, DqmcError> {
    run_with_field(config, seed, None, &CancelToken::new())
}

/// Resumes a chain from the field stored at `field_path`.
pub fn resume(config: &RunConfig, seed: u64, field_path: &Path) -> Result<RunOutcome, DqmcError> {
    config.validate()?;
    let field = checkpoint::read_field(field_path, config.model.num_sites(), config.model.lt)?;
    info!(path = %field_path.display(), "resuming from stored field");
    run_with_field(config, seed, Some(field), &CancelToken::new())
}

/// Runs independent chains in parallel, seeding chain `k` with
/// `chain_seed(master_seed, k)`. Results keep the order of `configs`.
pub fn run_chains(configs: &[RunConfig], master_seed: u64) -> Vec<Result<RunOutcome, DqmcError>> {
    configs
        .par_iter()
        .enumerate()
        .map(|(index, config)| run(config, determinism::chain_seed(master_seed, index)))
        .collect()
}

struct Measurements {
    eqtime: Option<EqualTimeMeasure>,
    dynamic: Option<DynamicMeasure>,
}

impl Measurements {
    fn new(config: &RunConfig) -> Self {
        let nbin = config.monte_carlo.nbin;
        let q = config.momentum.radians();
        Self {
            eqtime: config
                .controls
                .measure_eqtime
                .then(|| EqualTimeMeasure::new(nbin, q)),
            dynamic: config
                .controls
                .measure_dynamic
                .then(|| DynamicMeasure::new(nbin, config.model.lt, q)),
        }
    }

    fn close_bin(&mut self) {
        if let Some(eqtime) = &mut self.eqtime {
            eqtime.normalize();
            eqtime.commit();
        }
        if let Some(dynamic) = &mut self.dynamic {
            dynamic.normalize();
            dynamic.commit();
        }
    }
}

/// Runs a chain from `initial`, or from a random field when `None`.
///
/// Each bin is accumulated in full before it is committed; a sweep error aborts the run
/// and the open bin is dropped with it. `cancel` is polled before each bin.
pub fn run_with_field(
    config: &RunConfig,
    seed: u64,
    initial: Option<AuxiliaryField>,
    cancel: &CancelToken,
) -> Result<RunOutcome, DqmcError> {
    config.validate()?;
    let model = &config.model;
    let field = match initial {
        Some(field) => field,
        None => {
            let mut field_rng = RngHandle::from_seed(determinism::field_seed(seed));
            AuxiliaryField::random(model.num_sites(), model.lt, &mut field_rng)
        }
    };
    let mut state = SimulationState::new(model.clone(), field, config.stabilization.clone())?;
    let mut rng = RngHandle::from_seed(seed);
    info!(
        ll = model.ll,
        lt = model.lt,
        beta = model.beta,
        u = model.u,
        mu = model.mu,
        seed,
        "starting chain"
    );

    let mut warm_sweeps = 0;
    if config.controls.warm_up {
        for _ in 0..config.resolved_nwarm() / 2 {
            state.sweep_forward(&mut rng)?;
            state.sweep_backward(&mut rng)?;
            warm_sweeps += 2;
        }
        info!(
            warm_sweeps,
            acceptance = state.diagnostics().acceptance_rate(),
            "warm-up finished"
        );
    }

    let mut measurements = Measurements::new(config);
    let mut bins_completed = 0;
    let mut cancelled = false;
    if config.controls.measuring() {
        let mc = &config.monte_carlo;
        for bin in 0..mc.nbin {
            if cancel.is_cancelled() {
                cancelled = true;
                info!(bins_completed, "cancellation requested, stopping");
                break;
            }
            for _ in 0..mc.nsweep / 2 {
                measure_sweep_pair(&mut state, &mut rng, &mut measurements)?;
            }
            measurements.close_bin();
            bins_completed += 1;
            info!(
                bin = bin + 1,
                of = mc.nbin,
                sign = state.sign(),
                acceptance = state.diagnostics().acceptance_rate(),
                "bin committed"
            );
            for _ in 0..mc.n_between_bins {
                state.sweep_forward(&mut rng)?;
                state.sweep_backward(&mut rng)?;
            }
            state.rebuild()?;
            debug!(bin = bin + 1, "stacks rebuilt");
        }
    }

    let diagnostics = state.diagnostics().clone();
    let mut summary = RunSummary {
        seed,
        bins_completed,
        cancelled,
        warm_sweeps,
        acceptance_rate: diagnostics.acceptance_rate(),
        max_wrap_eqtime: diagnostics.max_wrap_eqtime,
        max_wrap_dynamic: diagnostics.max_wrap_dynamic,
        eqtime: measurements.eqtime.as_ref().and_then(|m| m.analyse()),
        dynamic: measurements.dynamic.as_ref().and_then(|m| m.analyse()),
        outputs: Vec::new(),
        manifest_path: None,
    };
    let field = state.into_field();
    if let Some(run_dir) = config.output.run_directory.as_deref() {
        write_outputs(config, run_dir, &measurements, &field, &mut summary)?;
    }
    Ok(RunOutcome { summary, field })
}

fn measure_sweep_pair(
    state: &mut SimulationState,
    rng: &mut RngHandle,
    measurements: &mut Measurements,
) -> Result<(), DqmcError> {
    state.sweep_forward(rng)?;
    if let Some(dynamic) = &mut measurements.dynamic {
        let snapshot = state.measure_displaced()?;
        dynamic.measure(&snapshot, state.lattice(), state.params().t);
    }
    if let Some(eqtime) = &mut measurements.eqtime {
        eqtime.measure(state);
    }
    state.sweep_backward(rng)?;
    if let Some(eqtime) = &mut measurements.eqtime {
        eqtime.measure(state);
    }
    Ok(())
}

fn write_outputs(
    config: &RunConfig,
    run_dir: &Path,
    measurements: &Measurements,
    field: &AuxiliaryField,
    summary: &mut RunSummary,
) -> Result<(), DqmcError> {
    let layout: &OutputConfig = &config.output;
    let mut written = Vec::new();

    if let Some(report) = &summary.eqtime {
        let path = run_dir.join(&layout.eqtime_file);
        output::write_eqtime(
            &path,
            layout.append_eqtime,
            &config.model,
            config.momentum.radians(),
            report,
        )?;
        written.push(layout.eqtime_file.clone());
    }
    if let Some(report) = &summary.dynamic {
        output::write_dynamic(&run_dir.join(&layout.dynamic_file), &config.momentum, report)?;
        written.push(layout.dynamic_file.clone());
        output::write_tau(&run_dir.join(&layout.tau_file), &config.model)?;
        written.push(layout.tau_file.clone());
    }
    if let Some(dynamic) = &measurements.dynamic {
        output::write_bins(&run_dir.join(&layout.bins_file), config.model.dtau(), dynamic)?;
        written.push(layout.bins_file.clone());
    }
    checkpoint::write_field(&run_dir.join(&layout.field_file), field)?;
    written.push(layout.field_file.clone());

    let summary_path = run_dir.join(&layout.summary_file);
    let manifest_path = run_dir.join(&layout.manifest_file);
    written.push(layout.summary_file.clone());
    summary.outputs = written.iter().map(|rel| run_dir.join(rel)).collect();
    summary.manifest_path = Some(manifest_path.clone());
    write_summary(&summary_path, summary)?;

    let manifest = RunManifest {
        schema: SchemaVersion::CURRENT,
        config: config.clone(),
        seed: summary.seed,
        seed_label: config.seed_policy.label.clone(),
        provenance: RunProvenance::capture(config, summary.seed)?,
        outputs: written,
        bins_completed: summary.bins_completed,
        cancelled: summary.cancelled,
    };
    manifest.write(&manifest_path)?;
    info!(path = %manifest_path.display(), "run outputs written");
    Ok(())
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), DqmcError> {
    let json = serde_json::to_string_pretty(summary).map_err(|err| {
        DqmcError::Serde(
            ErrorInfo::new("json-serialize", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    std::fs::write(path, json).map_err(|err| DqmcError::io("results-write", &err, path))
}
