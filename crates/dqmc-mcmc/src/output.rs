//! Fixed-width result files and the per-bin CSV dump.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_engine::ModelParams;
use dqmc_measure::{DynamicMeasure, DynamicReport, EqualTimeReport};
use serde::Serialize;

use crate::config::Momentum;

fn create_parent(path: &Path) -> Result<(), DqmcError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| DqmcError::io("results-write", &err, parent))
        }
        _ => Ok(()),
    }
}

fn open(path: &Path, append: bool) -> Result<BufWriter<File>, DqmcError> {
    create_parent(path)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|err| DqmcError::io("results-write", &err, path))?;
    Ok(BufWriter::new(file))
}

fn finish(mut writer: BufWriter<File>, contents: &str, path: &Path) -> Result<(), DqmcError> {
    writer
        .write_all(contents.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|err| DqmcError::io("results-write", &err, path))
}

/// Relative error that stays finite for a vanishing mean.
fn relative(error: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        0.0
    } else {
        error / mean
    }
}

/// Writes one row: `U/t`, `beta`, five means, five errors, `qx`, `qy` in radians.
pub fn write_eqtime(
    path: &Path,
    append: bool,
    params: &ModelParams,
    q_radians: [f64; 2],
    report: &EqualTimeReport,
) -> Result<(), DqmcError> {
    let writer = open(path, append)?;
    let mut row = String::new();
    let mut push = |value: f64| row.push_str(&format!("{value:>15.8}"));
    push(params.u / params.t);
    push(params.beta);
    for estimate in report.observables.values() {
        push(estimate.mean);
    }
    for estimate in report.observables.values() {
        push(estimate.error);
    }
    push(q_radians[0]);
    push(q_radians[1]);
    row.push('\n');
    finish(writer, &row, path)
}

/// Writes `G(q, tau)` as `l mean error relative` rows followed by the superfluid
/// stiffness row.
pub fn write_dynamic(
    path: &Path,
    momentum: &Momentum,
    report: &DynamicReport,
) -> Result<(), DqmcError> {
    let writer = open(path, false)?;
    let mut contents = format!("Momentum k: {} pi, {} pi\n", momentum.qx, momentum.qy);
    let greens = &report.matsubara_greens;
    for l in 0..greens.mean.len() {
        let (mean, error) = (greens.mean[l], greens.error[l]);
        contents.push_str(&format!(
            "{l:>15}{mean:>15.8}{error:>15.8}{:>15.8}\n",
            relative(error, mean)
        ));
    }
    let rho = &report.superfluid_stiffness;
    contents.push_str(&format!(
        "{:>15.8}{:>15.8}{:>15.8}\n",
        rho.mean,
        rho.error,
        relative(rho.error, rho.mean)
    ));
    finish(writer, &contents, path)
}

/// Writes the imaginary-time grid: a `lt beta` header then `l dtau` per slice.
pub fn write_tau(path: &Path, params: &ModelParams) -> Result<(), DqmcError> {
    let writer = open(path, false)?;
    let dtau = params.dtau();
    let mut contents = format!("{:>15}{:>15.8}\n", params.lt, params.beta);
    for l in 0..params.lt {
        contents.push_str(&format!("{:>15.8}\n", l as f64 * dtau));
    }
    finish(writer, &contents, path)
}

#[derive(Debug, Serialize)]
struct BinRow {
    bin: usize,
    l: usize,
    tau: f64,
    matsubara_greens: f64,
    density_of_states: f64,
    superfluid_stiffness: f64,
}

/// Dumps every committed time-displaced bin, one CSV row per `(bin, l)`.
pub fn write_bins(path: &Path, dtau: f64, measure: &DynamicMeasure) -> Result<(), DqmcError> {
    create_parent(path)?;
    let wrap_csv = |err: csv::Error| {
        DqmcError::Io(
            ErrorInfo::new("results-write", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    };
    let mut writer = csv::Writer::from_path(path).map_err(wrap_csv)?;
    let bins = measure
        .matsubara_bins()
        .iter()
        .zip(measure.density_of_states_bins())
        .zip(measure.stiffness_bins());
    for (bin, ((greens, dos), &rho)) in bins.enumerate() {
        for l in 0..greens.len() {
            writer
                .serialize(BinRow {
                    bin,
                    l,
                    tau: l as f64 * dtau,
                    matsubara_greens: greens[l],
                    density_of_states: dos[l],
                    superfluid_stiffness: rho,
                })
                .map_err(wrap_csv)?;
        }
    }
    writer
        .flush()
        .map_err(|err| DqmcError::io("results-write", &err, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_error_of_zero_mean_is_zero() {
        assert_eq!(relative(0.1, 0.0), 0.0);
        assert!((relative(0.1, 0.5) - 0.2).abs() < 1e-15);
    }
}
