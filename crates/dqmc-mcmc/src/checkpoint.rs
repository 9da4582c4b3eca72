//! Plain-text auxiliary-field files: one `l i s(i, l)` row per component.

use std::fs;
use std::path::Path;

use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_engine::AuxiliaryField;

/// Writes `field` to `path`, one whitespace-separated `l i value` row per component.
pub fn write_field(path: &Path, field: &AuxiliaryField) -> Result<(), DqmcError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| DqmcError::io("results-write", &err, parent))?;
    }
    let mut contents = String::with_capacity(field.num_sites() * field.num_slices() * 48);
    for (l, i, value) in field.entries() {
        contents.push_str(&format!("{l:>15}{i:>15}{value:>15}\n"));
    }
    fs::write(path, contents).map_err(|err| DqmcError::io("results-write", &err, path))
}

/// Reads a field of `ls` sites and `lt` slices from `path`.
pub fn read_field(path: &Path, ls: usize, lt: usize) -> Result<AuxiliaryField, DqmcError> {
    let contents =
        fs::read_to_string(path).map_err(|err| DqmcError::io("field-read", &err, path))?;
    let entries = parse_entries(&contents).map_err(|err| with_path(err, path))?;
    AuxiliaryField::from_entries(ls, lt, &entries).map_err(|err| with_path(err, path))
}

fn with_path(err: DqmcError, path: &Path) -> DqmcError {
    match err {
        DqmcError::Config(info) => {
            DqmcError::Config(info.with_context("path", path.display().to_string()))
        }
        other => other,
    }
}

fn parse_entries(contents: &str) -> Result<Vec<(usize, usize, f64)>, DqmcError> {
    let mut entries = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let bad_row = || {
            DqmcError::Config(
                ErrorInfo::new("field-parse", "expected `l i value` on every row")
                    .with_context("line", (line_no + 1).to_string()),
            )
        };
        let mut parts = trimmed.split_whitespace();
        let (Some(l), Some(i), Some(value), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad_row());
        };
        let l = l.parse::<usize>().map_err(|_| bad_row())?;
        let i = i.parse::<usize>().map_err(|_| bad_row())?;
        let value = value.parse::<f64>().map_err(|_| bad_row())?;
        entries.push((l, i, value));
    }
    Ok(entries)
}
