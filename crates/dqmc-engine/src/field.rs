use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_core::rng::RngHandle;
use serde::{Deserialize, Serialize};

/// Discrete auxiliary field `s(i, l)` for sites `i < ls` and slices `l < lt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryField {
    ls: usize,
    lt: usize,
    values: Vec<f64>,
}

impl AuxiliaryField {
    /// Field with every component set to `+1`.
    pub fn uniform(ls: usize, lt: usize) -> Self {
        Self {
            ls,
            lt,
            values: vec![1.0; ls * lt],
        }
    }

    /// Field with independent fair `±1` components.
    pub fn random(ls: usize, lt: usize, rng: &mut RngHandle) -> Self {
        let values = (0..ls * lt).map(|_| rng.ising()).collect();
        Self { ls, lt, values }
    }

    /// Builds a field from `(l, i, value)` entries with `value` either `+1` or `-1`.
    ///
    /// The entries must cover `[0, ls) x [0, lt)` exactly once; the extent is
    /// inferred from the largest indices and checked against the expected shape.
    pub fn from_entries(
        ls: usize,
        lt: usize,
        entries: &[(usize, usize, f64)],
    ) -> Result<Self, DqmcError> {
        let max_l = entries.iter().map(|e| e.0 + 1).max().unwrap_or(0);
        let max_i = entries.iter().map(|e| e.1 + 1).max().unwrap_or(0);
        if max_l != lt || max_i != ls {
            return Err(DqmcError::Config(
                ErrorInfo::new("field-shape", "auxiliary field does not match the model size")
                    .with_context("expected", format!("{ls}x{lt}"))
                    .with_context("found", format!("{max_i}x{max_l}")),
            ));
        }
        let mut values = vec![f64::NAN; ls * lt];
        for &(l, i, value) in entries {
            if value != 1.0 && value != -1.0 {
                return Err(DqmcError::Config(
                    ErrorInfo::new("field-parse", "field value must be +1 or -1")
                        .with_context("slice", l.to_string())
                        .with_context("site", i.to_string())
                        .with_context("value", value.to_string()),
                ));
            }
            values[l * ls + i] = value;
        }
        if let Some(gap) = values.iter().position(|v| v.is_nan()) {
            return Err(DqmcError::Config(
                ErrorInfo::new("field-shape", "auxiliary field has a missing entry")
                    .with_context("slice", (gap / ls).to_string())
                    .with_context("site", (gap % ls).to_string()),
            ));
        }
        Ok(Self { ls, lt, values })
    }

    /// Number of sites.
    pub fn num_sites(&self) -> usize {
        self.ls
    }

    /// Number of time slices.
    pub fn num_slices(&self) -> usize {
        self.lt
    }

    /// Component at `(site, slice)`.
    pub fn get(&self, site: usize, slice: usize) -> f64 {
        self.values[slice * self.ls + site]
    }

    /// Components of one slice, indexed by site.
    pub fn slice(&self, slice: usize) -> &[f64] {
        &self.values[slice * self.ls..(slice + 1) * self.ls]
    }

    /// Negates the component at `(site, slice)`.
    pub fn flip(&mut self, site: usize, slice: usize) {
        self.values[slice * self.ls + site] *= -1.0;
    }

    /// Iterates over `(slice, site, value)` in slice-major order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(idx, &v)| (idx / self.ls, idx % self.ls, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entries_are_reported() {
        let entries = vec![(0, 0, 1.0), (0, 1, -1.0), (1, 1, 1.0)];
        let err = AuxiliaryField::from_entries(2, 2, &entries).unwrap_err();
        assert_eq!(err.info().code, "field-shape");
        assert_eq!(err.info().context.get("site").unwrap(), "0");
    }

    #[test]
    fn non_ising_values_are_rejected() {
        let entries = vec![(0, 0, 1.0), (0, 1, 0.5), (1, 0, -1.0), (1, 1, 1.0)];
        let err = AuxiliaryField::from_entries(2, 2, &entries).unwrap_err();
        assert_eq!(err.info().code, "field-parse");
        assert_eq!(err.info().context.get("value").unwrap(), "0.5");
        assert_eq!(err.info().context.get("site").unwrap(), "1");
    }

    #[test]
    fn flip_negates_single_component() {
        let mut field = AuxiliaryField::uniform(4, 3);
        field.flip(2, 1);
        assert_eq!(field.get(2, 1), -1.0);
        assert_eq!(field.slice(1), &[1.0, 1.0, -1.0, 1.0]);
    }
}
