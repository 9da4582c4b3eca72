use serde::{Deserialize, Serialize};

use crate::observable::BinValue;

/// Bin mean with its standard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate<T> {
    /// Average over bins.
    pub mean: T,
    /// Standard error of the mean.
    pub error: T,
    /// Number of bins analysed.
    pub bins: usize,
}

impl Estimate<f64> {
    /// `error / mean`.
    pub fn relative_error(&self) -> f64 {
        self.error / self.mean
    }
}

/// Computes `mean = sum(b) / N` and `error = sqrt(sum((b - mean)^2) / (N (N - 1)))`.
///
/// Returns `None` without bins. A single bin yields a zero error.
pub fn analyse<T: BinValue>(bins: &[T]) -> Option<Estimate<T>> {
    let first = bins.first()?;
    let n = bins.len() as f64;
    let mut mean = first.zeros_like();
    for bin in bins {
        mean.add_scaled(1.0 / n, bin);
    }
    let mut variance = first.zeros_like();
    if bins.len() > 1 {
        for bin in bins {
            let mut deviation = bin.clone();
            deviation.add_scaled(-1.0, &mean);
            variance.add_scaled(1.0, &deviation.squared());
        }
        variance.scale(1.0 / (n * (n - 1.0)));
    }
    Some(Estimate {
        mean,
        error: variance.sqrt(),
        bins: bins.len(),
    })
}
