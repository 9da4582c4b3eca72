use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::stats::{analyse, Estimate};

/// Arithmetic needed to accumulate and analyse bin values.
pub trait BinValue: Clone + std::fmt::Debug {
    /// Zero of the same shape as `self`.
    fn zeros_like(&self) -> Self;
    /// `self += factor * other`.
    fn add_scaled(&mut self, factor: f64, other: &Self);
    /// `self *= factor`.
    fn scale(&mut self, factor: f64);
    /// Elementwise square.
    fn squared(&self) -> Self;
    /// Elementwise square root.
    fn sqrt(&self) -> Self;
}

impl BinValue for f64 {
    fn zeros_like(&self) -> Self {
        0.0
    }

    fn add_scaled(&mut self, factor: f64, other: &Self) {
        *self += factor * other;
    }

    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }

    fn squared(&self) -> Self {
        self * self
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }
}

impl BinValue for DVector<f64> {
    fn zeros_like(&self) -> Self {
        DVector::zeros(self.len())
    }

    fn add_scaled(&mut self, factor: f64, other: &Self) {
        self.axpy(factor, other, 1.0);
    }

    fn scale(&mut self, factor: f64) {
        self.scale_mut(factor);
    }

    fn squared(&self) -> Self {
        self.component_mul(self)
    }

    fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }
}

/// Running sum for the active bin plus the normalized values of closed bins.
///
/// A bin is closed by [`Observable::normalize`] followed by [`Observable::commit`];
/// until then nothing reaches `bins`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable<T> {
    name: String,
    tmp: T,
    count: usize,
    bins: Vec<T>,
    capacity: usize,
}

impl<T: BinValue> Observable<T> {
    /// Accumulator for `nbin` bins of values shaped like `zero`.
    pub fn new(name: impl Into<String>, zero: T, nbin: usize) -> Self {
        Self {
            name: name.into(),
            tmp: zero.zeros_like(),
            count: 0,
            bins: Vec::with_capacity(nbin),
            capacity: nbin,
        }
    }

    /// Name used in reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Running sum of the active bin.
    pub fn tmp(&self) -> &T {
        &self.tmp
    }

    /// Mutable running sum, for observables assembled piecewise.
    pub fn tmp_mut(&mut self) -> &mut T {
        &mut self.tmp
    }

    /// Adds `value` to the running sum.
    pub fn accumulate(&mut self, value: &T) {
        self.tmp.add_scaled(1.0, value);
    }

    /// Counts one measurement in the active bin.
    pub fn increment(&mut self) {
        self.count += 1;
    }

    /// Measurements in the active bin.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Divides the running sum by `count * mean_sign`. The sign accumulator itself is
    /// normalized with `mean_sign = 1`.
    pub fn normalize(&mut self, mean_sign: f64) {
        if self.count > 0 {
            self.tmp.scale(1.0 / (self.count as f64 * mean_sign));
        }
    }

    /// Stores the normalized running sum as the next bin and clears the active bin.
    /// Returns `false` once all bins are filled.
    pub fn commit(&mut self) -> bool {
        if self.bins.len() >= self.capacity {
            return false;
        }
        self.bins.push(self.tmp.clone());
        self.clear();
        true
    }

    /// Discards the active bin.
    pub fn clear(&mut self) {
        self.tmp = self.tmp.zeros_like();
        self.count = 0;
    }

    /// Closed bins in commit order.
    pub fn bins(&self) -> &[T] {
        &self.bins
    }

    /// Mean and standard error over the closed bins.
    pub fn analyse(&self) -> Option<Estimate<T>> {
        analyse(&self.bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_stops_at_capacity() {
        let mut obs = Observable::new("x", 0.0, 1);
        obs.accumulate(&2.0);
        obs.increment();
        obs.normalize(1.0);
        assert!(obs.commit());
        assert!(!obs.commit());
        assert_eq!(obs.bins(), &[2.0]);
    }
}
