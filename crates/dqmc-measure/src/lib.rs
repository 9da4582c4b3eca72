#![deny(missing_docs)]
#![doc = "Bin-based measurement and statistics for DQMC observables."]

/// Per-bin accumulator for a single observable.
pub mod observable;
/// Mean and standard error from bin values.
pub mod stats;
/// Equal-time observables built from `G(tau, tau)`.
pub mod eqtime;
/// Time-displaced observables built from `G(tau, 0)` and `G(0, tau)`.
pub mod dynamic;

pub use dynamic::{DynamicMeasure, DynamicReport};
pub use eqtime::{EqualTimeMeasure, EqualTimeReport, EQUAL_TIME_OBSERVABLES};
pub use observable::{BinValue, Observable};
pub use stats::{analyse, Estimate};
