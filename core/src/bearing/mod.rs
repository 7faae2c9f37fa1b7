//! TDOA bearing estimation.

pub mod estimator;
pub mod histogram;
pub mod solver;

pub use estimator::{Arrival, BearingEstimate, BearingEstimator, BearingOutcome, SensorFix};
pub use histogram::BearingHistogram;
pub use solver::{PairDelay, Solution, TdoaProblem};
