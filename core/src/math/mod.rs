pub mod geo;
pub mod matrix;
pub mod stats;

pub use geo::{angular_difference, compass_bearing, normalize_degrees, LocalFrame, Point2};
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
