//! Decoding and bearing estimation core for hydroacoustic pick catalogs.
//!
//! Catalog text is split into event blocks, each block decoded into an
//! [`Event`](catalog::Event) with its per-hydrophone detections, and the
//! arrivals of each event fed to a TDOA solve that yields a compass bearing
//! from a reference hydrophone to the source.

pub mod bearing;
pub mod catalog;
pub mod math;
pub mod parsing;
pub mod prelude;
pub mod telemetry;

pub use bearing::{Arrival, BearingEstimate, BearingEstimator, BearingHistogram, BearingOutcome};
pub use catalog::{Detection, Event, EventCatalog, Station, StationCatalog, StationLookup};
pub use parsing::{EventParser, ParseResult};
pub use prelude::{CatalogError, EstimatorConfig, FormatError, ParserConfig};
