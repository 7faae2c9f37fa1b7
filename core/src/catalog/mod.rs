pub mod event;
pub mod events;
pub mod station;

pub use event::{seconds_of_day, Detection, Event};
pub use events::{EventCatalog, ParseSummary, SensorPick};
pub use station::{Station, StationCatalog, StationLookup};
