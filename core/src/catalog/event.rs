use crate::bearing::Arrival;
use crate::catalog::station::StationLookup;
use crate::prelude::Coordinate;
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

/// Arrival of an event at one hydrophone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Letter code of the hydrophone.
    pub sensor: char,
    pub arrival: NaiveDateTime,
    /// Received level in dB.
    pub received_level: f64,
}

/// One decoded catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Accepted label found in the block.
    pub label: String,
    pub source_time: NaiveDateTime,
    /// Source level in dB.
    pub source_level: f64,
    pub source_location: Coordinate,
    /// In summary-line letter order.
    pub detections: Vec<Detection>,
}

impl Event {
    pub fn detection(&self, sensor: char) -> Option<&Detection> {
        self.detections.iter().find(|d| d.sensor == sensor)
    }

    pub fn earliest_arrival(&self) -> Option<NaiveDateTime> {
        self.detections.iter().map(|d| d.arrival).min()
    }

    /// Arrival times in seconds after the event's earliest arrival, keyed by
    /// canonical station id, in detection order.
    ///
    /// Letters the station table does not know are left out, as are stations
    /// outside `selection` when it is non-empty.
    pub fn arrivals<L: StationLookup + ?Sized>(
        &self,
        stations: &L,
        selection: &[String],
    ) -> Vec<Arrival> {
        let Some(origin) = self.earliest_arrival() else {
            return Vec::new();
        };
        self.detections
            .iter()
            .filter_map(|d| {
                let Some(id) = stations.resolve(d.sensor) else {
                    log::debug!("no station for letter {} at {}", d.sensor, self.source_time);
                    return None;
                };
                if !selection.is_empty() && !selection.iter().any(|s| s == id) {
                    return None;
                }
                let offset = d.arrival - origin;
                Some(Arrival {
                    sensor: id.to_string(),
                    time: offset.num_milliseconds() as f64 / 1000.0,
                })
            })
            .collect()
    }
}

/// Seconds elapsed since midnight, millisecond resolution.
pub fn seconds_of_day(stamp: &NaiveDateTime) -> f64 {
    let millis = stamp.nanosecond() / 1_000_000;
    f64::from(stamp.num_seconds_from_midnight()) + f64::from(millis) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::station::{Station, StationCatalog};
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32, second: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 2, 14)
            .unwrap()
            .and_hms_milli_opt(hour, minute, second, milli)
            .unwrap()
    }

    fn event() -> Event {
        Event {
            label: "II_impulsive".into(),
            source_time: at(23, 59, 50, 0),
            source_level: 187.25,
            source_location: Coordinate::new(53.34, -176.47),
            detections: vec![
                Detection {
                    sensor: 'B',
                    arrival: at(23, 59, 59, 500),
                    received_level: 45.0,
                },
                Detection {
                    sensor: 'A',
                    arrival: at(23, 59, 58, 250),
                    received_level: 50.0,
                },
                Detection {
                    sensor: 'Z',
                    arrival: at(23, 59, 57, 0),
                    received_level: 40.0,
                },
            ],
        }
    }

    fn stations() -> StationCatalog {
        StationCatalog::from_stations(vec![
            Station::new("H32", 'A', Coordinate::new(53.3396, -176.5764)),
            Station::new("H38", 'B', Coordinate::new(53.4038, -176.4708)),
        ])
        .unwrap()
    }

    #[test]
    fn seconds_of_day_keeps_milliseconds() {
        assert_eq!(seconds_of_day(&at(12, 30, 47, 120)), 45_047.12);
        assert_eq!(seconds_of_day(&at(0, 0, 0, 0)), 0.0);
    }

    #[test]
    fn arrivals_are_relative_to_earliest_detection() {
        let arrivals = event().arrivals(&stations(), &[]);
        assert_eq!(arrivals.len(), 2);
        assert_eq!(arrivals[0].sensor, "H38");
        assert_eq!(arrivals[0].time, 2.5);
        assert_eq!(arrivals[1].sensor, "H32");
        assert_eq!(arrivals[1].time, 1.25);
    }

    #[test]
    fn arrivals_honour_selection() {
        let arrivals = event().arrivals(&stations(), &["H32".to_string()]);
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].sensor, "H32");
    }

    #[test]
    fn detection_lookup_by_letter() {
        let event = event();
        assert_eq!(event.detection('A').map(|d| d.received_level), Some(50.0));
        assert!(event.detection('Q').is_none());
    }
}
