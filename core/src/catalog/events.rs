use crate::catalog::event::Event;
use crate::catalog::station::StationLookup;
use crate::parsing::{segment, EventParser, ParseResult};
use crate::prelude::{CatalogError, CatalogResult, FormatError};
use crate::telemetry::log::LogManager;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Per-file decode counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseSummary {
    pub blocks: usize,
    pub parsed: usize,
    pub filtered: usize,
    pub malformed: Vec<FormatError>,
}

/// One detection of a given hydrophone, as reported by [`EventCatalog::detections_for`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorPick<'a> {
    pub source_time: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub label: &'a str,
    pub received_level: f64,
}

/// Events of one catalog file, ordered by source time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    /// Orders events by source time; events with equal times keep their input order.
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.source_time);
        Self { events }
    }

    /// Decodes every block of `text`. Malformed blocks are logged and skipped.
    pub fn from_text(
        text: &str,
        parser: &EventParser,
        logger: &LogManager,
    ) -> (Self, ParseSummary) {
        let blocks = segment(text);
        let mut summary = ParseSummary {
            blocks: blocks.len(),
            ..Default::default()
        };
        let mut events = Vec::new();

        for block in &blocks {
            match parser.parse(block) {
                ParseResult::Accepted(event) => {
                    logger.accepted(&event, block.line);
                    summary.parsed += 1;
                    events.push(event);
                }
                ParseResult::Filtered => summary.filtered += 1,
                ParseResult::Malformed(err) => {
                    logger.skipped(&err);
                    summary.malformed.push(err);
                }
            }
        }

        logger.record(&format!(
            "{} blocks: {} events, {} filtered, {} malformed",
            summary.blocks,
            summary.parsed,
            summary.filtered,
            summary.malformed.len()
        ));
        (Self::new(events), summary)
    }

    /// Reads and decodes a catalog file. Failing to read the file is fatal.
    pub fn load<P: AsRef<Path>>(
        path: P,
        parser: &EventParser,
        logger: &LogManager,
    ) -> CatalogResult<(Self, ParseSummary)> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(&String::from_utf8_lossy(&bytes), parser, logger))
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// First event with exactly this source time.
    pub fn get(&self, source_time: &NaiveDateTime) -> Option<&Event> {
        let idx = self.events.partition_point(|e| e.source_time < *source_time);
        self.events
            .get(idx)
            .filter(|e| e.source_time == *source_time)
    }

    /// Every detection by the hydrophone with this letter code, oldest event first.
    pub fn detections_for_letter(&self, letter: char) -> Vec<SensorPick<'_>> {
        self.events
            .iter()
            .filter_map(|event| {
                event.detection(letter).map(|d| SensorPick {
                    source_time: event.source_time,
                    arrival: d.arrival,
                    label: &event.label,
                    received_level: d.received_level,
                })
            })
            .collect()
    }

    /// Every detection by the station with this canonical id.
    pub fn detections_for<L: StationLookup + ?Sized>(
        &self,
        id: &str,
        stations: &L,
    ) -> Vec<SensorPick<'_>> {
        stations
            .letter_of(id)
            .map(|letter| self.detections_for_letter(letter))
            .unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a EventCatalog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
