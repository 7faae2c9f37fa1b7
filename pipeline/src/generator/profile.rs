use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use hydrocore::bearing::BearingEstimate;
use hydrocore::catalog::{Station, StationCatalog, StationLookup};
use hydrocore::math::{angular_difference, compass_bearing, LocalFrame, Point2};
use hydrocore::prelude::{Coordinate, DEFAULT_SPEED};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt::Write;

/// Configuration for rendering synthetic catalog text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub events: usize,
    pub seed: u64,
    pub label: String,
    /// Source time of the first event.
    pub start: NaiveDateTime,
    /// Seconds between consecutive source times.
    pub spacing_s: i64,
    pub speed: f64,
    /// Sources fall within this distance of the array centre, metres.
    pub max_range_m: f64,
    pub received_level: (f64, f64),
    pub source_level: (f64, f64),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 2, 14)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default();
        Self {
            events: 10,
            seed: 0,
            label: "II_impulsive".to_string(),
            start,
            spacing_s: 600,
            speed: DEFAULT_SPEED,
            max_range_m: 3000.0,
            received_level: (30.0, 60.0),
            source_level: (170.0, 200.0),
        }
    }
}

/// Where a synthetic event really was.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticEvent {
    pub source_time: NaiveDateTime,
    pub location: Coordinate,
}

pub struct SyntheticCatalog {
    pub text: String,
    pub truths: Vec<SyntheticEvent>,
}

/// Four-hydrophone array used when no station table is supplied.
pub fn default_array() -> StationCatalog {
    let stations = vec![
        Station::new("H32", 'A', Coordinate::new(53.3396, -176.5764)),
        Station::new("H41", 'B', Coordinate::new(53.2725, -176.4712)),
        Station::new("H40", 'C', Coordinate::new(53.3384, -176.3639)),
        Station::new("H38", 'D', Coordinate::new(53.4038, -176.4708)),
    ];
    StationCatalog::from_stations(stations).unwrap_or_default()
}

/// Renders `config.events` blocks in catalog format, one detection per station.
pub fn build_catalog(
    config: &GeneratorConfig,
    stations: &StationCatalog,
) -> anyhow::Result<SyntheticCatalog> {
    let frame = LocalFrame::centered(&stations.coordinates())
        .context("synthetic catalog needs at least one station")?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut text = String::new();
    let mut truths = Vec::with_capacity(config.events);

    for index in 0..config.events {
        let offset = Duration::seconds(config.spacing_s.saturating_mul(index as i64))
            + Duration::milliseconds(rng.gen_range(0..10) * 100);
        let source_time = config
            .start
            .checked_add_signed(offset)
            .context("synthetic source time out of range")?;

        let range = config.max_range_m * rng.gen::<f64>().sqrt();
        let angle = rng.gen_range(0.0..TAU);
        let source = Point2::new(range * angle.cos(), range * angle.sin());
        let location = frame.unproject(source);

        writeln!(text, "{} synthetic event {}", config.label, index + 1)?;
        writeln!(
            text,
            "{} {:.4} {:.4}",
            source_digits(&source_time),
            location.lat,
            location.lon
        )?;
        let mut letters = String::new();
        for station in stations.stations() {
            let travel = frame.project(station.coordinate).distance_to(&source) / config.speed;
            let arrival = source_time
                .checked_add_signed(Duration::milliseconds((travel * 1e3).round() as i64))
                .context("synthetic arrival out of range")?;
            let level = rng.gen_range(config.received_level.0..config.received_level.1);
            writeln!(text, "{} {} {:.2}", station.letter, detection_field(&arrival), level)?;
            letters.push(station.letter);
        }
        let source_level = rng.gen_range(config.source_level.0..config.source_level.1);
        writeln!(text, "source level {source_level:.2}")?;
        writeln!(text, " {} {} {}", letters.len(), config.label, letters)?;
        writeln!(text, "{}", index % 99 + 1)?;

        truths.push(SyntheticEvent {
            source_time,
            location,
        });
    }

    Ok(SyntheticCatalog { text, truths })
}

/// Bearing error of an estimate against the synthetic truth, degrees.
pub fn bearing_error<L: StationLookup + ?Sized>(
    truth: &SyntheticEvent,
    estimate: &BearingEstimate,
    stations: &L,
    frame: &LocalFrame,
) -> Option<f64> {
    let reference = stations.coordinate_of(&estimate.reference)?;
    let expected = compass_bearing(frame.project(reference), frame.project(truth.location));
    Some(angular_difference(estimate.bearing_deg, expected))
}

fn source_digits(t: &NaiveDateTime) -> String {
    format!(
        "{:04}{:03}{:02}{:02}{:02}{}",
        t.year(),
        t.ordinal(),
        t.hour(),
        t.minute(),
        t.second(),
        t.nanosecond() / 100_000_000
    )
}

fn detection_field(t: &NaiveDateTime) -> String {
    format!(
        "{:04} {:03}{:02}{:02}{:02}.{:03}",
        t.year(),
        t.ordinal(),
        t.hour(),
        t.minute(),
        t.second(),
        t.nanosecond() / 1_000_000
    )
}
