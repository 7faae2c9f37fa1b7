use anyhow::{anyhow, Context};
use chrono::{Duration, NaiveDateTime, Timelike};
use csv::WriterBuilder;
use hydrocore::catalog::{seconds_of_day, Event, EventCatalog, StationLookup};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const RL_HEADER: [&str; 10] = [
    "station", "class", "year", "month", "date", "hour", "minute", "second", "ms", "RL",
];

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Stations to write; empty writes all.
    pub hydrophones: Vec<String>,
    pub time_offset_ms: i64,
}

/// One exported row: a detection after station naming and time offset.
#[derive(Debug, Clone, PartialEq)]
pub struct PickRow<'a> {
    pub station: String,
    pub class: &'a str,
    pub arrival: NaiveDateTime,
    pub received_level: f64,
}

/// Writes per-event received-level CSV files and their seconds-of-day companions.
pub struct CsvExporter {
    dir: PathBuf,
    options: ExportOptions,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>, options: ExportOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
        }
    }

    /// Exports every event. Events sharing a source second get `_2`, `_3`, ...
    /// appended to the stem so no file of the run is overwritten.
    pub fn export_catalog<L: StationLookup + ?Sized>(
        &self,
        catalog: &EventCatalog,
        stations: &L,
    ) -> anyhow::Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating export directory {}", self.dir.display()))?;
        let mut used: HashMap<String, usize> = HashMap::new();
        let mut written = Vec::with_capacity(catalog.len() * 2);
        for event in catalog {
            let base = event_stem(event);
            let seen = used.entry(base.clone()).or_insert(0);
            *seen += 1;
            let stem = if *seen == 1 {
                base
            } else {
                warn!("{} events share stem {}, suffixing", *seen, base);
                format!("{base}_{seen}")
            };
            written.extend(self.write_event(event, stations, &stem)?);
        }
        Ok(written)
    }

    /// Writes `<YYYYmmdd_HHMMSS>_RL.csv` and `<YYYYmmdd_HHMMSS>_RL_seconds.csv`.
    pub fn export_event<L: StationLookup + ?Sized>(
        &self,
        event: &Event,
        stations: &L,
    ) -> anyhow::Result<[PathBuf; 2]> {
        self.write_event(event, stations, &event_stem(event))
    }

    fn write_event<L: StationLookup + ?Sized>(
        &self,
        event: &Event,
        stations: &L,
        stem: &str,
    ) -> anyhow::Result<[PathBuf; 2]> {
        let rows = self.rows(event, stations);

        let levels = self.dir.join(format!("{stem}.csv"));
        self.write_atomic(&levels, Some(&RL_HEADER[..]), rows.iter().map(level_record))?;
        let seconds = self.dir.join(format!("{stem}_seconds.csv"));
        self.write_atomic(&seconds, None, rows.iter().map(seconds_record))?;

        debug!("exported {} picks to {}", rows.len(), levels.display());
        Ok([levels, seconds])
    }

    pub fn rows<'a, L: StationLookup + ?Sized>(
        &self,
        event: &'a Event,
        stations: &L,
    ) -> Vec<PickRow<'a>> {
        let offset = Duration::milliseconds(self.options.time_offset_ms);
        event
            .detections
            .iter()
            .map(|d| PickRow {
                station: stations
                    .resolve(d.sensor)
                    .map(str::to_string)
                    .unwrap_or_else(|| d.sensor.to_string()),
                class: &event.label,
                arrival: d.arrival + offset,
                received_level: d.received_level,
            })
            .filter(|row| {
                self.options.hydrophones.is_empty()
                    || self.options.hydrophones.contains(&row.station)
            })
            .collect()
    }

    fn write_atomic<I>(
        &self,
        path: &Path,
        header: Option<&[&str]>,
        records: I,
    ) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let temp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temporary file in {}", self.dir.display()))?;
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(temp);
        if let Some(header) = header {
            wtr.write_record(header)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        for record in records {
            wtr.write_record(&record)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        let temp = wtr
            .into_inner()
            .map_err(|e| anyhow!("flushing {}: {}", path.display(), e.error()))?;
        temp.persist(path)
            .with_context(|| format!("persisting {}", path.display()))?;
        Ok(())
    }
}

fn event_stem(event: &Event) -> String {
    format!("{}_RL", event.source_time.format("%Y%m%d_%H%M%S"))
}

fn level_record(row: &PickRow<'_>) -> Vec<String> {
    let t = row.arrival;
    vec![
        row.station.clone(),
        row.class.to_string(),
        t.format("%Y").to_string(),
        t.format("%m").to_string(),
        t.format("%d").to_string(),
        t.format("%H").to_string(),
        t.format("%M").to_string(),
        t.format("%S").to_string(),
        format!("{:03}", t.nanosecond() / 1_000_000),
        row.received_level.to_string(),
    ]
}

fn seconds_record(row: &PickRow<'_>) -> Vec<String> {
    vec![
        row.station.clone(),
        row.class.to_string(),
        seconds_of_day(&row.arrival).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hydrocore::catalog::{Detection, Station, StationCatalog};
    use hydrocore::prelude::Coordinate;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 2, 14)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    fn event() -> Event {
        Event {
            label: "II_impulsive".into(),
            source_time: at(12, 30, 45, 0),
            source_level: 187.25,
            source_location: Coordinate::new(53.3412, -176.4521),
            detections: vec![
                Detection {
                    sensor: 'A',
                    arrival: at(12, 30, 47, 120),
                    received_level: 45.67,
                },
                Detection {
                    sensor: 'D',
                    arrival: at(12, 30, 48, 450),
                    received_level: 50.12,
                },
            ],
        }
    }

    fn stations() -> StationCatalog {
        StationCatalog::from_stations(vec![
            Station::new("H32", 'A', Coordinate::new(53.3396, -176.5764)),
            Station::new("H38", 'D', Coordinate::new(53.4038, -176.4708)),
        ])
        .unwrap()
    }

    #[test]
    fn export_writes_levels_and_seconds() {
        let dir = tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path(), ExportOptions::default());
        let [levels, seconds] = exporter.export_event(&event(), &stations()).unwrap();

        assert_eq!(levels.file_name().unwrap(), "20230214_123045_RL.csv");
        assert_eq!(seconds.file_name().unwrap(), "20230214_123045_RL_seconds.csv");

        let text = fs::read_to_string(&levels).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "station,class,year,month,date,hour,minute,second,ms,RL");
        assert_eq!(lines[1], "H32,II_impulsive,2023,02,14,12,30,47,120,45.67");
        assert_eq!(lines[2], "H38,II_impulsive,2023,02,14,12,30,48,450,50.12");

        let text = fs::read_to_string(&seconds).unwrap();
        assert_eq!(text.lines().next(), Some("H32,II_impulsive,45047.12"));
    }

    #[test]
    fn export_applies_selection_and_offset() {
        let options = ExportOptions {
            hydrophones: vec!["H38".into()],
            time_offset_ms: -450,
        };
        let exporter = CsvExporter::new("unused", options);
        let event = event();
        let rows = exporter.rows(&event, &stations());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].station, "H38");
        assert_eq!(rows[0].arrival, at(12, 30, 48, 0));
    }

    #[test]
    fn unknown_letters_keep_their_code() {
        let exporter = CsvExporter::new("unused", ExportOptions::default());
        let event = event();
        let rows = exporter.rows(&event, &StationCatalog::default());
        let names: Vec<&str> = rows.iter().map(|r| r.station.as_str()).collect();
        assert_eq!(names, vec!["A", "D"]);
    }

    #[test]
    fn export_catalog_creates_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("picks");
        let exporter = CsvExporter::new(&target, ExportOptions::default());
        let catalog = EventCatalog::new(vec![event()]);
        let written = exporter.export_catalog(&catalog, &stations()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.starts_with(&target) && p.exists()));
        let leftovers = fs::read_dir(&target).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn same_second_events_keep_separate_files() {
        let dir = tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path(), ExportOptions::default());
        let mut first = event();
        first.source_time = at(12, 30, 45, 100);
        first.detections.truncate(1);
        first.detections[0].received_level = 11.11;
        let mut second = first.clone();
        second.label = "doublet".into();
        second.source_time = at(12, 30, 45, 600);
        second.detections[0].received_level = 22.22;

        let catalog = EventCatalog::new(vec![first, second]);
        let written = exporter.export_catalog(&catalog, &stations()).unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);

        let names: Vec<_> = written.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names[0], "20230214_123045_RL.csv");
        assert_eq!(names[2], "20230214_123045_RL_2.csv");
        assert_eq!(names[3], "20230214_123045_RL_2_seconds.csv");
        let first_text = fs::read_to_string(&written[0]).unwrap();
        let second_text = fs::read_to_string(&written[2]).unwrap();
        assert!(first_text.ends_with(",11.11\n"));
        assert!(second_text.contains("H32,doublet,"));
        assert!(second_text.ends_with(",22.22\n"));
    }
}
