use crate::prelude::{CatalogError, CatalogResult, Coordinate, StationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A hydrophone with its canonical id and catalog letter code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub letter: char,
    pub coordinate: Coordinate,
    /// Metres below the surface when known.
    #[serde(default)]
    pub depth: Option<f64>,
}

impl Station {
    pub fn new(id: impl Into<String>, letter: char, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            letter,
            coordinate,
            depth: None,
        }
    }
}

/// Read-only station lookups used while decoding and estimating.
pub trait StationLookup {
    /// Canonical id of the station with this letter code.
    fn resolve(&self, letter: char) -> Option<&str>;
    fn coordinate_of(&self, id: &str) -> Option<Coordinate>;
    fn letter_of(&self, id: &str) -> Option<char>;
}

/// Stations of one network, ordered by letter code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationCatalog {
    stations: Vec<Station>,
}

impl StationCatalog {
    pub fn from_stations(mut stations: Vec<Station>) -> Result<Self, StationError> {
        stations.sort_by_key(|s| s.letter);
        if let Some(pair) = stations.windows(2).find(|w| w[0].letter == w[1].letter) {
            return Err(StationError::DuplicateLetter(pair[0].letter));
        }
        Ok(Self { stations })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&String::from_utf8_lossy(&bytes)).map_err(|source| CatalogError::Station {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Decodes a station metadata file.
    ///
    /// Names are lines holding a single upper-case alphanumeric token of two or
    /// more characters. The first two rows of exactly one decimal per name are
    /// latitudes then longitudes. The letter codes are the last line listing one
    /// single-character code per name, separated by blanks or commas.
    pub fn parse(text: &str) -> Result<Self, StationError> {
        let names: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| is_station_name(l))
            .collect();
        if names.is_empty() {
            return Err(StationError::NoStations);
        }
        let count = names.len();

        let rows: Vec<Vec<f64>> = text
            .lines()
            .filter_map(coordinate_row)
            .filter(|row| row.len() == count)
            .take(2)
            .collect();
        let [lats, lons] = rows.as_slice() else {
            return Err(StationError::MissingCoordinates {
                expected: count,
                found: rows.len(),
            });
        };

        let letters = text
            .lines()
            .rev()
            .filter_map(letter_row)
            .find(|row| row.len() == count)
            .ok_or(StationError::MissingLetters(count))?;

        let stations = names
            .iter()
            .zip(letters)
            .zip(lats.iter().zip(lons))
            .map(|((name, letter), (&lat, &lon))| {
                Station::new(*name, letter, Coordinate::new(lat, lon))
            })
            .collect();
        Self::from_stations(stations)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn by_letter(&self, letter: char) -> Option<&Station> {
        self.stations
            .binary_search_by_key(&letter, |s| s.letter)
            .ok()
            .map(|idx| &self.stations[idx])
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.stations.iter().map(|s| s.coordinate).collect()
    }
}

impl StationLookup for StationCatalog {
    fn resolve(&self, letter: char) -> Option<&str> {
        self.by_letter(letter).map(|s| s.id.as_str())
    }

    fn coordinate_of(&self, id: &str) -> Option<Coordinate> {
        self.get(id).map(|s| s.coordinate)
    }

    fn letter_of(&self, id: &str) -> Option<char> {
        self.get(id).map(|s| s.letter)
    }
}

fn is_station_name(line: &str) -> bool {
    line.len() >= 2
        && line.starts_with(|c: char| c.is_ascii_uppercase())
        && line
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn coordinate_row(line: &str) -> Option<Vec<f64>> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(|t| if t.contains('.') { t.parse().ok() } else { None })
        .collect::<Option<_>>()?;
    (!values.is_empty()).then_some(values)
}

fn letter_row(line: &str) -> Option<Vec<char>> {
    let codes: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();
    if codes.is_empty() {
        return None;
    }
    let mut seen = HashSet::new();
    codes
        .iter()
        .map(|code| {
            let mut chars = code.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() && seen.insert(c) => Some(c),
                _ => None,
            }
        })
        .collect()
}
