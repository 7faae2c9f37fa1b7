use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Event-type labels that appear in the analyst catalogs.
pub const KNOWN_LABELS: [&str; 8] = [
    "isolated_t_phase",
    "composite_pst_t",
    "composite_pt_t",
    "paired_t1",
    "impulsive_I",
    "II_impulsive",
    "doublet",
    "uncategorized",
];

/// Nominal speed of sound in sea water, m/s.
pub const DEFAULT_SPEED: f64 = 1462.0;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Settings for decoding event blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// A block is decoded only if one of these appears in its text.
    pub labels: Vec<String>,
    /// Position of the summary line counted from the end of the block (1 = last line).
    pub summary_line_from_end: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            labels: vec!["II_impulsive".to_string()],
            summary_line_from_end: 1,
        }
    }
}

/// Settings for the TDOA bearing solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Propagation speed in m/s.
    pub speed: f64,
    /// Preferred reference sensor id for the bearing.
    pub reference: Option<String>,
    pub max_iterations: usize,
    /// Relative step size below which the solve stops.
    pub tolerance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            reference: Some("H38".to_string()),
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// Part of an event block the decoder looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    SourceTime,
    SourceLocation,
    Amplitude,
    SummaryLine,
    SensorLetters,
    DetectionLine,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::SourceTime => "source time",
            Field::SourceLocation => "source location",
            Field::Amplitude => "amplitude",
            Field::SummaryLine => "summary line",
            Field::SensorLetters => "sensor letters",
            Field::DetectionLine => "detection line",
        };
        f.write_str(name)
    }
}

/// Decode failure for a block that carried an accepted label.
///
/// Every variant carries the 1-based catalog line the block starts on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
pub enum FormatError {
    #[error("block at line {line}: missing {field}")]
    Missing { field: Field, line: usize },
    #[error("block at line {line}: invalid {field} `{value}`")]
    Invalid {
        field: Field,
        value: String,
        line: usize,
    },
    #[error("block at line {line}: {letters} sensor letters but {found} {field} entries")]
    CountMismatch {
        field: Field,
        letters: usize,
        found: usize,
        line: usize,
    },
}

impl FormatError {
    pub fn line(&self) -> usize {
        match self {
            FormatError::Missing { line, .. }
            | FormatError::Invalid { line, .. }
            | FormatError::CountMismatch { line, .. } => *line,
        }
    }

    pub fn field(&self) -> Field {
        match self {
            FormatError::Missing { field, .. }
            | FormatError::Invalid { field, .. }
            | FormatError::CountMismatch { field, .. } => *field,
        }
    }
}

/// Station metadata decode failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StationError {
    #[error("no station names found")]
    NoStations,
    #[error("expected latitude and longitude rows of {expected} values, found {found} rows")]
    MissingCoordinates { expected: usize, found: usize },
    #[error("no letter-code line with {0} entries")]
    MissingLetters(usize),
    #[error("duplicate letter code `{0}`")]
    DuplicateLetter(char),
}

/// File-level failures; these end the run for the file.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("station metadata {}: {source}", path.display())]
    Station {
        path: PathBuf,
        #[source]
        source: StationError,
    },
    #[error("compiling detection pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
