use crate::export::ExportOptions;
use anyhow::Context;
use hydrocore::catalog::{Station, StationCatalog};
use hydrocore::prelude::{EstimatorConfig, ParserConfig, KNOWN_LABELS};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Event labels to decode; other blocks are filtered out.
    pub labels: Vec<String>,
    /// Sound speed in m/s.
    pub speed: f64,
    pub reference: Option<String>,
    /// Stations to keep for export and estimation; empty keeps all.
    pub hydrophones: Vec<String>,
    /// Inline station table, used when no station file is given.
    pub stations: Vec<Station>,
    /// Estimator worker count; 0 lets the pool decide.
    pub threads: usize,
    /// Added to every exported arrival time.
    pub time_offset_ms: i64,
    pub max_iterations: usize,
    pub summary_line_from_end: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let parser = ParserConfig::default();
        let estimator = EstimatorConfig::default();
        Self {
            labels: parser.labels,
            speed: estimator.speed,
            reference: estimator.reference,
            hydrophones: Vec::new(),
            stations: Vec::new(),
            threads: 0,
            time_offset_ms: 0,
            max_iterations: estimator.max_iterations,
            summary_line_from_end: parser.summary_line_from_end,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config.warn_unknown_labels();
        Ok(config)
    }

    pub fn from_args(labels: Vec<String>, speed: f64, threads: usize) -> Self {
        let mut config = Self {
            speed,
            threads,
            ..Default::default()
        };
        if !labels.is_empty() {
            config.labels = labels;
        }
        config.warn_unknown_labels();
        config
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            labels: self.labels.clone(),
            summary_line_from_end: self.summary_line_from_end,
        }
    }

    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            speed: self.speed,
            reference: self.reference.clone(),
            max_iterations: self.max_iterations,
            ..Default::default()
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            hydrophones: self.hydrophones.clone(),
            time_offset_ms: self.time_offset_ms,
        }
    }

    /// The inline station table, if one was configured.
    pub fn station_catalog(&self) -> anyhow::Result<Option<StationCatalog>> {
        if self.stations.is_empty() {
            return Ok(None);
        }
        let catalog = StationCatalog::from_stations(self.stations.clone())
            .context("building inline station table")?;
        Ok(Some(catalog))
    }

    fn warn_unknown_labels(&self) {
        for label in &self.labels {
            if !KNOWN_LABELS.contains(&label.as_str()) {
                warn!("label {label} is not a known event type");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_default_label() {
        let cfg = WorkflowConfig::from_args(Vec::new(), 1480.0, 2);
        assert_eq!(cfg.parser_config().labels, vec!["II_impulsive".to_string()]);
        assert_eq!(cfg.estimator_config().speed, 1480.0);
        assert_eq!(cfg.threads, 2);
    }

    #[test]
    fn config_from_args_overrides_labels() {
        let cfg = WorkflowConfig::from_args(vec!["doublet".into(), "paired_t1".into()], 1462.0, 0);
        assert_eq!(cfg.parser_config().labels.len(), 2);
        assert_eq!(cfg.estimator_config().reference.as_deref(), Some("H38"));
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        let yaml = r#"labels: [doublet]
speed: 1500.0
hydrophones: [H38, H40]
time_offset_ms: -250
stations:
  - id: H38
    letter: D
    coordinate: { lat: 53.4038, lon: -176.4708 }
  - id: H40
    letter: C
    coordinate: { lat: 53.3384, lon: -176.3639 }
"#;
        temp.write_all(yaml.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.labels, vec!["doublet".to_string()]);
        assert_eq!(cfg.speed, 1500.0);
        assert_eq!(cfg.max_iterations, 200);
        assert_eq!(cfg.export_options().time_offset_ms, -250);

        let stations = cfg.station_catalog().unwrap().unwrap();
        assert_eq!(stations.stations()[0].id, "H40");
        assert_eq!(stations.stations()[1].depth, None);
    }

    #[test]
    fn config_without_stations_has_no_table() {
        assert!(WorkflowConfig::default().station_catalog().unwrap().is_none());
    }

    #[test]
    fn config_rejects_duplicate_station_letters() {
        let mut cfg = WorkflowConfig::default();
        let station: Station = serde_yaml::from_str(
            "id: H38\nletter: D\ncoordinate: { lat: 53.4038, lon: -176.4708 }\n",
        )
        .unwrap();
        cfg.stations = vec![station.clone(), station];
        assert!(cfg.station_catalog().is_err());
    }

    #[test]
    fn config_load_reports_bad_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"speed: [not, a, number]\n").unwrap();
        let err = WorkflowConfig::load(temp.path()).unwrap_err();
        assert!(err.to_string().contains("parsing workflow config"));
    }
}
