use crate::export::CsvExporter;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use chrono::NaiveDateTime;
use hydrocore::bearing::{BearingEstimator, BearingHistogram, BearingOutcome};
use hydrocore::catalog::{EventCatalog, ParseSummary, StationCatalog};
use hydrocore::parsing::EventParser;
use hydrocore::telemetry::{LogManager, MetricsRecorder, RunReport};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Bearing result for one catalog event.
#[derive(Debug, Clone, Serialize)]
pub struct EventBearing {
    pub source_time: NaiveDateTime,
    pub label: String,
    pub outcome: BearingOutcome,
}

pub struct WorkflowResult {
    pub catalog: EventCatalog,
    pub summary: ParseSummary,
    pub report: RunReport,
    /// In catalog order.
    pub bearings: Vec<EventBearing>,
    pub histogram: BearingHistogram,
    pub exported: Vec<PathBuf>,
}

pub struct Runner {
    config: WorkflowConfig,
    parser: EventParser,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let parser = EventParser::new(config.parser_config()).context("building event parser")?;
        Ok(Self { config, parser })
    }

    /// Reads one catalog file and runs it. A file that cannot be read fails the run.
    pub fn execute_file<P: AsRef<Path>>(
        &self,
        path: P,
        stations: &StationCatalog,
        export_dir: Option<&Path>,
    ) -> anyhow::Result<WorkflowResult> {
        let path_ref = path.as_ref();
        let name = path_ref
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_ref.display().to_string());
        let logger = LogManager::with_context(name.as_str());
        let (catalog, summary) = EventCatalog::load(path_ref, &self.parser, &logger)
            .with_context(|| format!("reading catalog {}", path_ref.display()))?;
        self.finish(catalog, summary, &name, &logger, stations, export_dir)
    }

    pub fn execute(
        &self,
        text: &str,
        name: &str,
        stations: &StationCatalog,
        export_dir: Option<&Path>,
    ) -> anyhow::Result<WorkflowResult> {
        let logger = LogManager::with_context(name);
        let (catalog, summary) = EventCatalog::from_text(text, &self.parser, &logger);
        self.finish(catalog, summary, name, &logger, stations, export_dir)
    }

    /// Exports and estimates bearings for an already decoded catalog.
    fn finish(
        &self,
        catalog: EventCatalog,
        summary: ParseSummary,
        name: &str,
        logger: &LogManager,
        stations: &StationCatalog,
        export_dir: Option<&Path>,
    ) -> anyhow::Result<WorkflowResult> {
        let metrics = MetricsRecorder::new();
        metrics.record_parse(&summary);

        let exported = match export_dir {
            Some(dir) => CsvExporter::new(dir, self.config.export_options())
                .export_catalog(&catalog, stations)
                .with_context(|| format!("exporting picks of {name}"))?,
            None => Vec::new(),
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .context("building estimator pool")?;
        let estimator = BearingEstimator::new(self.config.estimator_config());
        let selection = &self.config.hydrophones;
        let bearings: Vec<EventBearing> = pool.install(|| {
            catalog
                .events()
                .par_iter()
                .map(|event| {
                    let arrivals = event.arrivals(stations, selection);
                    let outcome = estimator.estimate(&arrivals, stations);
                    metrics.record_bearing(&outcome);
                    EventBearing {
                        source_time: event.source_time,
                        label: event.label.clone(),
                        outcome,
                    }
                })
                .collect()
        });

        let solved = bearings.iter().filter_map(|b| b.outcome.bearing());
        let histogram = BearingHistogram::from_bearings(solved, 10);
        let report = metrics.snapshot();
        logger.record(&format!(
            "{} bearings solved, {} undetermined, {} degenerate",
            report.bearings_solved, report.bearings_undetermined, report.bearings_degenerate
        ));

        Ok(WorkflowResult {
            catalog,
            summary,
            report,
            bearings,
            histogram,
            exported,
        })
    }
}
