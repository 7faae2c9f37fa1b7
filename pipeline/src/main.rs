use anyhow::Context;
use clap::Parser;
use generator::profile::{bearing_error, build_catalog, default_array, GeneratorConfig};
use hydrocore::bearing::BearingHistogram;
use hydrocore::catalog::StationCatalog;
use hydrocore::math::LocalFrame;
use hydrocore::telemetry::RunReport;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use workflow::config::WorkflowConfig;
use workflow::runner::{EventBearing, Runner, WorkflowResult};

mod export;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Hydroacoustic pick catalog decoder and bearing estimator")]
struct Args {
    /// Pick catalog to decode
    #[arg(long, required_unless_present = "synthetic")]
    catalog: Option<PathBuf>,
    /// Station metadata file; overrides any inline station table
    #[arg(long)]
    stations: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Write per-event received-level CSV files into this directory
    #[arg(long)]
    export: Option<PathBuf>,
    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
    /// Accepted event label (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,
    #[arg(long, default_value_t = hydrocore::prelude::DEFAULT_SPEED)]
    speed: f64,
    /// Estimator worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// Generate this many synthetic events and check the recovered bearings
    #[arg(long)]
    synthetic: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    catalog: &'a str,
    report: RunReport,
    malformed: Vec<String>,
    histogram: &'a BearingHistogram,
    bearings: &'a [EventBearing],
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.labels.clone(), args.speed, args.threads)
    };
    if args.workflow.is_some() && !args.labels.is_empty() {
        workflow_config.labels = args.labels.clone();
    }

    let stations = match &args.stations {
        Some(path) => StationCatalog::load(path)
            .with_context(|| format!("loading stations {}", path.display()))?,
        None => workflow_config.station_catalog()?.unwrap_or_default(),
    };

    if let Some(count) = args.synthetic {
        return run_synthetic(&args, workflow_config, stations, count);
    }

    let Some(catalog_path) = &args.catalog else {
        anyhow::bail!("--catalog is required");
    };
    if stations.is_empty() {
        log::warn!("no station table given; every bearing will be undetermined");
    }

    let runner = Runner::new(workflow_config)?;
    let result = runner.execute_file(catalog_path, &stations, args.export.as_deref())?;
    print_summary(&result);

    if let Some(report_path) = &args.report {
        let name = catalog_path.display().to_string();
        write_report(report_path, &name, &result)?;
    }
    Ok(())
}

fn run_synthetic(
    args: &Args,
    workflow_config: WorkflowConfig,
    stations: StationCatalog,
    count: usize,
) -> anyhow::Result<()> {
    let stations = if stations.is_empty() {
        default_array()
    } else {
        stations
    };
    let generator = GeneratorConfig {
        events: count,
        seed: args.seed,
        label: workflow_config
            .labels
            .first()
            .cloned()
            .unwrap_or_else(|| GeneratorConfig::default().label),
        speed: workflow_config.speed,
        ..Default::default()
    };
    let synthetic = build_catalog(&generator, &stations)?;
    let runner = Runner::new(workflow_config)?;
    let result = runner.execute(&synthetic.text, "synthetic", &stations, args.export.as_deref())?;
    print_summary(&result);

    let frame = LocalFrame::centered(&stations.coordinates())
        .context("synthetic run needs station coordinates")?;
    let errors: Vec<f64> = synthetic
        .truths
        .iter()
        .zip(&result.bearings)
        .filter_map(|(truth, bearing)| {
            let estimate = bearing.outcome.estimate()?;
            bearing_error(truth, estimate, &stations, &frame)
        })
        .collect();
    let worst = errors.iter().cloned().fold(0.0_f64, f64::max);
    println!(
        "Synthetic check -> {} of {} bearings recovered, worst error {:.3} deg",
        errors.len(),
        synthetic.truths.len(),
        worst
    );

    if let Some(report_path) = &args.report {
        write_report(report_path, "synthetic", &result)?;
    }
    Ok(())
}

fn print_summary(result: &WorkflowResult) {
    let report = &result.report;
    println!(
        "Catalog run -> events {}, filtered {}, malformed {}, files {}",
        report.events_parsed,
        report.blocks_filtered,
        report.blocks_malformed,
        result.exported.len()
    );
    println!(
        "Bearings -> {} solved, {} undetermined, {} degenerate",
        report.bearings_solved, report.bearings_undetermined, report.bearings_degenerate
    );
    let events = result.catalog.events();
    if let (Some(first), Some(last)) = (events.first(), events.last()) {
        println!("Source times {} .. {}", first.source_time, last.source_time);
    }
    if let Some((start, count)) = result.histogram.peak() {
        println!(
            "Most frequent bearing sector: {}-{} deg ({} events)",
            start,
            start + result.histogram.bin_width(),
            count
        );
    }
}

fn write_report(path: &Path, catalog: &str, result: &WorkflowResult) -> anyhow::Result<()> {
    let report = ReportFile {
        catalog,
        report: result.report,
        malformed: result.summary.malformed.iter().map(|e| e.to_string()).collect(),
        histogram: &result.histogram,
        bearings: &result.bearings,
    };
    let json = serde_json::to_string_pretty(&report).context("serializing run report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("writing run report {}", path.display()))?;
    Ok(())
}
