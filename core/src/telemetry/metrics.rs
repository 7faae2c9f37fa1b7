use crate::bearing::BearingOutcome;
use crate::catalog::ParseSummary;
use serde::Serialize;
use std::sync::Mutex;

/// Counters for one run, shareable between estimator workers.
pub struct MetricsRecorder {
    inner: Mutex<RunReport>,
}

/// Snapshot of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub events_parsed: usize,
    pub blocks_filtered: usize,
    pub blocks_malformed: usize,
    pub bearings_solved: usize,
    pub bearings_undetermined: usize,
    pub bearings_degenerate: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RunReport::default()),
        }
    }

    pub fn record_parse(&self, summary: &ParseSummary) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.events_parsed += summary.parsed;
            metrics.blocks_filtered += summary.filtered;
            metrics.blocks_malformed += summary.malformed.len();
        }
    }

    pub fn record_bearing(&self, outcome: &BearingOutcome) {
        if let Ok(mut metrics) = self.inner.lock() {
            match outcome {
                BearingOutcome::Solved(_) => metrics.bearings_solved += 1,
                BearingOutcome::Underdetermined { .. } => metrics.bearings_undetermined += 1,
                BearingOutcome::Degenerate { .. } => metrics.bearings_degenerate += 1,
            }
        }
    }

    pub fn snapshot(&self) -> RunReport {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            RunReport::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
