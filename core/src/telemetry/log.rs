use crate::catalog::Event;
use crate::prelude::FormatError;
use log::{debug, info, warn};

/// Logs pipeline progress under a fixed context, usually the catalog name.
pub struct LogManager {
    context: String,
}

impl LogManager {
    pub fn new() -> Self {
        Self {
            context: String::from("catalog"),
        }
    }

    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn record(&self, message: &str) {
        info!("{}: {}", self.context, message);
    }

    pub fn accepted(&self, event: &Event, line: usize) {
        debug!(
            "{}: line {} -> event {} with {} detections",
            self.context,
            line,
            event.source_time,
            event.detections.len()
        );
    }

    pub fn skipped(&self, err: &FormatError) {
        warn!("{}: skipping {}", self.context, err);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
