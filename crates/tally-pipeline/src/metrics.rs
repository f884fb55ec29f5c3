//! Counters collected during a batch run

use crate::{ItemOutcome, Resolution};
use serde::Serialize;
use std::time::Duration;

/// Counters collected during a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Items in the input set
    pub total: usize,

    /// Items processed and committed in this run
    pub committed: usize,

    /// Items skipped because they were already checkpointed
    pub skipped: usize,

    /// Items that failed
    pub failed: usize,

    /// Committed items that are uncategorized or lack an amount
    pub degraded: usize,

    /// Items never dispatched because the run was interrupted
    pub not_started: usize,

    /// Wall-clock time of the run in milliseconds
    pub elapsed_ms: u64,
}

impl RunMetrics {
    /// Create new empty metrics for `total` items
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Count one item outcome
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match &outcome.resolution {
            Resolution::AlreadyDone => self.skipped += 1,
            Resolution::Committed { degraded, .. } => {
                self.committed += 1;
                if *degraded {
                    self.degraded += 1;
                }
            }
            Resolution::Failed(_) => self.failed += 1,
        }
    }

    /// Record the run duration
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
    }

    /// Items that reached `Succeeded` (committed now or earlier)
    pub fn succeeded(&self) -> usize {
        self.committed + self.skipped
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Run Summary".to_string(),
            "===========".to_string(),
            format!("Items: {}", self.total),
            format!("Succeeded: {} ({} new, {} already done)", self.succeeded(), self.committed, self.skipped),
            format!("Failed: {}", self.failed),
            format!("Degraded: {}", self.degraded),
        ];
        if self.not_started > 0 {
            lines.push(format!("Not started: {}", self.not_started));
        }
        lines.push(format!("Elapsed: {:.1}s", self.elapsed_ms as f64 / 1000.0));
        lines.join("\n")
    }
}
