//! Per-item and per-run result types

use crate::{PipelineError, RunMetrics};
use std::fmt;
use tally_domain::{Confidence, ItemKey};

/// Lifecycle of one input item
///
/// `Pending -> Processing -> {Succeeded, Failed}`. An item that is already
/// checkpointed goes from `Pending` straight to `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Enumerated, not yet checked against the checkpoint
    Pending,
    /// Preprocessing, extraction, validation and classification under way
    Processing,
    /// Record committed (now or in an earlier run)
    Succeeded,
    /// Processing failed; the checkpoint was not touched
    Failed,
}

impl ItemState {
    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How an item left the pipeline
#[derive(Debug)]
pub enum Resolution {
    /// Already present in the checkpoint; nothing was re-run
    AlreadyDone,

    /// Processed and committed in this run
    Committed {
        /// Category label (or `Uncategorized`)
        category: String,
        /// Category score
        confidence: Confidence,
        /// Cleaned total, if any
        total_amount: Option<f64>,
        /// Uncategorized or missing a usable amount
        degraded: bool,
    },

    /// Processing failed
    Failed(PipelineError),
}

/// Result of processing one item
#[derive(Debug)]
pub struct ItemOutcome {
    /// Position in the input enumeration (0-based)
    pub index: usize,
    /// Item key
    pub item_key: ItemKey,
    /// What happened
    pub resolution: Resolution,
}

impl ItemOutcome {
    /// Terminal state reached by the item
    pub fn state(&self) -> ItemState {
        match self.resolution {
            Resolution::AlreadyDone | Resolution::Committed { .. } => ItemState::Succeeded,
            Resolution::Failed(_) => ItemState::Failed,
        }
    }

    /// Whether the item was skipped because it was already checkpointed
    pub fn is_skipped(&self) -> bool {
        matches!(self.resolution, Resolution::AlreadyDone)
    }

    /// The failure, if the item failed
    pub fn error(&self) -> Option<&PipelineError> {
        match &self.resolution {
            Resolution::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of one batch run
#[derive(Debug)]
pub struct RunSummary {
    /// Identifier of the run, as logged
    pub run_id: String,
    /// Counters
    pub metrics: RunMetrics,
    /// Whether the run stopped early on an interrupt
    pub interrupted: bool,
    /// Per-item outcomes in input order (items never started are absent)
    pub outcomes: Vec<ItemOutcome>,
}

impl RunSummary {
    /// Outcomes of failed items
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state() == ItemState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_is_success() {
        let outcome = ItemOutcome {
            index: 0,
            item_key: ItemKey::new("a.jpg"),
            resolution: Resolution::AlreadyDone,
        };
        assert_eq!(outcome.state(), ItemState::Succeeded);
        assert!(outcome.is_skipped());
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_failed_outcome() {
        let outcome = ItemOutcome {
            index: 1,
            item_key: ItemKey::new("b.jpg"),
            resolution: Resolution::Failed(PipelineError::InputUnreadable {
                item_key: "b.jpg".to_string(),
                reason: "file is empty".to_string(),
            }),
        };
        assert_eq!(outcome.state(), ItemState::Failed);
        assert!(outcome.state().is_terminal());
        assert!(!ItemState::Processing.is_terminal());
    }
}
