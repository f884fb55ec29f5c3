//! Status command implementation.

use crate::cli::StatusArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{Formatter, StatusReport};
use std::collections::HashSet;
use std::path::Path;
use tally_pipeline::{enumerate_inputs, PipelineConfig};
use tally_store::JsonCheckpointStore;

/// Compare the input set against the checkpoint without modifying either.
///
/// A corrupt checkpoint is reported as an error here; only `run` moves it
/// aside.
pub fn checkpoint_status(pipeline: &PipelineConfig, checkpoint: &Path) -> Result<StatusReport> {
    let items = enumerate_inputs(pipeline)?;
    let records = JsonCheckpointStore::read_records(checkpoint)?;

    let done: HashSet<&str> = records.iter().map(|r| r.item_key.as_str()).collect();
    let pending = items.iter().filter(|item| !done.contains(item.key.as_str())).count();

    Ok(StatusReport {
        inputs: items.len(),
        checkpointed: done.len(),
        pending,
        degraded: records.iter().filter(|r| r.is_degraded()).count(),
    })
}

/// Execute the status command.
pub fn execute_status(args: StatusArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let mut pipeline = config.pipeline.clone();
    if let Some(input) = args.input {
        pipeline.input_dir = input;
    }
    let checkpoint = args.checkpoint.unwrap_or_else(|| pipeline.checkpoint_path.clone());

    let status = checkpoint_status(&pipeline, &checkpoint)?;
    println!("{}", formatter.status(&status)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tally_domain::{DocumentRecord, ItemKey};
    use tempfile::TempDir;

    #[test]
    fn test_status_counts_pending() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw");
        fs::create_dir(&input).unwrap();
        for name in ["a.jpg", "b.jpg", "c.png", "notes.txt"] {
            fs::write(input.join(name), b"x").unwrap();
        }

        let checkpoint = dir.path().join("checkpoint.json");
        let records = vec![DocumentRecord::uncategorized(ItemKey::new("a.jpg"), "/in/a.jpg")];
        fs::write(&checkpoint, serde_json::to_string(&records).unwrap()).unwrap();

        let pipeline = PipelineConfig {
            input_dir: input,
            ..PipelineConfig::default()
        };
        let status = checkpoint_status(&pipeline, &checkpoint).unwrap();

        assert_eq!(
            status,
            StatusReport {
                inputs: 3,
                checkpointed: 1,
                pending: 2,
                degraded: 1,
            }
        );
    }

    #[test]
    fn test_status_leaves_corrupt_checkpoint_in_place() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        fs::write(&checkpoint, "[{ truncated").unwrap();

        let pipeline = PipelineConfig {
            input_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        assert!(checkpoint_status(&pipeline, &checkpoint).is_err());
        assert!(checkpoint.exists());
    }
}
