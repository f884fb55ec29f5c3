//! Input set enumeration

use crate::{PipelineConfig, PipelineError};
use std::fs;
use std::path::Path;
use tally_domain::traits::CheckpointStore;
use tally_domain::InputItem;
use tracing::{debug, warn};

/// List the input documents in `config.input_dir`
///
/// Only regular files with an accepted extension are returned, sorted by item
/// key so repeated runs see the same order. Subdirectories are not descended.
pub fn enumerate_inputs(config: &PipelineConfig) -> Result<Vec<InputItem>, PipelineError> {
    let dir = &config.input_dir;
    let entries = fs::read_dir(dir).map_err(|e| input_dir_error(dir, e))?;

    let mut items = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| input_dir_error(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let accepted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| config.accepts_extension(e));
        if !accepted {
            debug!(path = %path.display(), "Skipping non-input file");
            continue;
        }
        match InputItem::from_path(&path) {
            Some(item) => items.push(item),
            None => warn!(path = %path.display(), "Skipping file whose name is not valid UTF-8"),
        }
    }

    items.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(items)
}

/// Items not yet present in `store`, in input order
pub fn pending_items<'a, S: CheckpointStore>(items: &'a [InputItem], store: &S) -> Vec<&'a InputItem> {
    items.iter().filter(|item| !store.contains(&item.key)).collect()
}

fn input_dir_error(dir: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::InputDirectory {
        path: dir.display().to_string(),
        reason: e.to_string(),
    }
}
