//! JSON checkpoint file with atomic replace

use crate::StoreError;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tally_domain::traits::CheckpointStore;
use tally_domain::{AppendOutcome, DocumentRecord, ItemKey};
use tracing::{debug, info, warn};

/// Checkpoint store backed by a single JSON array file
///
/// Every successful [`append`](CheckpointStore::append) rewrites the whole
/// file through a temporary sibling that is fsynced and read back before it
/// replaces the original, so a crash leaves either the old or the new file,
/// never a truncated one.
///
/// Not synchronized: share it behind a `Mutex` when several tasks append.
#[derive(Debug)]
pub struct JsonCheckpointStore {
    path: PathBuf,
    records: Vec<DocumentRecord>,
    keys: HashSet<ItemKey>,
}

impl JsonCheckpointStore {
    /// Open the checkpoint at `path`, loading whatever it already holds
    ///
    /// The parent directory is created if needed. A missing or empty file
    /// starts an empty store; a corrupt one is renamed aside (see
    /// [`CheckpointStore::load`]).
    ///
    /// # Errors
    ///
    /// Fails only when the location itself is unusable (directory cannot be
    /// created, file cannot be read).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut store = Self {
            path,
            records: Vec::new(),
            keys: HashSet::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Location of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the records stored at `path` without opening a store
    ///
    /// Missing or blank files read as empty. Unlike [`open`](Self::open)
    /// this never renames anything: a corrupt file is an error.
    pub fn read_records(path: &Path) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(Self::read_file(path)?.unwrap_or_default())
    }

    /// Check that the checkpoint location accepts writes
    pub fn check_writable(&self) -> Result<(), StoreError> {
        let probe = self.temp_path();
        File::create(&probe)?;
        fs::remove_file(&probe)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// `Ok(None)` when the file does not exist
    fn read_file(path: &Path) -> Result<Option<Vec<DocumentRecord>>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read(path)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Vec::new()));
        }
        // Invalid UTF-8 surfaces as a parse error, so it is corruption too
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Move an unreadable checkpoint out of the way, keeping it for inspection
    fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".to_string());

        let mut target = self.path.with_file_name(format!("{}.corrupt-{}", file_name, secs));
        let mut attempt = 1;
        while target.exists() {
            target = self
                .path
                .with_file_name(format!("{}.corrupt-{}-{}", file_name, secs, attempt));
            attempt += 1;
        }

        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    /// Read `temp` back and check it holds every in-memory record
    fn verify(&self, temp: &Path) -> Result<(), StoreError> {
        let written: Vec<DocumentRecord> = serde_json::from_slice(&fs::read(temp)?)
            .map_err(|e| StoreError::Verification(e.to_string()))?;
        if written.len() != self.records.len() {
            return Err(StoreError::Verification(format!(
                "expected {} records, read back {}",
                self.records.len(),
                written.len()
            )));
        }
        Ok(())
    }

    /// Write all records through a verified temporary file
    fn persist(&self) -> Result<(), StoreError> {
        let temp = self.temp_path();
        let json = serde_json::to_string_pretty(&self.records)?;

        {
            let mut file = File::create(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = self.verify(&temp) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        fs::rename(&temp, &self.path)?;

        #[cfg(unix)]
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}

impl CheckpointStore for JsonCheckpointStore {
    type Error = StoreError;

    fn load(&mut self) -> Result<Vec<DocumentRecord>, Self::Error> {
        self.records.clear();
        self.keys.clear();

        let loaded = match Self::read_file(&self.path) {
            Ok(Some(records)) => records,
            Ok(None) => {
                warn!(path = %self.path.display(), "Checkpoint not found, starting empty");
                Vec::new()
            }
            Err(StoreError::Corrupt { reason, .. }) => {
                let moved_to = self.quarantine()?;
                warn!(
                    path = %self.path.display(),
                    quarantined = %moved_to.display(),
                    reason = %reason,
                    "Checkpoint is corrupt, preserved and starting empty"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        for record in loaded {
            if self.keys.insert(record.item_key.clone()) {
                self.records.push(record);
            } else {
                warn!(item_key = %record.item_key, "Duplicate key in checkpoint, keeping first");
            }
        }

        info!(path = %self.path.display(), records = self.records.len(), "Checkpoint loaded");
        Ok(self.records.clone())
    }

    fn contains(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }

    fn append(&mut self, record: DocumentRecord) -> Result<AppendOutcome, Self::Error> {
        if self.keys.contains(&record.item_key) {
            debug!(item_key = %record.item_key, "Already checkpointed, ignoring");
            return Ok(AppendOutcome::Duplicate);
        }

        let key = record.item_key.clone();
        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }
        self.keys.insert(key);
        Ok(AppendOutcome::Inserted)
    }

    fn records(&self) -> &[DocumentRecord] {
        &self.records
    }
}
