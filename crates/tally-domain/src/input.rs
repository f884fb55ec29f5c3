//! Input items and preprocessed documents

use crate::ItemKey;
use std::path::{Path, PathBuf};

/// One enumerated input document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    /// Deduplication key
    pub key: ItemKey,

    /// Where the document lives
    pub source_path: PathBuf,
}

impl InputItem {
    /// Build an item keyed by the file name of `path`
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let source_path = path.into();
        let key = ItemKey::from_path(&source_path)?;
        Some(Self { key, source_path })
    }

    /// Locator passed to the document question answerer
    pub fn locator(&self) -> &Path {
        &self.source_path
    }
}

/// Output of the preprocessing filter, input of text recognition
///
/// Opaque to the core: the bytes are whatever the configured preprocessor
/// produced (a cleaned image, or the raw file for a pass-through filter).
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// The item this document was prepared from
    pub item: InputItem,

    /// Prepared image bytes
    pub image: Vec<u8>,
}
