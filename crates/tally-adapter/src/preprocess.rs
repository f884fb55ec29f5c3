//! File-backed preprocessor

use crate::AdapterError;
use std::fs;
use tally_domain::traits::Preprocessor;
use tally_domain::{InputItem, PreparedDocument};

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

/// Reads the document from disk and hands the bytes to recognition unchanged
///
/// Image cleanup (grayscale, denoise, thresholding) is the recognition
/// server's job; this preprocessor only establishes that the input exists and
/// looks like an image, which is what makes an item `InputUnreadable`.
#[derive(Debug, Clone)]
pub struct FilePreprocessor {
    check_signature: bool,
}

impl FilePreprocessor {
    /// Create a preprocessor that rejects files without a JPEG/PNG signature
    pub fn new() -> Self {
        Self { check_signature: true }
    }

    /// Accept any non-empty file
    pub fn without_signature_check(mut self) -> Self {
        self.check_signature = false;
        self
    }
}

impl Default for FilePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor for FilePreprocessor {
    type Error = AdapterError;

    fn preprocess(&self, item: &InputItem) -> Result<PreparedDocument, Self::Error> {
        let unreadable = |reason: String| AdapterError::Unreadable {
            path: item.source_path.display().to_string(),
            reason,
        };

        let image = fs::read(&item.source_path).map_err(|e| unreadable(e.to_string()))?;
        if image.is_empty() {
            return Err(unreadable("file is empty".to_string()));
        }
        if self.check_signature && !(image.starts_with(JPEG_MAGIC) || image.starts_with(PNG_MAGIC)) {
            return Err(unreadable("not a JPEG or PNG image".to_string()));
        }

        Ok(PreparedDocument {
            item: item.clone(),
            image,
        })
    }
}
