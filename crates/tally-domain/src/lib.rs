//! Tally Domain Layer
//!
//! This crate contains the data model shared by every other Tally crate and the
//! trait seams behind which the external recognition services and the durable
//! checkpoint live. Its only external dependency is `serde` derive, because the
//! field names of [`DocumentRecord`] *are* the checkpoint file format.
//!
//! ## Key Concepts
//!
//! - **ItemKey**: Stable identifier of one input document; the deduplication key
//! - **DocumentRecord**: One processed document (extracted fields + category)
//! - **Confidence**: A score clamped to [0, 1]
//! - **Category**: One label from a closed set, or the `Uncategorized` sentinel
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Service implementations live in `tally-adapter`
//! - Store implementations live in `tally-store`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod confidence;
pub mod input;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use category::{default_categories, CategoryResult, DEFAULT_CATEGORIES, UNCATEGORIZED};
pub use confidence::Confidence;
pub use input::{InputItem, PreparedDocument};
pub use record::{BoundingBox, DocumentRecord, ItemKey, RecognizedToken};
pub use traits::{AppendOutcome, Answer, LabelScore};
