//! Output traits and types
//!
//! This module defines the document encoder interface and the feed-level
//! metadata handed to it.

use crate::record::Record;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(#[from] StorageError),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Channel-level metadata of one output document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl FeedMeta {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: description.into(),
        }
    }
}

/// Serializes a slice of records into one output document
///
/// The writer decides which records go into which document; the encoder only
/// owns the byte format.
pub trait DocumentEncoder: Send + Sync {
    fn encode(&self, records: &[Record], meta: &FeedMeta) -> OutputResult<Vec<u8>>;
}
