//! Error types for the history engine.

use thiserror::Error;

/// Failures surfaced by the history engine.
///
/// Navigation, recording and saving are fail-soft; only the persisted form
/// of saved history can fail.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    /// The persisted saved history could not be parsed.
    #[error("malformed saved history: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The persisted saved history was written by an incompatible format version.
    #[error("unsupported saved history version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
        /// Version this build reads and writes.
        supported: u32,
    },

    /// Saved history could not be encoded.
    #[error("failed to encode saved history: {0}")]
    Encode(#[source] serde_json::Error),
}

impl HistoryError {
    /// Whether the error means the persisted data itself is unusable.
    #[must_use]
    pub fn is_malformed_data(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::UnsupportedVersion { .. }
        )
    }
}

/// Result alias for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
