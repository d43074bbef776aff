//! Text form of saved history.
//!
//! Saved states are written as a versioned JSON document:
//! `{"version": 1, "states": [{editor, display, description, captured_at}]}`.
//! Ids are never written; a store assigns fresh ones when it loads the
//! document.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, Result};
use crate::state::{DisplaySnapshot, EditorSnapshot, HistoryState};

/// Format version written by [`encode`] and accepted by [`decode`].
pub const FORMAT_VERSION: u32 = 1;

/// Persisted fields of a single saved state.
#[derive(Debug, Serialize, Deserialize)]
struct SavedRecord {
    editor: EditorSnapshot,
    #[serde(default)]
    display: Option<DisplaySnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    captured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedHistoryDocument {
    version: u32,
    #[serde(default)]
    states: Vec<SavedRecord>,
}

impl From<&HistoryState> for SavedRecord {
    fn from(state: &HistoryState) -> Self {
        Self {
            editor: state.editor.clone(),
            display: state.display.clone(),
            description: state.description.clone(),
            captured_at: state.captured_at,
        }
    }
}

impl From<SavedRecord> for HistoryState {
    fn from(record: SavedRecord) -> Self {
        HistoryState::restore(
            record.editor,
            record.display,
            record.description,
            record.captured_at,
        )
    }
}

/// Encodes `states` in order.
///
/// # Errors
///
/// Returns [`HistoryError::Encode`] if serialization fails.
pub fn encode(states: &[HistoryState]) -> Result<String> {
    let document = SavedHistoryDocument {
        version: FORMAT_VERSION,
        states: states.iter().map(SavedRecord::from).collect(),
    };
    serde_json::to_string_pretty(&document).map_err(HistoryError::Encode)
}

/// Decodes a document produced by [`encode`].
///
/// Returned states are transient (no id).
///
/// # Errors
///
/// Returns [`HistoryError::Malformed`] if the text is not a valid document and
/// [`HistoryError::UnsupportedVersion`] if it was written by another format
/// version.
pub fn decode(text: &str) -> Result<Vec<HistoryState>> {
    let document: SavedHistoryDocument =
        serde_json::from_str(text).map_err(HistoryError::Malformed)?;

    if document.version != FORMAT_VERSION {
        return Err(HistoryError::UnsupportedVersion {
            found: document.version,
            supported: FORMAT_VERSION,
        });
    }

    Ok(document.states.into_iter().map(HistoryState::from).collect())
}
