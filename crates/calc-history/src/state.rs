//! Snapshot types captured by the history engine.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Editor contents at the moment a history entry was captured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorSnapshot {
    /// Expression text as typed.
    pub text: String,
    /// Cursor position (char offset within `text`).
    #[serde(default)]
    pub selection: usize,
}

impl EditorSnapshot {
    /// Creates a snapshot with the cursor at the end of `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let selection = text.chars().count();
        Self { text, selection }
    }
}

/// Evaluation result shown on the display.
///
/// The history engine stores and round-trips this payload but never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Rendered result text.
    pub text: String,
    /// Whether the evaluation succeeded.
    #[serde(default)]
    pub valid: bool,
    /// Error reported by the evaluator, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DisplaySnapshot {
    /// A successful result.
    pub fn valid(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            valid: true,
            error_message: None,
        }
    }

    /// A failed evaluation.
    pub fn invalid(text: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            valid: false,
            error_message: Some(error_message.into()),
        }
    }
}

/// One calculation step: the editor input paired with the result it produced.
///
/// A state is *saved* once a `SavedHistoryStore` has assigned it an id.
/// Transient states (the ones living on the undo/redo stack) carry no id.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState {
    /// Editor input at capture time.
    pub editor: EditorSnapshot,
    /// Evaluation result, `None` if the input was never evaluated.
    pub display: Option<DisplaySnapshot>,
    /// User-supplied note, kept with saved entries.
    pub description: Option<String>,
    /// When the state was captured.
    pub captured_at: DateTime<Utc>,
    id: Option<u64>,
}

impl HistoryState {
    /// Captures a new transient state stamped with the current time.
    pub fn new(editor: EditorSnapshot, display: Option<DisplaySnapshot>) -> Self {
        Self {
            editor,
            display,
            description: None,
            captured_at: Utc::now(),
            id: None,
        }
    }

    /// Builder-style setter for the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Id assigned by the saved store, `None` for transient states.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Whether this state belongs to a saved store.
    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// Editor text, the key used by intermediate-state filtering.
    pub fn editor_text(&self) -> &str {
        &self.editor.text
    }

    /// Produces an independent saved copy carrying `id`.
    ///
    /// The original is left untouched so the transient and saved copies can
    /// diverge afterwards.
    pub(crate) fn promote(&self, id: u64) -> Self {
        Self {
            editor: self.editor.clone(),
            display: self.display.clone(),
            description: self.description.clone(),
            captured_at: self.captured_at,
            id: Some(id),
        }
    }

    /// Rebuilds a transient state from its persisted fields.
    pub(crate) fn restore(
        editor: EditorSnapshot,
        display: Option<DisplaySnapshot>,
        description: Option<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            editor,
            display,
            description,
            captured_at,
            id: None,
        }
    }
}
