//! Events consumed and produced by the history engine.
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::state::{DisplaySnapshot, EditorSnapshot, HistoryState};

/// Change notification emitted by the calculator and UI layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CalculatorEvent {
    /// The editor contents changed.
    EditorChanged(EditorSnapshot),
    /// The display was updated with a new evaluation result.
    DisplayChanged(DisplaySnapshot),
    /// The user explicitly asked for the current input to be evaluated.
    ManualCalculationRequested(EditorSnapshot),
    /// Anything else the event source forwards (conversions, preferences, ...).
    Other { name: String },
}

/// Discriminant of a [`CalculatorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EditorChanged,
    DisplayChanged,
    ManualCalculationRequested,
    Other,
}

impl EventKind {
    /// Kinds the history engine reacts to.
    pub fn is_tracked(self) -> bool {
        !matches!(self, EventKind::Other)
    }
}

impl CalculatorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CalculatorEvent::EditorChanged(_) => EventKind::EditorChanged,
            CalculatorEvent::DisplayChanged(_) => EventKind::DisplayChanged,
            CalculatorEvent::ManualCalculationRequested(_) => EventKind::ManualCalculationRequested,
            CalculatorEvent::Other { .. } => EventKind::Other,
        }
    }
}

/// An event stamped with its ordering metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Globally issued id, strictly increasing over the life of the source.
    pub sequence_id: u64,
    /// Calculation session the event belongs to.
    ///
    /// An edit opens a session whose id is its own `sequence_id`; the display
    /// update produced by evaluating that edit carries the same session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// The event itself.
    pub event: CalculatorEvent,
}

impl EventEnvelope {
    pub fn new(sequence_id: u64, session_id: Option<u64>, event: CalculatorEvent) -> Self {
        Self {
            sequence_id,
            session_id,
            event,
        }
    }

    /// An editor change opening its own session.
    pub fn editor_changed(sequence_id: u64, editor: EditorSnapshot) -> Self {
        Self::new(
            sequence_id,
            Some(sequence_id),
            CalculatorEvent::EditorChanged(editor),
        )
    }

    /// A manual calculation request opening its own session.
    pub fn manual_calculation(sequence_id: u64, editor: EditorSnapshot) -> Self {
        Self::new(
            sequence_id,
            Some(sequence_id),
            CalculatorEvent::ManualCalculationRequested(editor),
        )
    }

    /// A display update produced by the calculation started in `session_id`.
    pub fn display_changed(sequence_id: u64, session_id: u64, display: DisplaySnapshot) -> Self {
        Self::new(
            sequence_id,
            Some(session_id),
            CalculatorEvent::DisplayChanged(display),
        )
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Issues strictly increasing sequence ids for one event source.
///
/// Shared by every producer of that source (UI thread, evaluation thread) so
/// all envelopes live in a single id space.
#[derive(Debug)]
pub struct EventIdGenerator {
    next: AtomicU64,
}

impl Default for EventIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIdGenerator {
    /// Starts issuing at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id. Never returns the same value twice.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn editor_changed(&self, editor: EditorSnapshot) -> EventEnvelope {
        EventEnvelope::editor_changed(self.next_id(), editor)
    }

    pub fn manual_calculation(&self, editor: EditorSnapshot) -> EventEnvelope {
        EventEnvelope::manual_calculation(self.next_id(), editor)
    }

    pub fn display_changed(&self, session_id: u64, display: DisplaySnapshot) -> EventEnvelope {
        EventEnvelope::display_changed(self.next_id(), session_id, display)
    }

    pub fn other(&self, name: impl Into<String>) -> EventEnvelope {
        EventEnvelope::new(
            self.next_id(),
            None,
            CalculatorEvent::Other { name: name.into() },
        )
    }
}

/// Receiver of calculator events.
///
/// The event source holds a reference to its sinks and calls `on_event`
/// for every envelope it emits.
pub trait EventSink: Send + Sync {
    fn on_event(&self, envelope: &EventEnvelope);
}

/// Notification produced by the history engine.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    /// A state was appended to the undo/redo stack.
    StateAdded(HistoryState),
}

/// Observer of [`HistoryEvent`]s.
pub trait HistoryListener: Send + Sync {
    fn on_history_event(&self, event: &HistoryEvent);
}

impl<F> HistoryListener for F
where
    F: Fn(&HistoryEvent) + Send + Sync,
{
    fn on_history_event(&self, event: &HistoryEvent) {
        self(event)
    }
}
