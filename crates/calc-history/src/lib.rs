//! Calculation history with undo/redo and saved entries.
//!
//! Provides a `HistoryEngine` that listens to the calculator's editor and
//! display events, pairs each edit with the result it produced, and records
//! the pair on a bounded undo/redo stack. Entries the user keeps are copied
//! into a separate saved history with stable ids that can be exported to and
//! imported from a text form.
pub mod codec;
pub mod config;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod saved;
pub mod stack;
pub mod state;

pub use config::HistoryConfig;
pub use correlator::{Correlation, EventCorrelator};
pub use engine::HistoryEngine;
pub use error::HistoryError;
pub use event::{
    CalculatorEvent, EventEnvelope, EventIdGenerator, EventKind, EventSink, HistoryEvent,
    HistoryListener,
};
pub use filter::is_intermediate;
pub use saved::SavedHistoryStore;
pub use stack::{HistoryAction, UndoRedoStack};
pub use state::{DisplaySnapshot, EditorSnapshot, HistoryState};
