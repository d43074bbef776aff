//! Calculation history orchestrator.
//!
//! Turns the calculator's event stream into undo/redo history entries and
//! owns the saved history. Safe to share between the UI thread, the
//! evaluation thread and interactive callers.
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::codec;
use crate::config::HistoryConfig;
use crate::correlator::EventCorrelator;
use crate::error::Result;
use crate::event::{CalculatorEvent, EventEnvelope, EventSink, HistoryEvent, HistoryListener};
use crate::saved::SavedHistoryStore;
use crate::stack::{HistoryAction, UndoRedoStack};
use crate::state::{EditorSnapshot, HistoryState};

/// State guarded by the history lock. Mutated only as a unit.
#[derive(Debug)]
struct HistoryCore {
    stack: UndoRedoStack,
    correlator: EventCorrelator,
    /// Editor state waiting for the display update it causes.
    pending_editor: Option<EditorSnapshot>,
}

impl HistoryCore {
    /// Applies one tracked envelope. Returns the state appended to the stack,
    /// if any.
    fn apply(&mut self, envelope: &EventEnvelope) -> Option<HistoryState> {
        let correlation = self.correlator.correlate(envelope);
        if !correlation.is_newer {
            tracing::trace!(
                sequence_id = envelope.sequence_id,
                last = ?self.correlator.last_sequence_id(),
                "Discarding stale event"
            );
            return None;
        }

        let added = match &envelope.event {
            CalculatorEvent::EditorChanged(editor)
            | CalculatorEvent::ManualCalculationRequested(editor) => {
                self.pending_editor = Some(editor.clone());
                None
            }
            CalculatorEvent::DisplayChanged(display) if correlation.is_same_session => {
                let state = self
                    .pending_editor
                    .clone()
                    .map(|editor| HistoryState::new(editor, Some(display.clone())));
                if let Some(state) = &state {
                    self.stack.add_state(state.clone());
                }
                state
            }
            CalculatorEvent::DisplayChanged(_) => {
                if self.pending_editor.take().is_some() {
                    tracing::trace!(
                        sequence_id = envelope.sequence_id,
                        session_id = ?envelope.session_id,
                        "Display update outside pending session, dropping pending edit"
                    );
                }
                None
            }
            CalculatorEvent::Other { .. } => None,
        };

        self.correlator.commit(envelope);
        added
    }
}

/// Notifications waiting for delivery, in stack order.
///
/// Events are queued while the history lock is held. Whichever thread finds
/// no delivery in progress drains the queue outside every lock.
#[derive(Debug, Default)]
struct Outbox {
    queue: VecDeque<HistoryEvent>,
    draining: bool,
}

/// Thread-safe calculation history.
///
/// The undo/redo stack, the pending editor state and the correlator share
/// one lock; the saved history has its own. Listeners receive events in the
/// order the states were appended. Delivery happens after the history lock is
/// released, so listeners may call back into the engine; when several threads
/// add at once, one of them delivers for all.
pub struct HistoryEngine {
    history: Mutex<HistoryCore>,
    saved: Mutex<SavedHistoryStore>,
    listeners: RwLock<Vec<Arc<dyn HistoryListener>>>,
    outbox: Mutex<Outbox>,
    include_intermediate: bool,
}

impl std::fmt::Debug for HistoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEngine")
            .field("history", &*self.lock_history())
            .field("saved_len", &self.lock_saved().len())
            .field("include_intermediate", &self.include_intermediate)
            .finish()
    }
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryEngine {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            history: Mutex::new(HistoryCore {
                stack: UndoRedoStack::new(config.max_states),
                correlator: EventCorrelator::new(),
                pending_editor: None,
            }),
            saved: Mutex::new(SavedHistoryStore::new()),
            listeners: RwLock::new(Vec::new()),
            outbox: Mutex::new(Outbox::default()),
            include_intermediate: config.include_intermediate,
        }
    }

    /// Registers a listener for [`HistoryEvent`]s.
    pub fn add_listener(&self, listener: Arc<dyn HistoryListener>) {
        self.listeners.write().push(listener);
    }

    // --- Undo/redo history ---

    pub fn is_empty(&self) -> bool {
        self.lock_history().stack.is_empty()
    }

    /// The current state of the undo/redo stack.
    pub fn last_state(&self) -> Option<HistoryState> {
        self.lock_history().stack.last().cloned()
    }

    pub fn is_undo_available(&self) -> bool {
        self.lock_history().stack.is_undo_available()
    }

    pub fn undo(&self, current: Option<&HistoryState>) -> Option<HistoryState> {
        self.lock_history().stack.undo(current)
    }

    pub fn is_redo_available(&self) -> bool {
        self.lock_history().stack.is_redo_available()
    }

    pub fn redo(&self, current: Option<&HistoryState>) -> Option<HistoryState> {
        self.lock_history().stack.redo(current)
    }

    pub fn is_action_available(&self, action: HistoryAction) -> bool {
        self.lock_history().stack.is_action_available(action)
    }

    pub fn do_action(
        &self,
        action: HistoryAction,
        current: Option<&HistoryState>,
    ) -> Option<HistoryState> {
        self.lock_history().stack.do_action(action, current)
    }

    /// Appends `state` to the undo/redo stack and notifies listeners.
    /// `None` is a no-op.
    pub fn add_state(&self, state: Option<HistoryState>) {
        let Some(state) = state else {
            return;
        };
        {
            let mut history = self.lock_history();
            history.stack.add_state(state.clone());
            self.outbox.lock().queue.push_back(HistoryEvent::StateAdded(state));
        }
        self.deliver();
    }

    /// States on the undo/redo stack, oldest first.
    pub fn states(&self, include_intermediate: bool) -> Vec<HistoryState> {
        self.lock_history().stack.states(include_intermediate)
    }

    /// States as configured for display, see [`HistoryConfig::include_intermediate`].
    pub fn listing(&self) -> Vec<HistoryState> {
        self.states(self.include_intermediate)
    }

    /// Empties the undo/redo stack. Saved history is not affected.
    pub fn clear(&self) {
        self.lock_history().stack.clear();
    }

    // --- Saved history ---

    /// Snapshot of the saved history.
    pub fn saved_history(&self) -> Vec<HistoryState> {
        self.lock_saved().states().to_vec()
    }

    /// Saves a copy of `state`; see [`SavedHistoryStore::add_saved`].
    pub fn add_saved_state(&self, state: &HistoryState) -> HistoryState {
        self.lock_saved().add_saved(state)
    }

    pub fn clear_saved_history(&self) {
        self.lock_saved().clear();
    }

    pub fn remove_saved_history(&self, state: &HistoryState) -> bool {
        self.lock_saved().remove(state)
    }

    pub fn set_saved_description(&self, id: u64, description: Option<String>) -> bool {
        self.lock_saved().set_description(id, description)
    }

    /// Replaces the saved history with the contents of `serialized`.
    ///
    /// # Errors
    ///
    /// Returns an error if `serialized` is malformed; the saved history is
    /// left unchanged in that case.
    pub fn import_saved_history(&self, serialized: &str) -> Result<()> {
        let states = codec::decode(serialized)?;
        let count = states.len();
        self.lock_saved().replace_all(states);
        tracing::debug!(count, "Imported saved history");
        Ok(())
    }

    /// Encodes the saved history.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn export_saved_history(&self) -> Result<String> {
        let states = self.saved_history();
        codec::encode(&states)
    }

    // --- Events ---

    /// Feeds one envelope from the event source.
    ///
    /// Edits are remembered until the display update of the same session
    /// arrives; the pair then becomes a history entry. Stale envelopes and
    /// display updates from another session add nothing.
    pub fn on_event(&self, envelope: &EventEnvelope) {
        if !envelope.kind().is_tracked() {
            return;
        }

        let added = {
            let mut history = self.lock_history();
            let added = history.apply(envelope);
            if let Some(state) = &added {
                self.outbox
                    .lock()
                    .queue
                    .push_back(HistoryEvent::StateAdded(state.clone()));
            }
            added
        };

        if let Some(state) = added {
            tracing::debug!(
                sequence_id = envelope.sequence_id,
                text = state.editor_text(),
                "History state added"
            );
            self.deliver();
        }
    }

    /// Drains the outbox unless another thread already is.
    fn deliver(&self) {
        {
            let mut outbox = self.outbox.lock();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }

        loop {
            let event = {
                let mut outbox = self.outbox.lock();
                match outbox.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };
            let listeners: Vec<Arc<dyn HistoryListener>> = self.listeners.read().clone();
            for listener in listeners {
                listener.on_history_event(&event);
            }
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, HistoryCore> {
        self.history.lock()
    }

    fn lock_saved(&self) -> MutexGuard<'_, SavedHistoryStore> {
        self.saved.lock()
    }
}

impl EventSink for HistoryEngine {
    fn on_event(&self, envelope: &EventEnvelope) {
        HistoryEngine::on_event(self, envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventIdGenerator;
    use crate::state::DisplaySnapshot;

    fn editor(text: &str) -> EditorSnapshot {
        EditorSnapshot::new(text)
    }

    fn display(text: &str) -> DisplaySnapshot {
        DisplaySnapshot::valid(text)
    }

    fn texts(states: &[HistoryState]) -> Vec<String> {
        states.iter().map(|s| s.editor.text.clone()).collect()
    }

    /// Runs one edit + evaluation round trip through the engine.
    fn calculate(engine: &HistoryEngine, ids: &EventIdGenerator, input: &str, result: &str) {
        let edit = ids.editor_changed(editor(input));
        engine.on_event(&edit);
        engine.on_event(&ids.display_changed(edit.sequence_id, display(result)));
    }

    #[test]
    fn test_edit_then_display_adds_state() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();

        calculate(&engine, &ids, "2+2", "4");

        let last = engine.last_state().expect("state");
        assert_eq!(last.editor_text(), "2+2");
        assert_eq!(last.display, Some(display("4")));
        assert!(!last.is_saved());
    }

    #[test]
    fn test_manual_calculation_pairs_like_edit() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();

        let request = ids.manual_calculation(editor("3*3"));
        engine.on_event(&request);
        engine.on_event(&ids.display_changed(request.sequence_id, display("9")));

        assert_eq!(texts(&engine.states(true)), vec!["3*3"]);
    }

    #[test]
    fn test_edit_alone_adds_nothing() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();
        engine.on_event(&ids.editor_changed(editor("1")));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_overwritten_edit_produces_no_entry() {
        let engine = HistoryEngine::default();

        engine.on_event(&EventEnvelope::editor_changed(1, editor("1")));
        engine.on_event(&EventEnvelope::editor_changed(2, editor("12")));
        engine.on_event(&EventEnvelope::display_changed(3, 1, display("1")));

        assert!(engine.is_empty());
    }

    #[test]
    fn test_session_break_drops_pending_edit() {
        let engine = HistoryEngine::default();

        engine.on_event(&EventEnvelope::editor_changed(1, editor("1")));
        engine.on_event(&EventEnvelope::editor_changed(2, editor("12")));
        engine.on_event(&EventEnvelope::display_changed(3, 1, display("1")));
        // The display of session 2 now arrives, but the pending edit is gone.
        engine.on_event(&EventEnvelope::display_changed(4, 2, display("12")));

        assert!(engine.is_empty());
    }

    #[test]
    fn test_foreign_display_discards_pending_edit() {
        let engine = HistoryEngine::default();

        engine.on_event(&EventEnvelope::editor_changed(1, editor("1")));
        engine.on_event(&EventEnvelope::editor_changed(2, editor("12")));
        engine.on_event(&EventEnvelope::display_changed(3, 1, display("1")));
        // Continues the session of the last committed envelope, but the edit
        // it would pair with was discarded above.
        engine.on_event(&EventEnvelope::display_changed(4, 1, display("1")));

        assert!(engine.is_empty());
    }

    #[test]
    fn test_stale_event_is_ignored() {
        let engine = HistoryEngine::default();

        engine.on_event(&EventEnvelope::editor_changed(5, editor("5")));
        // Older edit must not replace the pending state.
        engine.on_event(&EventEnvelope::editor_changed(4, editor("4")));
        engine.on_event(&EventEnvelope::display_changed(6, 5, display("5")));

        assert_eq!(texts(&engine.states(true)), vec!["5"]);

        // Replayed display with an old id adds nothing.
        engine.on_event(&EventEnvelope::display_changed(6, 5, display("5")));
        engine.on_event(&EventEnvelope::display_changed(2, 5, display("5")));
        assert_eq!(engine.states(true).len(), 1);
    }

    #[test]
    fn test_untracked_events_do_not_break_session() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();

        let edit = ids.editor_changed(editor("7"));
        engine.on_event(&edit);
        engine.on_event(&ids.other("numeral_base_changed"));
        engine.on_event(&ids.display_changed(edit.sequence_id, display("7")));

        assert_eq!(texts(&engine.states(true)), vec!["7"]);
    }

    #[test]
    fn test_repeated_display_in_same_session_adds_again() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();

        let edit = ids.editor_changed(editor("1/3"));
        engine.on_event(&edit);
        engine.on_event(&ids.display_changed(edit.sequence_id, display("0.33")));
        engine.on_event(&ids.display_changed(edit.sequence_id, display("0.3333")));

        let states = engine.states(true);
        assert_eq!(states.len(), 2);
        assert_eq!(states[1].display, Some(display("0.3333")));
    }

    #[test]
    fn test_add_state_none_is_noop() {
        let engine = HistoryEngine::default();
        engine.add_state(None);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_listener_notified_for_event_and_direct_add() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        engine.add_listener(Arc::new(move |event: &HistoryEvent| {
            let HistoryEvent::StateAdded(state) = event;
            sink.lock().push(state.editor.text.clone());
        }));

        calculate(&engine, &ids, "1+1", "2");
        engine.add_state(Some(HistoryState::new(editor("manual"), None)));
        engine.add_state(None);

        assert_eq!(*seen.lock(), vec!["1+1", "manual"]);
    }

    #[test]
    fn test_listener_may_call_back_into_engine() {
        let engine = Arc::new(HistoryEngine::default());
        let ids = EventIdGenerator::new();
        let observed_len = Arc::new(Mutex::new(0usize));

        let weak = Arc::downgrade(&engine);
        let sink = Arc::clone(&observed_len);
        engine.add_listener(Arc::new(move |_: &HistoryEvent| {
            if let Some(engine) = weak.upgrade() {
                *sink.lock() = engine.states(true).len();
            }
        }));

        calculate(&engine, &ids, "8-3", "5");
        assert_eq!(*observed_len.lock(), 1);
    }

    #[test]
    fn test_undo_redo_through_engine() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();
        calculate(&engine, &ids, "1", "1");
        calculate(&engine, &ids, "2", "2");

        assert!(engine.is_undo_available());
        assert!(!engine.is_redo_available());
        let current = engine.last_state();
        let undone = engine.undo(current.as_ref()).expect("undo");
        assert_eq!(undone.editor_text(), "1");

        assert!(engine.is_action_available(HistoryAction::Redo));
        let redone = engine
            .do_action(HistoryAction::Redo, Some(&undone))
            .expect("redo");
        assert_eq!(Some(redone), current);
    }

    #[test]
    fn test_clear_keeps_saved_history() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();
        calculate(&engine, &ids, "9", "9");
        let state = engine.last_state().expect("state");
        engine.add_saved_state(&state);

        engine.clear();
        assert!(engine.is_empty());
        assert_eq!(engine.saved_history().len(), 1);
    }

    #[test]
    fn test_capacity_from_config() {
        let engine = HistoryEngine::new(HistoryConfig {
            max_states: 2,
            include_intermediate: false,
        });
        let ids = EventIdGenerator::new();
        for n in ["10", "20", "30"] {
            calculate(&engine, &ids, n, n);
        }
        assert_eq!(texts(&engine.states(true)), vec!["20", "30"]);
    }

    #[test]
    fn test_saved_history_round_trip_through_engine() {
        let engine = HistoryEngine::default();
        let ids = EventIdGenerator::new();
        calculate(&engine, &ids, "2^10", "1024");
        calculate(&engine, &ids, "sqrt(16)", "4");
        for state in engine.states(true) {
            engine.add_saved_state(&state);
        }
        let first_id = engine.saved_history()[0].id().expect("id");
        assert!(engine.set_saved_description(first_id, Some("power".to_string())));

        let exported = engine.export_saved_history().expect("export");

        let fresh = HistoryEngine::default();
        fresh.import_saved_history(&exported).expect("import");
        let restored = fresh.saved_history();
        assert_eq!(texts(&restored), vec!["2^10", "sqrt(16)"]);
        assert_eq!(restored[0].description.as_deref(), Some("power"));
        assert!(restored.iter().all(HistoryState::is_saved));
    }

    #[test]
    fn test_import_malformed_is_reported_and_keeps_entries() {
        let engine = HistoryEngine::default();
        engine.add_saved_state(&HistoryState::new(editor("1"), None));

        let err = engine.import_saved_history("{").unwrap_err();
        assert!(err.is_malformed_data());
        assert_eq!(engine.saved_history().len(), 1);
    }

    #[test]
    fn test_remove_and_clear_saved_history() {
        let engine = HistoryEngine::default();
        let a = engine.add_saved_state(&HistoryState::new(editor("a"), None));
        engine.add_saved_state(&HistoryState::new(editor("b"), None));

        assert!(engine.remove_saved_history(&a));
        assert!(!engine.remove_saved_history(&a));
        assert_eq!(texts(&engine.saved_history()), vec!["b"]);

        engine.clear_saved_history();
        assert!(engine.saved_history().is_empty());
    }

    #[test]
    fn test_engine_as_event_sink() {
        let engine = Arc::new(HistoryEngine::default());
        let sink: Arc<dyn EventSink> = engine.clone();
        let ids = EventIdGenerator::new();

        let edit = ids.editor_changed(editor("4/2"));
        sink.on_event(&edit);
        sink.on_event(&ids.display_changed(edit.sequence_id, display("2")));

        assert_eq!(texts(&engine.states(true)), vec!["4/2"]);
    }

    #[test]
    fn test_listeners_follow_stack_order_across_threads() {
        use std::sync::Barrier;
        use std::thread;

        let engine = Arc::new(HistoryEngine::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let sink = Arc::clone(&seen);
        let (in_first, out_first) = (Arc::clone(&entered), Arc::clone(&release));
        engine.add_listener(Arc::new(move |event: &HistoryEvent| {
            let HistoryEvent::StateAdded(state) = event;
            if state.editor_text() == "first" {
                in_first.wait();
                out_first.wait();
            }
            sink.lock().push(state.editor.text.clone());
        }));

        let first = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.add_state(Some(HistoryState::new(editor("first"), None)));
            })
        };

        // "first" is on the stack and its listener is blocked.
        entered.wait();
        engine.add_state(Some(HistoryState::new(editor("second"), None)));
        release.wait();
        first.join().expect("join");

        assert_eq!(texts(&engine.states(true)), vec!["first", "second"]);
        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_listing_uses_configured_filter() {
        let ids = EventIdGenerator::new();
        let compact = HistoryEngine::default();
        let full = HistoryEngine::new(HistoryConfig {
            include_intermediate: true,
            ..HistoryConfig::default()
        });
        for engine in [&compact, &full] {
            for t in ["1", "1+", "1+2", "1+23"] {
                calculate(engine, &ids, t, t);
            }
        }

        assert_eq!(texts(&compact.listing()), vec!["1", "1+23"]);
        assert_eq!(texts(&full.listing()), vec!["1", "1+", "1+2", "1+23"]);
    }
}
