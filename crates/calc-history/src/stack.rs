//! Linear undo/redo history of calculation states.
//!
//! States are kept oldest first with a cursor on the current one. Adding a
//! state after undoing prunes everything past the cursor; there is no redo
//! tree.
use crate::filter;
use crate::state::HistoryState;

/// Navigation actions understood by [`UndoRedoStack::do_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Bounded undo/redo stack.
///
/// Holds no lock of its own; the owner serializes access.
pub struct UndoRedoStack {
    /// All reachable states, oldest first.
    states: Vec<HistoryState>,
    /// Index of the current state, `None` while empty.
    cursor: Option<usize>,
    /// Max number of states retained; the oldest are evicted beyond it.
    capacity: usize,
}

impl std::fmt::Debug for UndoRedoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoRedoStack")
            .field("len", &self.states.len())
            .field("cursor", &self.cursor)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl UndoRedoStack {
    /// Creates an empty stack holding at most `capacity` states (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            states: Vec::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The state under the cursor.
    pub fn last(&self) -> Option<&HistoryState> {
        self.cursor.and_then(|idx| self.states.get(idx))
    }

    pub fn is_undo_available(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx > 0)
    }

    pub fn is_redo_available(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx + 1 < self.states.len())
    }

    /// Moves the cursor one step back and returns the state there.
    ///
    /// `current` is the caller's live state. It is not pushed; navigation is
    /// purely positional. Returns `None` at the oldest state.
    pub fn undo(&mut self, current: Option<&HistoryState>) -> Option<HistoryState> {
        if !self.is_undo_available() {
            return None;
        }
        let idx = self.cursor? - 1;
        self.cursor = Some(idx);
        tracing::trace!(
            cursor = idx,
            live = ?current.map(HistoryState::editor_text),
            "undo"
        );
        self.states.get(idx).cloned()
    }

    /// Moves the cursor one step forward and returns the state there.
    ///
    /// Returns `None` at the newest state.
    pub fn redo(&mut self, current: Option<&HistoryState>) -> Option<HistoryState> {
        if !self.is_redo_available() {
            return None;
        }
        let idx = self.cursor? + 1;
        self.cursor = Some(idx);
        tracing::trace!(
            cursor = idx,
            live = ?current.map(HistoryState::editor_text),
            "redo"
        );
        self.states.get(idx).cloned()
    }

    pub fn is_action_available(&self, action: HistoryAction) -> bool {
        match action {
            HistoryAction::Undo => self.is_undo_available(),
            HistoryAction::Redo => self.is_redo_available(),
        }
    }

    pub fn do_action(
        &mut self,
        action: HistoryAction,
        current: Option<&HistoryState>,
    ) -> Option<HistoryState> {
        match action {
            HistoryAction::Undo => self.undo(current),
            HistoryAction::Redo => self.redo(current),
        }
    }

    /// Appends `state` after the cursor and makes it current.
    ///
    /// Redo-able states past the cursor are discarded. When the stack grows
    /// past capacity the oldest states are evicted.
    pub fn add_state(&mut self, state: HistoryState) {
        if let Some(idx) = self.cursor {
            self.states.truncate(idx + 1);
        }
        self.states.push(state);

        if self.states.len() > self.capacity {
            let excess = self.states.len() - self.capacity;
            self.states.drain(..excess);
        }
        self.cursor = Some(self.states.len() - 1);
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.cursor = None;
    }

    /// All stored states, oldest first, optionally without intermediate ones.
    pub fn states(&self, include_intermediate: bool) -> Vec<HistoryState> {
        if include_intermediate {
            self.states.clone()
        } else {
            filter::without_intermediate(&self.states)
        }
    }
}
