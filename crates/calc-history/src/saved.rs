//! Saved (user-kept) history entries with stable ids.
use crate::state::HistoryState;

/// Ordered collection of saved states.
///
/// Owns the id counter: ids are assigned on promotion and on import, strictly
/// increase over the life of the store, and are never reused after a removal
/// or a clear. The counter is instance state and is not persisted.
///
/// Holds no lock of its own; the owner serializes access.
#[derive(Debug)]
pub struct SavedHistoryStore {
    states: Vec<HistoryState>,
    /// Last id handed out; the next one is `last_id + 1`.
    last_id: u64,
}

impl Default for SavedHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SavedHistoryStore {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            last_id: 0,
        }
    }

    /// Saved states in insertion order.
    pub fn states(&self) -> &[HistoryState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Looks up a saved state by id.
    pub fn get(&self, id: u64) -> Option<&HistoryState> {
        self.states.iter().find(|s| s.id() == Some(id))
    }

    /// Saves a copy of `state` under a fresh id and returns that copy.
    ///
    /// A state that is already saved is returned unchanged and the store
    /// does not grow.
    pub fn add_saved(&mut self, state: &HistoryState) -> HistoryState {
        if state.is_saved() {
            return state.clone();
        }

        let saved = state.promote(self.next_id());
        tracing::debug!(id = ?saved.id(), text = saved.editor_text(), "Saved history entry");
        self.states.push(saved.clone());
        saved
    }

    /// Removes the saved entry with the same id as `state`.
    ///
    /// Returns whether anything was removed. Transient states match nothing.
    pub fn remove(&mut self, state: &HistoryState) -> bool {
        let Some(id) = state.id() else {
            return false;
        };
        let before = self.states.len();
        self.states.retain(|s| s.id() != Some(id));
        before != self.states.len()
    }

    /// Replaces the description of the saved entry `id`.
    pub fn set_description(&mut self, id: u64, description: Option<String>) -> bool {
        match self.states.iter_mut().find(|s| s.id() == Some(id)) {
            Some(state) => {
                state.description = description;
                true
            }
            None => false,
        }
    }

    /// Drops every entry. The id counter keeps running.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Replaces the whole contents with `states`, assigning fresh ids in order.
    ///
    /// Any id already carried by the incoming states is ignored.
    pub fn replace_all(&mut self, states: Vec<HistoryState>) {
        self.states.clear();
        for state in states {
            let id = self.next_id();
            self.states.push(state.promote(id));
        }
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}
