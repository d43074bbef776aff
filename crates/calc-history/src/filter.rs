//! Elision of keystroke-by-keystroke states from display listings.
use crate::state::HistoryState;

/// Whether `earlier` is one keystroke away from `later`.
///
/// True when the lengths differ by at most one char and the shorter text is
/// a prefix of the longer one.
pub fn is_intermediate(later: &str, earlier: &str) -> bool {
    let later_len = later.chars().count();
    let earlier_len = earlier.chars().count();

    if later_len.abs_diff(earlier_len) > 1 {
        return false;
    }

    if later_len > earlier_len {
        later.starts_with(earlier)
    } else {
        earlier.starts_with(later)
    }
}

/// Returns `states` without the entries that sit inside a typing run.
///
/// Walks newest to oldest. An entry is dropped when it is intermediate to the
/// entry after it and the entry before it is intermediate to it, so the first
/// and last entry of every run survive. Order is preserved and the input is
/// not modified.
pub fn without_intermediate(states: &[HistoryState]) -> Vec<HistoryState> {
    let mut kept = Vec::with_capacity(states.len());

    for (idx, state) in states.iter().enumerate().rev() {
        let later = states.get(idx + 1);
        let earlier = idx.checked_sub(1).and_then(|i| states.get(i));

        let inside_run = match (later, earlier) {
            (Some(later), Some(earlier)) => {
                is_intermediate(later.editor_text(), state.editor_text())
                    && is_intermediate(state.editor_text(), earlier.editor_text())
            }
            _ => false,
        };

        if !inside_run {
            kept.push(state.clone());
        }
    }

    kept.reverse();
    kept
}
