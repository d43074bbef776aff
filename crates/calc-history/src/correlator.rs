//! Causal ordering of incoming envelopes.
use crate::event::EventEnvelope;

/// Outcome of comparing an envelope against the last committed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correlation {
    /// The envelope is newer than anything committed so far.
    pub is_newer: bool,
    /// The envelope continues the session of the last committed envelope.
    pub is_same_session: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    sequence_id: u64,
    session_id: Option<u64>,
}

/// Remembers the last processed envelope and classifies new ones against it.
///
/// Deciding and recording are split: call [`correlate`](Self::correlate),
/// act on the result, then [`commit`](Self::commit) the envelope.
#[derive(Debug, Default)]
pub struct EventCorrelator {
    last: Option<LastSeen>,
}

impl EventCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `envelope`. Has no side effects.
    pub fn correlate(&self, envelope: &EventEnvelope) -> Correlation {
        let Some(last) = self.last else {
            return Correlation {
                is_newer: true,
                is_same_session: false,
            };
        };

        let is_newer = envelope.sequence_id > last.sequence_id;
        let is_same_session = is_newer
            && matches!(
                (envelope.session_id, last.session_id),
                (Some(incoming), Some(previous)) if incoming == previous
            );

        Correlation {
            is_newer,
            is_same_session,
        }
    }

    /// Records `envelope` as the last seen one.
    ///
    /// Stale envelopes are ignored so the committed sequence id never moves
    /// backwards.
    pub fn commit(&mut self, envelope: &EventEnvelope) {
        if !self.correlate(envelope).is_newer {
            return;
        }
        self.last = Some(LastSeen {
            sequence_id: envelope.sequence_id,
            session_id: envelope.session_id,
        });
    }

    /// Sequence id of the last committed envelope.
    pub fn last_sequence_id(&self) -> Option<u64> {
        self.last.map(|last| last.sequence_id)
    }
}
