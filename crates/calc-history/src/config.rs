//! Configuration for the history engine.
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of states kept on the undo/redo stack.
/// Oldest states are evicted when this limit is exceeded.
const DEFAULT_MAX_STATES: usize = 100;

/// Environment variable overriding [`HistoryConfig::max_states`].
pub const MAX_STATES_ENV: &str = "CALC_HISTORY_MAX_STATES";

/// Configuration for the history engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Max states on the undo/redo stack.
    pub max_states: usize,
    /// Whether [`HistoryEngine::listing`](crate::HistoryEngine::listing) includes
    /// intermediate states.
    pub include_intermediate: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_states: DEFAULT_MAX_STATES,
            include_intermediate: false,
        }
    }
}

impl HistoryConfig {
    /// Defaults, with `CALC_HISTORY_MAX_STATES` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Loads config from a JSON file at `path`, then applies the environment
    /// override. Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HistoryConfig>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse history config at {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read history config at {}: {e}", path.display());
                Self::default()
            }
        };
        config.apply_env();
        config.sanitize();
        config
    }

    /// Clamps values into their valid ranges.
    pub fn sanitize(&mut self) {
        if self.max_states == 0 {
            self.max_states = 1;
        }
    }

    fn apply_env(&mut self) {
        let Ok(raw) = std::env::var(MAX_STATES_ENV) else {
            return;
        };
        match raw.trim().parse::<usize>() {
            Ok(value) => {
                self.max_states = value;
                self.sanitize();
            }
            Err(e) => tracing::warn!("Ignoring {MAX_STATES_ENV}={raw:?}: {e}"),
        }
    }
}
