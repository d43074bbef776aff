//! Subcommand implementations. Each returns the text to print.
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use calc_history::{EventEnvelope, HistoryConfig, HistoryEngine, HistoryEvent, HistoryState};

/// Options for `calc-history replay`.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// List intermediate states too (overrides the config).
    pub all: bool,
    /// Promote the listed states into saved history.
    pub save: bool,
    /// Write the exported saved history here.
    pub export: Option<std::path::PathBuf>,
}

/// Feeds the envelopes in `events_path` through a fresh engine and lists the
/// resulting history.
pub fn replay(
    events_path: &Path,
    config: &HistoryConfig,
    options: &ReplayOptions,
) -> Result<String> {
    let raw = std::fs::read_to_string(events_path)
        .with_context(|| format!("Failed to read event log: {}", events_path.display()))?;
    let envelopes: Vec<EventEnvelope> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse event log: {}", events_path.display()))?;

    let engine = HistoryEngine::new(config.clone());
    let added = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&added);
    engine.add_listener(Arc::new(move |event: &HistoryEvent| {
        let HistoryEvent::StateAdded(state) = event;
        tracing::info!(text = state.editor_text(), "Recorded calculation");
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    for envelope in &envelopes {
        engine.on_event(envelope);
    }

    let listed = if options.all {
        engine.states(true)
    } else {
        engine.listing()
    };

    let mut out = String::new();
    writeln!(
        out,
        "Replayed {} events, recorded {} calculations, listing {}:",
        envelopes.len(),
        added.load(Ordering::Relaxed),
        listed.len()
    )?;
    for state in &listed {
        writeln!(out, "  {}", render_state(state))?;
    }

    if options.save {
        for state in &listed {
            engine.add_saved_state(state);
        }
        writeln!(out, "Saved {} entries.", engine.saved_history().len())?;
    }

    if let Some(path) = &options.export {
        let exported = engine
            .export_saved_history()
            .context("Failed to export saved history")?;
        std::fs::write(path, exported)
            .with_context(|| format!("Failed to write saved history: {}", path.display()))?;
        writeln!(out, "Exported saved history to {}", path.display())?;
    }

    Ok(out)
}

/// Imports an exported saved-history file and lists it with fresh ids.
pub fn inspect(saved_path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(saved_path)
        .with_context(|| format!("Failed to read saved history: {}", saved_path.display()))?;

    let engine = HistoryEngine::default();
    engine
        .import_saved_history(&raw)
        .with_context(|| format!("Malformed saved history: {}", saved_path.display()))?;

    let saved = engine.saved_history();
    let mut out = String::new();
    writeln!(out, "{} saved entries:", saved.len())?;
    for state in &saved {
        let id = state.id().unwrap_or_default();
        write!(out, "  #{id} {}", render_state(state))?;
        if let Some(description) = &state.description {
            write!(out, "  ({description})")?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

/// One-line rendering: `input = result`, `input = <error>` or just `input`.
fn render_state(state: &HistoryState) -> String {
    match &state.display {
        Some(display) if display.valid => format!("{} = {}", state.editor.text, display.text),
        Some(display) => format!(
            "{} = <{}>",
            state.editor.text,
            display.error_message.as_deref().unwrap_or("error")
        ),
        None => state.editor.text.clone(),
    }
}
