//! Playback reporting token cache.
//!
//! The remote service hands out a reporting token with each stream. Playback
//! transitions for that stream are reported with the token; the server may
//! rotate it in the response. Entries are dropped as soon as a terminal
//! transition (ended / switched to next) has been reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Last playback state reported for a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    None,
    Playing,
    Paused,
    SwitchedToNext,
    Ended,
}

impl PlaybackState {
    /// Terminal states end the stream's reporting session.
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackState::SwitchedToNext | PlaybackState::Ended)
    }
}

/// One state transition to send to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub url: String,
    pub token: String,
    pub previous: PlaybackState,
    pub current: PlaybackState,
}

/// Per-stream reporting state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingEntry {
    pub token: String,
    pub last_state: PlaybackState,
}

/// Stream URL -> reporting entry.
#[derive(Debug, Clone, Default)]
pub struct ReportingCache {
    entries: HashMap<String, ReportingEntry>,
}

impl ReportingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&ReportingEntry> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `url` has an entry with a usable token.
    pub fn can_report(&self, url: &str) -> bool {
        self.entries
            .get(url)
            .is_some_and(|entry| !entry.token.is_empty())
    }

    /// Insert or overwrite the token for `url`. A new entry starts at
    /// [`PlaybackState::None`]; an existing entry keeps its last state.
    pub fn record_token(&mut self, url: &str, token: &str) {
        self.entries
            .entry(url.to_string())
            .and_modify(|entry| entry.token = token.to_string())
            .or_insert_with(|| ReportingEntry {
                token: token.to_string(),
                last_state: PlaybackState::None,
            });
    }

    /// Update the last-known state of `url` and build the report to send.
    ///
    /// Returns `None` when the stream cannot be reported or the state did
    /// not change.
    pub fn record_state(&mut self, url: &str, state: PlaybackState) -> Option<PlaybackReport> {
        if !self.can_report(url) {
            return None;
        }
        let entry = self.entries.get_mut(url)?;
        if entry.last_state == state {
            return None;
        }
        let previous = entry.last_state;
        entry.last_state = state;
        Some(PlaybackReport {
            url: url.to_string(),
            token: entry.token.clone(),
            previous,
            current: state,
        })
    }

    /// Apply the outcome of a report: drop the entry on a terminal
    /// transition, otherwise adopt a rotated token.
    pub fn on_report_completed(&mut self, url: &str, new_token: &str, terminal: bool) {
        if terminal {
            self.entries.remove(url);
            return;
        }
        if new_token.is_empty() {
            return;
        }
        if let Some(entry) = self.entries.get_mut(url) {
            entry.token = new_token.to_string();
        }
    }
}
