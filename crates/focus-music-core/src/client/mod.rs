//! Remote music service seam.
//!
//! The controller only talks to the service through [`MusicClient`]. The
//! concrete HTTP client lives outside this crate; [`ScriptedClient`] is a
//! deterministic implementation for tests and the `simulate` command.

mod scripted;
mod types;

use async_trait::async_trait;

use crate::reporting::PlaybackReport;

pub use scripted::{
    ClientCall, RecordedCall, Scenario, ScenarioError, ScenarioRequest, ScriptedClient,
    ScriptedFetch,
};
pub use types::{QueueTrack, Track};

/// Error returned by a single remote call. Classified by
/// [`crate::retry::classify()`] before any retry decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Server answered with a non-2xx status.
    #[error("HTTP {status}")]
    Http { status: u16 },
    /// Transport failure (DNS, connection reset, timeout).
    #[error("network: {0}")]
    Network(String),
    /// Response could not be turned into a playable track.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Single-shot operations offered by the remote music service.
#[async_trait]
pub trait MusicClient: Send + Sync {
    /// Create a playback queue for `playlist_id` and return its first track.
    async fn prepare(&self, playlist_id: &str) -> Result<QueueTrack, ClientError>;

    /// Advance an existing queue and return its next track.
    async fn next(&self, queue_id: &str) -> Result<QueueTrack, ClientError>;

    /// Report a playback state transition. Returns a rotated reporting token
    /// when the server issues one.
    async fn report_playback(
        &self,
        report: &PlaybackReport,
    ) -> Result<Option<String>, ClientError>;
}
