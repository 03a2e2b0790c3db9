//! Deterministic client that replays queued responses.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;

use super::{ClientError, MusicClient, QueueTrack, Track};
use crate::reporting::{PlaybackReport, PlaybackState};

/// A call observed by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Prepare { playlist_id: String },
    Next { queue_id: String },
    Report(PlaybackReport),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: ClientCall,
    pub at: Instant,
}

type FetchResult = Result<QueueTrack, ClientError>;

/// Replays scripted fetch and report responses in order.
///
/// When the fetch script runs dry the fallback response is used, or a
/// network error if none is set. Report responses default to `Ok(None)`.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    fetches: Mutex<VecDeque<FetchResult>>,
    fallback: Option<FetchResult>,
    reports: Mutex<VecDeque<Result<Option<String>, ClientError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Duration,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that answers every fetch with `response`.
    pub fn always(response: FetchResult) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// Simulated round-trip time for every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_fetch(self, response: FetchResult) -> Self {
        lock(&self.fetches).push_back(response);
        self
    }

    pub fn push_track(self, queue_id: &str, track: Track) -> Self {
        self.push_fetch(Ok(QueueTrack {
            queue_id: queue_id.to_string(),
            track,
        }))
    }

    pub fn push_error(self, error: ClientError) -> Self {
        self.push_fetch(Err(error))
    }

    pub fn push_report(self, response: Result<Option<String>, ClientError>) -> Self {
        lock(&self.reports).push_back(response);
        self
    }

    /// Snapshot of every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of prepare/next calls made so far.
    pub fn fetch_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| !matches!(c.call, ClientCall::Report(_)))
            .count()
    }

    fn record(&self, call: ClientCall) {
        lock(&self.calls).push(RecordedCall {
            call,
            at: Instant::now(),
        });
    }

    async fn next_fetch(&self) -> FetchResult {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let scripted = lock(&self.fetches).pop_front();
        scripted
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(ClientError::Network("script exhausted".to_string())))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl MusicClient for ScriptedClient {
    async fn prepare(&self, playlist_id: &str) -> Result<QueueTrack, ClientError> {
        self.record(ClientCall::Prepare {
            playlist_id: playlist_id.to_string(),
        });
        self.next_fetch().await
    }

    async fn next(&self, queue_id: &str) -> Result<QueueTrack, ClientError> {
        self.record(ClientCall::Next {
            queue_id: queue_id.to_string(),
        });
        self.next_fetch().await
    }

    async fn report_playback(
        &self,
        report: &PlaybackReport,
    ) -> Result<Option<String>, ClientError> {
        self.record(ClientCall::Report(report.clone()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let scripted = lock(&self.reports).pop_front();
        scripted.unwrap_or(Ok(None))
    }
}

/// Failure loading a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("reading scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One scripted fetch response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedFetch {
    Track { queue_id: String, track: Track },
    HttpError { status: u16 },
    NetworkError { message: String },
    Malformed { message: String },
}

impl ScriptedFetch {
    pub fn into_result(self) -> Result<QueueTrack, ClientError> {
        match self {
            ScriptedFetch::Track { queue_id, track } => Ok(QueueTrack { queue_id, track }),
            ScriptedFetch::HttpError { status } => Err(ClientError::Http { status }),
            ScriptedFetch::NetworkError { message } => Err(ClientError::Network(message)),
            ScriptedFetch::Malformed { message } => Err(ClientError::Malformed(message)),
        }
    }
}

/// A next-track request to replay, with the playback states to report for
/// the delivered track.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRequest {
    pub playlist_id: String,
    #[serde(default)]
    pub report: Vec<PlaybackState>,
}

/// A scripted session: the requests to issue and the server's responses.
///
/// ```toml
/// requests = [{ playlist_id = "jazz", report = ["playing", "ended"] }]
///
/// [[fetches]]
/// kind = "http_error"
/// status = 503
///
/// [[fetches]]
/// kind = "track"
/// queue_id = "q42"
/// track = { title = "So What", stream_url = "https://example.com/1" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub requests: Vec<ScenarioRequest>,
    #[serde(default)]
    pub fetches: Vec<ScriptedFetch>,
    /// Overrides the configured explicit filter when set.
    #[serde(default)]
    pub filter_explicit: Option<bool>,
}

impl Scenario {
    pub fn from_toml_str(s: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    /// Build a client that replays this scenario's fetches.
    pub fn client(&self) -> ScriptedClient {
        self.fetches
            .iter()
            .cloned()
            .fold(ScriptedClient::new(), |client, fetch| {
                client.push_fetch(fetch.into_result())
            })
    }
}
