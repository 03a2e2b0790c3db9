//! Next-track controller.
//!
//! Owns the single in-flight track request, the queue cursor, the retry
//! state and the playback reporting cache. Each request runs as one Tokio
//! task that alternates between a fetch and, on a retryable failure, a retry
//! timer. Starting a new request, cancelling a [`TrackRequest`] or dropping
//! the controller aborts that task, which cancels the pending fetch or timer.

mod request;
mod task;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use crate::client::MusicClient;
use crate::config::FocusMusicConfig;
use crate::cursor::QueueCursor;
use crate::reporting::{PlaybackState, ReportingCache};
use crate::retry::{RetryPolicy, RetryState};

use request::ActiveRequest;
use task::RequestTask;

pub use request::{RequestId, TrackRequest};

/// Side-channel notifications, separate from track results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The service refused the request because the account has no premium
    /// subscription. The request itself resolves with `None`.
    NoPremiumSubscription,
}

const EVENT_CAPACITY: usize = 16;

/// State shared between the controller, request handles and the request task.
pub(crate) struct Shared {
    cursor: QueueCursor,
    retry: RetryState,
    reporting: ReportingCache,
    filter_explicit: bool,
    active: Option<ActiveRequest>,
    next_id: RequestId,
}

impl Shared {
    fn is_active(&self, id: RequestId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == id)
    }

    fn take_active(&mut self, id: RequestId) -> Option<ActiveRequest> {
        if self.is_active(id) {
            self.active.take()
        } else {
            None
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fetches the next track of a playlist with bounded retries.
///
/// Must be used from within a Tokio runtime.
pub struct TrackController {
    shared: Arc<Mutex<Shared>>,
    client: Arc<dyn MusicClient>,
    policy: RetryPolicy,
    events: broadcast::Sender<ControllerEvent>,
}

impl TrackController {
    /// Create a controller using the retry policy and filter from `config`.
    pub fn new(client: Arc<dyn MusicClient>, config: &FocusMusicConfig) -> Self {
        Self::with_policy(client, config.retry_policy(), config.filter_explicit)
    }

    pub fn with_policy(
        client: Arc<dyn MusicClient>,
        policy: RetryPolicy,
        filter_explicit: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Mutex::new(Shared {
                cursor: QueueCursor::new(),
                retry: RetryState::default(),
                reporting: ReportingCache::new(),
                filter_explicit,
                active: None,
                next_id: 1,
            })),
            client,
            policy,
            events,
        }
    }

    /// Ask for the next track of `playlist_id`.
    ///
    /// A request that is still pending is resolved with `None` and its fetch
    /// or retry timer is cancelled before the new one starts.
    pub fn request_next_track(&self, playlist_id: &str) -> TrackRequest {
        let (tx, rx) = oneshot::channel();
        let mut shared = lock(&self.shared);

        if let Some(previous) = shared.active.take() {
            debug!(request = previous.id, "track request superseded");
            previous.abandon();
        }
        shared.retry.reset();

        let id = shared.next_id;
        shared.next_id += 1;
        shared.active = Some(ActiveRequest {
            id,
            reply: tx,
            task: None,
        });

        let task = RequestTask {
            id,
            playlist_id: playlist_id.to_string(),
            shared: Arc::clone(&self.shared),
            client: Arc::clone(&self.client),
            policy: self.policy,
            events: self.events.clone(),
        };
        // The task cannot observe `active` until the lock is released, so
        // the handle is always stored before the task runs.
        let handle = tokio::spawn(task.run());
        if let Some(active) = shared.active.as_mut() {
            active.task = Some(handle);
        }
        drop(shared);

        debug!(request = id, playlist = playlist_id, "track request started");
        TrackRequest::new(id, rx, Arc::downgrade(&self.shared))
    }

    /// Report a playback transition for `url`.
    ///
    /// Best effort: nothing is sent when the stream has no reporting token or
    /// the state did not change, and failures are logged and dropped. A
    /// terminal transition removes the stream's entry even if its report
    /// failed.
    pub async fn report_playback(&self, url: &str, state: PlaybackState) {
        let report = lock(&self.shared).reporting.record_state(url, state);
        let Some(report) = report else {
            debug!(url, ?state, "no playback report to send");
            return;
        };

        let terminal = state.is_terminal();
        match self.client.report_playback(&report).await {
            Ok(new_token) => {
                lock(&self.shared).reporting.on_report_completed(
                    url,
                    new_token.as_deref().unwrap_or(""),
                    terminal,
                );
                debug!(url, ?state, "playback reported");
            }
            Err(e) => {
                warn!(url, ?state, error = %e, "playback report failed");
                if terminal {
                    lock(&self.shared)
                        .reporting
                        .on_report_completed(url, "", true);
                }
            }
        }
    }

    /// Subscribe to side-channel events.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn set_filter_explicit(&self, filter_explicit: bool) {
        lock(&self.shared).filter_explicit = filter_explicit;
    }

    pub fn filter_explicit(&self) -> bool {
        lock(&self.shared).filter_explicit
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries performed so far by the in-flight request.
    pub fn retry_index(&self) -> u32 {
        lock(&self.shared).retry.retry_index()
    }

    /// Snapshot of the queue cursor.
    pub fn cursor(&self) -> QueueCursor {
        lock(&self.shared).cursor.clone()
    }

    pub fn has_pending_request(&self) -> bool {
        lock(&self.shared).active.is_some()
    }

    pub fn can_report(&self, url: &str) -> bool {
        lock(&self.shared).reporting.can_report(url)
    }
}

impl Drop for TrackController {
    fn drop(&mut self) {
        let active = lock(&self.shared).active.take();
        if let Some(active) = active {
            debug!(request = active.id, "controller dropped with pending request");
            active.abandon();
        }
    }
}

#[cfg(test)]
mod tests;
