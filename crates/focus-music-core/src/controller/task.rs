//! Fetch-or-retry loop for one request.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::request::RequestId;
use super::{lock, ControllerEvent, Shared};
use crate::client::{ClientError, MusicClient, QueueTrack};
use crate::retry::{classify, Classification, RetryDecision, RetryPolicy};

#[derive(Debug)]
enum Fetch {
    Prepare,
    Next(String),
}

/// Everything a request task needs; runs until the request resolves or the
/// task is aborted by a newer request, a cancel, or controller teardown.
pub(super) struct RequestTask {
    pub(super) id: RequestId,
    pub(super) playlist_id: String,
    pub(super) shared: Arc<Mutex<Shared>>,
    pub(super) client: Arc<dyn MusicClient>,
    pub(super) policy: RetryPolicy,
    pub(super) events: broadcast::Sender<ControllerEvent>,
}

impl RequestTask {
    pub(super) async fn run(self) {
        loop {
            let Some((fetch, filter_explicit)) = self.plan() else {
                return;
            };

            debug!(request = self.id, playlist = %self.playlist_id, ?fetch, "fetching track");
            let result = match &fetch {
                Fetch::Prepare => self.client.prepare(&self.playlist_id).await,
                Fetch::Next(queue_id) => self.client.next(queue_id).await,
            };

            match self.settle(result, filter_explicit) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return,
            }
        }
    }

    /// Pick prepare vs next from the cursor. `None` once this request is no
    /// longer the active one.
    fn plan(&self) -> Option<(Fetch, bool)> {
        let shared = lock(&self.shared);
        if !shared.is_active(self.id) {
            return None;
        }
        let fetch = if shared.cursor.needs_prepare(&self.playlist_id) {
            Fetch::Prepare
        } else {
            Fetch::Next(shared.cursor.last_queue_id().to_string())
        };
        Some((fetch, shared.filter_explicit))
    }

    /// Apply a fetch result. Returns the delay before the next attempt, or
    /// `None` when the request has been resolved.
    fn settle(
        &self,
        result: Result<QueueTrack, ClientError>,
        filter_explicit: bool,
    ) -> Option<Duration> {
        let mut shared = lock(&self.shared);
        if !shared.is_active(self.id) {
            return None;
        }

        let class = match result {
            Ok(queued) => {
                shared
                    .cursor
                    .record_success(&self.playlist_id, &queued.queue_id);
                if filter_explicit && queued.track.explicit {
                    debug!(request = self.id, title = %queued.track.title, "explicit track filtered");
                    Classification::FilteredContent
                } else {
                    shared.retry.reset();
                    if let Some(token) = queued.track.playback_reporting_token.as_deref() {
                        shared
                            .reporting
                            .record_token(&queued.track.stream_url, token);
                    }
                    let active = shared.take_active(self.id);
                    drop(shared);
                    info!(
                        request = self.id,
                        queue = %queued.queue_id,
                        title = %queued.track.title,
                        "next track ready"
                    );
                    if let Some(active) = active {
                        let _ = active.reply.send(Some(queued.track));
                    }
                    return None;
                }
            }
            Err(e) => {
                let class = classify(&e);
                warn!(request = self.id, error = %e, ?class, "track fetch failed");
                class
            }
        };

        let retry_index = shared.retry.retry_index();
        match self.policy.decide(class, retry_index) {
            RetryDecision::Stop => {
                shared.retry.reset();
                let active = shared.take_active(self.id);
                drop(shared);
                info!(request = self.id, ?class, retry_index, "giving up on next track");
                if class == Classification::Forbidden {
                    let _ = self.events.send(ControllerEvent::NoPremiumSubscription);
                }
                if let Some(active) = active {
                    let _ = active.reply.send(None);
                }
                None
            }
            RetryDecision::RetryAfter(delay) => {
                shared.retry.record_retry();
                debug!(request = self.id, ?class, retry_index, ?delay, "retrying next track");
                Some(delay)
            }
        }
    }
}
