//! Caller-side handle for one next-track request.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, Weak};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{lock, Shared};
use crate::client::Track;

/// Identifier of a request within one controller.
pub type RequestId = u64;

/// Controller-side record of the single in-flight request.
pub(super) struct ActiveRequest {
    pub(super) id: RequestId,
    pub(super) reply: oneshot::Sender<Option<Track>>,
    pub(super) task: Option<JoinHandle<()>>,
}

impl ActiveRequest {
    /// Stop the request task (and its retry timer) and resolve the caller.
    pub(super) fn abandon(self) {
        if let Some(task) = self.task {
            task.abort();
        }
        let _ = self.reply.send(None);
    }
}

/// Handle returned by [`super::TrackController::request_next_track`].
///
/// Resolves exactly once: with the track, or with `None` when the request
/// failed, was superseded by a newer request, was cancelled, or the
/// controller was dropped.
pub struct TrackRequest {
    id: RequestId,
    reply: oneshot::Receiver<Option<Track>>,
    shared: Weak<Mutex<Shared>>,
}

impl TrackRequest {
    pub(super) fn new(
        id: RequestId,
        reply: oneshot::Receiver<Option<Track>>,
        shared: Weak<Mutex<Shared>>,
    ) -> Self {
        Self { id, reply, shared }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Cancel this request if it is still in flight. Any pending fetch or
    /// retry timer is dropped and the handle resolves with `None`.
    pub fn cancel(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let active = {
            let mut shared = lock(&shared);
            let active = shared.take_active(self.id);
            if active.is_some() {
                shared.retry.reset();
            }
            active
        };
        if let Some(active) = active {
            tracing::debug!(request = self.id, "track request cancelled");
            active.abandon();
        }
    }
}

impl Future for TrackRequest {
    type Output = Option<Track>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender without a reply still counts as "no result".
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|reply| reply.unwrap_or(None))
    }
}
