//! Queue cursor: decides between preparing a fresh queue and asking an
//! existing one for its next track.

/// Last playlist and queue used by a successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueCursor {
    last_playlist_id: String,
    last_queue_id: String,
}

impl QueueCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the next fetch for `playlist_id` must prepare a new queue.
    pub fn needs_prepare(&self, playlist_id: &str) -> bool {
        self.last_playlist_id.is_empty() || playlist_id != self.last_playlist_id
    }

    /// Remember the playlist and queue of a fetch that reached the server.
    pub fn record_success(&mut self, playlist_id: &str, queue_id: &str) {
        self.last_playlist_id = playlist_id.to_string();
        self.last_queue_id = queue_id.to_string();
    }

    pub fn last_playlist_id(&self) -> &str {
        &self.last_playlist_id
    }

    /// Queue id of the last fetch; empty when no playlist has been fetched.
    pub fn last_queue_id(&self) -> &str {
        if self.last_playlist_id.is_empty() {
            ""
        } else {
            &self.last_queue_id
        }
    }

    pub fn reset(&mut self) {
        self.last_playlist_id.clear();
        self.last_queue_id.clear();
    }
}
