use serde::{Deserialize, Serialize};

/// A playable track returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub stream_url: String,
    /// Marked explicit by the service.
    #[serde(default)]
    pub explicit: bool,
    /// Token required to report playback of this stream, if reporting is enabled.
    #[serde(default)]
    pub playback_reporting_token: Option<String>,
}

/// Result of `prepare` / `next`: the queue the track came from and the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTrack {
    pub queue_id: String,
    pub track: Track,
}
