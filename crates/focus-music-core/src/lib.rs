pub mod config;
pub mod logging;

pub mod client;
pub mod controller;
pub mod cursor;
pub mod reporting;
pub mod retry;

pub use client::{ClientError, MusicClient, QueueTrack, Track};
pub use controller::{ControllerEvent, TrackController, TrackRequest};
pub use reporting::PlaybackState;
