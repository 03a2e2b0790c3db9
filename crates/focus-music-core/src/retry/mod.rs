//! Retry and backoff policy.
//!
//! This module encapsulates error classification (entitlement, throttling,
//! server failures, filtered content) and per-class backoff decisions so the
//! track controller only has to act on a [`RetryDecision`].

mod classify;
mod policy;
mod state;

pub use classify::{classify, classify_http_status};
pub use policy::{Classification, RetryDecision, RetryPolicy};
pub use state::RetryState;
