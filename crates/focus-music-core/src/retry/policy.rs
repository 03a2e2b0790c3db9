use std::time::Duration;

/// Outcome of a single fetch, as seen by the retry policy.
///
/// Callers map client errors (see [`super::classify`]) and content checks
/// into these classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Acceptable track returned.
    Success,
    /// Account lacks the subscription tier (HTTP 401/403). Never retried.
    Forbidden,
    /// Server asked us to slow down (HTTP 429).
    RateLimited,
    /// 5xx, network failure, or any other unexpected status.
    TransientServer,
    /// Malformed response, or an explicit track while filtering is on.
    FilteredContent,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry; resolve the request now.
    Stop,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Per-class retry ceilings and delays.
///
/// `retry_index` passed to [`RetryPolicy::decide`] is the number of retries
/// already performed for the current request (0 before the first retry).
/// All classes share that index; each class only compares it against its
/// own ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries after an HTTP 429.
    pub max_rate_limited_retries: u32,
    /// Fixed wait after an HTTP 429.
    pub rate_limited_delay: Duration,
    /// Maximum retries after a transient server/network failure.
    pub max_transient_retries: u32,
    /// First backoff delay for transient failures; doubles per retry.
    pub transient_base_delay: Duration,
    /// Upper bound on the transient backoff delay.
    pub transient_max_delay: Duration,
    /// Maximum retries after a filtered or malformed track.
    pub max_filtered_retries: u32,
    /// Fixed wait before asking for another track after a filtered one.
    pub filtered_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limited_retries: 3,
            rate_limited_delay: Duration::from_secs(30),
            max_transient_retries: 3,
            transient_base_delay: Duration::from_secs(1),
            transient_max_delay: Duration::from_secs(30),
            max_filtered_retries: 3,
            filtered_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Decide whether to retry a fetch that ended with `classification`.
    pub fn decide(&self, classification: Classification, retry_index: u32) -> RetryDecision {
        match classification {
            Classification::Success | Classification::Forbidden => RetryDecision::Stop,
            Classification::RateLimited => {
                if retry_index < self.max_rate_limited_retries {
                    RetryDecision::RetryAfter(self.rate_limited_delay)
                } else {
                    RetryDecision::Stop
                }
            }
            Classification::TransientServer => {
                if retry_index < self.max_transient_retries {
                    RetryDecision::RetryAfter(self.backoff_delay(retry_index))
                } else {
                    RetryDecision::Stop
                }
            }
            Classification::FilteredContent => {
                if retry_index < self.max_filtered_retries {
                    RetryDecision::RetryAfter(self.filtered_delay)
                } else {
                    RetryDecision::Stop
                }
            }
        }
    }

    /// Exponential backoff: base * 2^retry_index, capped.
    fn backoff_delay(&self, retry_index: u32) -> Duration {
        let exp = 1u32 << retry_index.min(16);
        self.transient_base_delay
            .saturating_mul(exp)
            .min(self.transient_max_delay)
    }
}
