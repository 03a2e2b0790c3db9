//! Retry counter for the in-flight track request.

/// Number of retries performed for the current request.
///
/// Reset on success and whenever a request terminates or is superseded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    retry_index: u32,
}

impl RetryState {
    pub fn retry_index(&self) -> u32 {
        self.retry_index
    }

    /// Record that a retry has been scheduled.
    pub fn record_retry(&mut self) {
        self.retry_index = self.retry_index.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.retry_index = 0;
    }
}
