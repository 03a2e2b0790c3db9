//! Classify client errors into retry policy classes.

use crate::client::ClientError;
use crate::retry::policy::Classification;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> Classification {
    match code {
        401 | 403 => Classification::Forbidden,
        429 => Classification::RateLimited,
        _ => Classification::TransientServer,
    }
}

/// Classify a client error into a retry class.
pub fn classify(e: &ClientError) -> Classification {
    match e {
        ClientError::Http { status } => classify_http_status(*status),
        ClientError::Network(_) => Classification::TransientServer,
        ClientError::Malformed(_) => Classification::FilteredContent,
    }
}
