//! Error types for the request client.

use thiserror::Error;

/// Errors that can occur when talking to the index service.
///
/// Wrapping variants (`Exhausted`, `Page`) keep the underlying failure as
/// their source so the full cause chain is available to the caller.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The service answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The attempt did not complete before the per-attempt timer fired
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection, DNS or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body is not JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The request cannot be issued as specified
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every attempt failed; carries the last failure
    #[error("{method} {path} failed after {attempts} attempts")]
    Exhausted {
        method: String,
        path: String,
        attempts: u32,
        #[source]
        source: Box<RequestError>,
    },

    /// A page of a paged read failed; the whole read is abandoned
    #[error("Paged read failed at offset {offset}")]
    Page {
        offset: usize,
        #[source]
        source: Box<RequestError>,
    },
}

impl RequestError {
    /// Short label for the failure kind, used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Status { .. } => "status",
            RequestError::Timeout { .. } => "timeout",
            RequestError::Transport(_) => "transport",
            RequestError::Decode(_) => "decode",
            RequestError::InvalidRequest(_) => "invalid_request",
            RequestError::Exhausted { .. } => "exhausted",
            RequestError::Page { .. } => "page",
        }
    }

    /// Whether a failed attempt may be retried.
    ///
    /// Status codes are not distinguished: a 4xx is retried like a 5xx.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RequestError::InvalidRequest(_))
    }

    /// Total attempts made, if this error ended a retry loop.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RequestError::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The innermost failure behind any wrapping variants.
    pub fn root(&self) -> &RequestError {
        match self {
            RequestError::Exhausted { source, .. } | RequestError::Page { source, .. } => {
                source.root()
            }
            other => other,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        RequestError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RequestError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: unavailable");

        let err = RequestError::Exhausted {
            method: "POST".to_string(),
            path: "/indexes/messages".to_string(),
            attempts: 5,
            source: Box::new(RequestError::Timeout { timeout_ms: 5000 }),
        };
        assert_eq!(err.to_string(), "POST /indexes/messages failed after 5 attempts");
        assert_eq!(err.attempts(), Some(5));
        assert_eq!(err.root().kind(), "timeout");
    }

    #[test]
    fn test_retryable() {
        assert!(RequestError::Status {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(RequestError::Transport("reset".to_string()).is_retryable());
        assert!(!RequestError::InvalidRequest("bad".to_string()).is_retryable());
    }
}
