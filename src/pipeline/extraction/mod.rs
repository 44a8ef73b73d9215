pub mod types;
pub mod sanitize;
pub mod sections;
pub mod preprocess;
pub mod retry;
pub mod engine_pool;
pub mod openfoodfacts;
pub mod cloud_ocr;
pub mod local_ocr;
pub mod tiers;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use sections::*;
pub use preprocess::*;
pub use retry::*;
pub use engine_pool::*;
pub use openfoodfacts::*;
pub use cloud_ocr::*;
pub use local_ocr::*;
pub use tiers::*;
pub use orchestrator::*;

use std::time::Duration;

use thiserror::Error;

/// Longest server-requested wait honoured between attempts.
pub const MAX_RETRY_AFTER_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Service unreachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Service returned error (status {status}): {body}")]
    Http {
        status: u16,
        body: String,
        retry_after_secs: Option<u64>,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Recognizer unavailable: {0}")]
    Unavailable(String),

    #[error("Engine pool lock poisoned")]
    LockPoisoned,

    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Timeouts, connection failures, 429 and 503 may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExtractionError::Connection(_)
                | ExtractionError::Timeout(_)
                | ExtractionError::Http {
                    status: 429 | 503,
                    ..
                }
        )
    }

    /// Server-requested wait before the next attempt, capped.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ExtractionError::Http {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS))),
            _ => None,
        }
    }

    /// Map a reqwest transport error, keeping the transient kinds distinct.
    pub(crate) fn from_transport(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            ExtractionError::Timeout(timeout_secs)
        } else if e.is_connect() {
            ExtractionError::Connection(base_url.to_string())
        } else {
            ExtractionError::HttpClient(e.to_string())
        }
    }
}

/// Turn a non-success response into `ExtractionError::Http`, reading
/// `Retry-After` (whole seconds) when present.
pub(crate) fn status_error(response: reqwest::blocking::Response) -> ExtractionError {
    let status = response.status().as_u16();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().unwrap_or_default();
    ExtractionError::Http {
        status,
        body,
        retry_after_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, retry_after_secs: Option<u64>) -> ExtractionError {
        ExtractionError::Http {
            status,
            body: String::new(),
            retry_after_secs,
        }
    }

    #[test]
    fn transient_classification() {
        assert!(ExtractionError::Timeout(30).is_transient());
        assert!(ExtractionError::Connection("http://x".into()).is_transient());
        assert!(http(429, None).is_transient());
        assert!(http(503, None).is_transient());
        assert!(!http(400, None).is_transient());
        assert!(!http(401, None).is_transient());
        assert!(!http(500, None).is_transient());
        assert!(!ExtractionError::MissingApiKey("cloud").is_transient());
        assert!(!ExtractionError::ResponseParsing("bad".into()).is_transient());
    }

    #[test]
    fn retry_after_is_capped() {
        assert_eq!(http(429, Some(3)).retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(http(503, Some(120)).retry_after(), Some(Duration::from_secs(10)));
        assert_eq!(http(503, None).retry_after(), None);
        assert_eq!(ExtractionError::Timeout(5).retry_after(), None);
    }
}
