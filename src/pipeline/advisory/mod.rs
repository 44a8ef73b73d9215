pub mod types;
pub mod prompt;
pub mod interpret;
pub mod openrouter;

pub use types::*;
pub use prompt::*;
pub use interpret::*;
pub use openrouter::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("Advisory service is not configured (no API key)")]
    NotConfigured,

    #[error("Advisory service unreachable at {0}")]
    Connection(String),

    #[error("Advisory request timed out after {0}s")]
    Timeout(u64),

    #[error("Advisory service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Invalid advisory base URL: {0}")]
    InvalidUrl(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Advisory service returned an empty response")]
    EmptyResponse,
}
