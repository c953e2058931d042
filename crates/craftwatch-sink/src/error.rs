use std::time::Duration;

use thiserror::Error;

/// Why a record could not be written
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("sink config error: {0}")]
    Config(String),
}
