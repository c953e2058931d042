use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RCON authentication failed")]
    AuthFailed,

    #[error("RCON protocol error: {0}")]
    Protocol(String),

    #[error("command is {len} bytes, the server accepts at most {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("RCON server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("command is empty")]
    EmptyCommand,

    #[error("could not parse list response: {0}")]
    UnparseableList(String),
}
