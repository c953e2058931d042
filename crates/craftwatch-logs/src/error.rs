use std::path::PathBuf;

use thiserror::Error;

use crate::RuleKind;

/// Failure to read the watched file
#[derive(Debug, Error)]
pub enum TailError {
    #[error("log file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A line the classifier refuses to resolve
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("line matched more than one rule: {kinds:?}")]
    Ambiguous { kinds: Vec<RuleKind> },
}

/// Failure that stops the watch loop
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("tail reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
