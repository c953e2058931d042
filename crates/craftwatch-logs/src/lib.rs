//! Log processing for craftwatch
//!
//! This crate tails a growing server log, classifies each complete line and
//! turns join/leave pairs and deaths into records for a sink.

mod error;
mod parser;
mod pipeline;
mod session;
mod tail;
mod timestamp;
mod watcher;

pub use error::{ClassifyError, TailError, WatchError};
pub use parser::{DEATH_VERBS, LineClassifier, Rule, RuleKind};
pub use pipeline::{EventPipeline, LineOutcome, PipelineStats};
pub use session::{SessionEntry, SessionTracker};
pub use tail::{TailReader, TailState, TruncationPolicy};
pub use timestamp::extract_timestamp;
pub use watcher::{DEFAULT_POLL_INTERVAL, LogWatcher};

// Re-export types used in our public API
pub use craftwatch_types::{LogEvent, PersistedDeath, PersistedSession};
