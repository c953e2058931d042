//! Record store sinks for craftwatch
//!
//! A sink receives completed sessions and deaths and writes them somewhere
//! durable. Writes are best effort: the [`SinkDispatcher`] runs each one on a
//! background task with a timeout and only counts and logs failures.

mod dispatcher;
mod dry_run;
mod error;
mod notion;

use async_trait::async_trait;

pub use dispatcher::{Record, SinkDispatcher, SinkStats, SinkStatsSnapshot};
pub use dry_run::DryRunSink;
pub use error::SinkError;
pub use notion::{NotionConfig, NotionSink};

// Re-export types used in our public API
pub use craftwatch_types::{PersistedDeath, PersistedSession};

/// External record store accepting create-record calls
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Store one completed session
    async fn persist_session(&self, session: &PersistedSession) -> Result<(), SinkError>;

    /// Store one death
    async fn persist_death(&self, death: &PersistedDeath) -> Result<(), SinkError>;
}
