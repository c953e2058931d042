use async_trait::async_trait;
use tracing::info;

use craftwatch_types::{PersistedDeath, PersistedSession, record_timestamp};

use crate::{EventSink, SinkError};

/// Sink that only logs what it would have written
#[derive(Clone, Debug, Default)]
pub struct DryRunSink;

#[async_trait]
impl EventSink for DryRunSink {
    async fn persist_session(&self, session: &PersistedSession) -> Result<(), SinkError> {
        info!(
            player = %session.player,
            joined = %record_timestamp(session.joined_at()),
            left = %record_timestamp(session.left_at()),
            "dry run: session record"
        );
        Ok(())
    }

    async fn persist_death(&self, death: &PersistedDeath) -> Result<(), SinkError> {
        info!(
            player = %death.player,
            cause = %death.cause,
            at = %record_timestamp(death.timestamp),
            "dry run: death record"
        );
        Ok(())
    }
}
