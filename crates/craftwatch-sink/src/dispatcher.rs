use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use craftwatch_types::{PersistedDeath, PersistedSession};

use crate::{EventSink, SinkError};

/// Default bound on a single record store write
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// A value handed to the sink, already detached from pipeline state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Session(PersistedSession),
    Death(PersistedDeath),
}

impl Record {
    pub fn player(&self) -> &str {
        match self {
            Self::Session(session) => &session.player,
            Self::Death(death) => &death.player,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Session(_) => "session",
            Self::Death(_) => "death",
        }
    }
}

/// Write outcome counters
#[derive(Debug, Default)]
pub struct SinkStats {
    submitted: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of [`SinkStats`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SinkStatsSnapshot {
    pub submitted: u64,
    pub persisted: u64,
    /// Every failed write, timeouts included
    pub failed: u64,
    pub timed_out: u64,
    pub last_error: Option<String>,
}

impl SinkStats {
    pub fn snapshot(&self) -> SinkStatsSnapshot {
        SinkStatsSnapshot {
            submitted: self.submitted.load(Ordering::SeqCst),
            persisted: self.persisted.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            timed_out: self.timed_out.load(Ordering::SeqCst),
            last_error: self.last_error.lock().clone(),
        }
    }

    fn record_failure(&self, err: &SinkError) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        if matches!(err, SinkError::Timeout(_)) {
            self.timed_out.fetch_add(1, Ordering::SeqCst);
        }
        *self.last_error.lock() = Some(err.to_string());
    }
}

/// Runs sink writes on background tasks so a slow record store never stalls
/// tailing.
///
/// Each write is attempted once. The outcome is logged, counted in
/// [`SinkStats`] and returned through the task's `JoinHandle`.
#[derive(Clone)]
pub struct SinkDispatcher {
    sink: Arc<dyn EventSink>,
    timeout: Duration,
    stats: Arc<SinkStats>,
    tracker: TaskTracker,
}

impl SinkDispatcher {
    pub fn new(sink: Arc<dyn EventSink>, timeout: Duration) -> Self {
        Self {
            sink,
            timeout,
            stats: Arc::new(SinkStats::default()),
            tracker: TaskTracker::new(),
        }
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }

    pub fn submit_session(&self, session: PersistedSession) -> JoinHandle<Result<(), SinkError>> {
        self.submit(Record::Session(session))
    }

    pub fn submit_death(&self, death: PersistedDeath) -> JoinHandle<Result<(), SinkError>> {
        self.submit(Record::Death(death))
    }

    /// Spawn one write. Must be called from within a tokio runtime.
    pub fn submit(&self, record: Record) -> JoinHandle<Result<(), SinkError>> {
        self.stats.submitted.fetch_add(1, Ordering::SeqCst);

        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        let timeout = self.timeout;

        self.tracker.spawn(async move {
            let write = async {
                match &record {
                    Record::Session(session) => sink.persist_session(session).await,
                    Record::Death(death) => sink.persist_death(death).await,
                }
            };

            let result = match tokio::time::timeout(timeout, write).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(timeout)),
            };

            match &result {
                Ok(()) => {
                    stats.persisted.fetch_add(1, Ordering::SeqCst);
                    debug!(kind = record.label(), player = record.player(), "record persisted");
                }
                Err(e) => {
                    stats.record_failure(e);
                    error!(
                        kind = record.label(),
                        player = record.player(),
                        error = %e,
                        "failed to persist record, dropping it"
                    );
                }
            }
            result
        })
    }

    /// Number of writes still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for in-flight writes, up to `grace`.
    ///
    /// Returns `false` if writes were still running when `grace` elapsed.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            warn!(pending = self.tracker.len(), "sink writes still pending at shutdown");
        }
        drained
    }
}
