use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::pipeline::EventPipeline;
use crate::tail::TailReader;

/// Fallback poll, in case change notifications are missed or unavailable
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Drives a [`TailReader`] into an [`EventPipeline`] until cancelled.
///
/// Wake-ups come from filesystem notifications and a periodic poll. Both go
/// through a one-slot channel, so wake-ups that arrive while a cycle is
/// already pending collapse into one re-check. Only one read cycle runs at a
/// time.
pub struct LogWatcher {
    reader: TailReader,
    pipeline: EventPipeline,
    poll_interval: Duration,
}

impl LogWatcher {
    pub fn new(reader: TailReader, pipeline: EventPipeline, poll_interval: Duration) -> Self {
        Self {
            reader,
            pipeline,
            poll_interval,
        }
    }

    /// Watch until `cancel` fires. The file watch is released before this
    /// returns; the pipeline is handed back so the caller can drain its sink.
    pub async fn run(self, cancel: CancellationToken) -> Result<EventPipeline, WatchError> {
        let LogWatcher {
            mut reader,
            mut pipeline,
            poll_interval,
        } = self;

        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
        let fs_watcher = match watch_file(reader.path(), wake_tx) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "file change notifications unavailable, polling only");
                None
            }
        };

        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(()) = wake_rx.recv() => {}
                _ = poll.tick() => {}
            }
            reader = read_cycle(reader, &mut pipeline).await?;
        }

        drop(fs_watcher);
        info!(
            path = %reader.path().display(),
            offset = reader.offset(),
            stats = ?pipeline.stats(),
            "stopped watching log file"
        );
        Ok(pipeline)
    }
}

/// One read-and-dispatch cycle. File I/O runs on the blocking pool.
async fn read_cycle(
    reader: TailReader,
    pipeline: &mut EventPipeline,
) -> Result<TailReader, WatchError> {
    let (reader, result) = tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let result = reader.read_new_lines();
        (reader, result)
    })
    .await?;

    match result {
        Ok(lines) => {
            if !lines.is_empty() {
                debug!(lines = lines.len(), "dispatching new log lines");
                pipeline.handle_lines(&lines);
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                offset = reader.offset(),
                "failed to read log file, will retry on next change"
            );
        }
    }
    Ok(reader)
}

/// Watch the file's directory so a rotated or recreated file keeps waking us
fn watch_file(path: &Path, wake: mpsc::Sender<()>) -> notify::Result<RecommendedWatcher> {
    let file_name = path.file_name().map(|name| name.to_os_string());
    let dir: PathBuf = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            let ours = event.paths.is_empty()
                || event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == file_name.as_deref());
            if ours {
                // Full means a cycle is already queued
                let _ = wake.try_send(());
            }
        }
        Err(e) => debug!(error = %e, "file watcher error"),
    })?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    debug!(dir = %dir.display(), "watching for log changes");
    Ok(watcher)
}
