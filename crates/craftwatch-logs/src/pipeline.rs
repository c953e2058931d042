use chrono::{NaiveDate, Utc};
use tracing::{error, info, trace, warn};

use craftwatch_sink::SinkDispatcher;
use craftwatch_types::{LogEvent, PersistedDeath, PersistedSession};

use crate::parser::LineClassifier;
use crate::session::SessionTracker;

/// What a single line did to the pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not an event we track
    Ignored,
    /// Join recorded; `replaced` is set when an open session was overwritten
    SessionOpened { replaced: bool },
    /// Leave matched a join and the session went to the sink
    SessionClosed(PersistedSession),
    /// Leave with no open session, dropped
    OrphanLeave,
    /// Death went to the sink
    Death(PersistedDeath),
    /// Line matched more than one rule, dropped
    Rejected,
}

/// Per-line counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub lines: u64,
    pub ignored: u64,
    pub joins: u64,
    pub leaves: u64,
    pub deaths: u64,
    pub orphan_leaves: u64,
    pub overwritten_sessions: u64,
    pub rejected: u64,
}

/// Classifier, session state and sink wired together.
///
/// Lines must be fed in file order from a single task; the session map is
/// only touched here.
pub struct EventPipeline {
    classifier: LineClassifier,
    sessions: SessionTracker,
    dispatcher: SinkDispatcher,
    stats: PipelineStats,
}

impl EventPipeline {
    pub fn new(
        classifier: LineClassifier,
        sessions: SessionTracker,
        dispatcher: SinkDispatcher,
    ) -> Self {
        Self {
            classifier,
            sessions,
            dispatcher,
            stats: PipelineStats::default(),
        }
    }

    /// Feed one cycle's lines, stamping deaths with today's UTC date
    pub fn handle_lines(&mut self, lines: &[String]) {
        let today = Utc::now().date_naive();
        for line in lines {
            self.handle_line(line, today);
        }
    }

    /// Feed one complete line. Sink writes are spawned, not awaited.
    pub fn handle_line(&mut self, line: &str, today: NaiveDate) -> LineOutcome {
        self.stats.lines += 1;

        let event = match self.classifier.parse(line) {
            Ok(event) => event,
            Err(e) => {
                self.stats.rejected += 1;
                error!(error = %e, line, "ambiguous log line dropped");
                return LineOutcome::Rejected;
            }
        };
        trace!(kind = event.label(), line, "classified log line");

        match event {
            LogEvent::Join { player, time } => {
                self.stats.joins += 1;
                info!(%player, %time, "player joined");
                let replaced = self.sessions.on_join(&player, time).is_some();
                if replaced {
                    self.stats.overwritten_sessions += 1;
                    warn!(%player, "joined again without leaving, earlier session discarded");
                }
                LineOutcome::SessionOpened { replaced }
            }
            LogEvent::Leave { player, time } => {
                self.stats.leaves += 1;
                info!(%player, %time, "player left");
                match self.sessions.on_leave(&player, time) {
                    Some(session) => {
                        info!(
                            %player,
                            online_secs = session.duration().num_seconds(),
                            "session complete"
                        );
                        // The handle is dropped: failures are logged and counted by the dispatcher
                        let _ = self.dispatcher.submit_session(session.clone());
                        LineOutcome::SessionClosed(session)
                    }
                    None => {
                        self.stats.orphan_leaves += 1;
                        warn!(%player, "leave without a matching join, dropped");
                        LineOutcome::OrphanLeave
                    }
                }
            }
            LogEvent::Death {
                player,
                cause,
                time,
            } => {
                self.stats.deaths += 1;
                info!(%player, %cause, %time, "player died");
                let death = PersistedDeath::new(player, cause, time, today);
                let _ = self.dispatcher.submit_death(death.clone());
                LineOutcome::Death(death)
            }
            LogEvent::Unrecognized => {
                self.stats.ignored += 1;
                LineOutcome::Ignored
            }
        }
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn dispatcher(&self) -> &SinkDispatcher {
        &self.dispatcher
    }
}
