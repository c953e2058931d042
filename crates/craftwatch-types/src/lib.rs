//! Shared types for craftwatch
//!
//! This crate contains the values that flow between the log pipeline, the
//! record sinks and the RCON front end.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

// ============================================================================
// Log Events
// ============================================================================

/// A classified server log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogEvent {
    /// A player connected
    Join { player: String, time: NaiveTime },
    /// A player disconnected
    Leave { player: String, time: NaiveTime },
    /// A player died; `cause` is the free text after the death verb
    Death {
        player: String,
        cause: String,
        time: NaiveTime,
    },
    /// Anything the pipeline does not care about
    Unrecognized,
}

impl LogEvent {
    /// Short label used in log fields
    pub fn label(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Death { .. } => "death",
            Self::Unrecognized => "unrecognized",
        }
    }
}

// ============================================================================
// Persisted Records
// ============================================================================

/// Date session records are stamped with unless configured otherwise
pub fn default_session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 24).expect("2025-02-24 is a valid date")
}

/// Format a timestamp the way the record store expects it
/// (`YYYY-MM-DDTHH:MM:SS.000Z`, the log's wall clock treated as UTC)
pub fn record_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// A completed join/leave pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedSession {
    pub player: String,
    pub join_time: NaiveTime,
    pub leave_time: NaiveTime,
    /// Reference date both times are anchored to
    pub date: NaiveDate,
}

impl PersistedSession {
    pub fn new(
        player: String,
        join_time: NaiveTime,
        leave_time: NaiveTime,
        date: NaiveDate,
    ) -> Self {
        Self {
            player,
            join_time,
            leave_time,
            date,
        }
    }

    /// Absolute join timestamp
    pub fn joined_at(&self) -> NaiveDateTime {
        self.date.and_time(self.join_time)
    }

    /// Absolute leave timestamp.
    ///
    /// A leave earlier in the day than the join crossed midnight and lands on
    /// the following day.
    pub fn left_at(&self) -> NaiveDateTime {
        let date = if self.leave_time < self.join_time {
            self.date.checked_add_days(Days::new(1)).unwrap_or(self.date)
        } else {
            self.date
        };
        date.and_time(self.leave_time)
    }

    /// Time spent online
    pub fn duration(&self) -> TimeDelta {
        self.left_at() - self.joined_at()
    }
}

/// A player death
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedDeath {
    pub player: String,
    pub cause: String,
    pub timestamp: NaiveDateTime,
}

impl PersistedDeath {
    /// Anchor the extracted time of day to `date` (normally today, UTC)
    pub fn new(player: String, cause: String, time: NaiveTime, date: NaiveDate) -> Self {
        Self {
            player,
            cause,
            timestamp: date.and_time(time),
        }
    }
}

// ============================================================================
// Remote Console
// ============================================================================

/// Parsed reply to the `list` command
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerList {
    pub player_count: u32,
    pub max_players: u32,
    pub players: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    #[test]
    fn test_session_timestamps_use_reference_date() {
        let session = PersistedSession::new(
            "Alice".to_string(),
            t("12:00:01"),
            t("12:05:30"),
            default_session_date(),
        );
        assert_eq!(record_timestamp(session.joined_at()), "2025-02-24T12:00:01.000Z");
        assert_eq!(record_timestamp(session.left_at()), "2025-02-24T12:05:30.000Z");
        assert_eq!(session.duration(), TimeDelta::seconds(329));
    }

    #[test]
    fn test_session_crossing_midnight() {
        let session = PersistedSession::new(
            "Alice".to_string(),
            t("23:59:00"),
            t("00:01:00"),
            default_session_date(),
        );
        assert_eq!(record_timestamp(session.left_at()), "2025-02-25T00:01:00.000Z");
        assert_eq!(session.duration(), TimeDelta::minutes(2));
    }

    #[test]
    fn test_death_timestamp() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let death =
            PersistedDeath::new("Bob".to_string(), "Zombie".to_string(), t("12:10:00"), date);
        assert_eq!(record_timestamp(death.timestamp), "2026-10-16T12:10:00.000Z");
    }

    #[test]
    fn test_player_list_serializes_camel_case() {
        let list = PlayerList {
            player_count: 1,
            max_players: 20,
            players: vec!["Alice".to_string()],
        };
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"{"playerCount":1,"maxPlayers":20,"players":["Alice"]}"#);
    }

    #[test]
    fn test_event_labels() {
        let event = LogEvent::Join {
            player: "Alice".to_string(),
            time: t("12:00:01"),
        };
        assert_eq!(event.label(), "join");
        assert_eq!(LogEvent::Unrecognized.label(), "unrecognized");
    }
}
