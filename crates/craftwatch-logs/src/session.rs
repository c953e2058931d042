use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

use craftwatch_types::PersistedSession;

/// An open session waiting for its leave line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEntry {
    pub join_time: Option<NaiveTime>,
}

/// Open sessions keyed by player name.
///
/// Holds at most one entry per player. A second join before a leave replaces
/// the first entry and the replaced join is lost; a leave without an open
/// entry produces nothing.
#[derive(Debug)]
pub struct SessionTracker {
    open: HashMap<String, SessionEntry>,

    /// Date completed sessions are anchored to
    date: NaiveDate,
}

impl SessionTracker {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            open: HashMap::new(),
            date,
        }
    }

    /// Open (or reopen) a session. Returns the entry that was replaced.
    pub fn on_join(&mut self, player: &str, time: NaiveTime) -> Option<SessionEntry> {
        self.open.insert(
            player.to_string(),
            SessionEntry {
                join_time: Some(time),
            },
        )
    }

    /// Close the player's session, if one is open
    pub fn on_leave(&mut self, player: &str, time: NaiveTime) -> Option<PersistedSession> {
        let entry = self.open.remove(player)?;
        let join_time = entry.join_time?;
        Some(PersistedSession::new(
            player.to_string(),
            join_time,
            time,
            self.date,
        ))
    }

    pub fn is_open(&self, player: &str) -> bool {
        self.open.contains_key(player)
    }

    /// Number of players currently online as far as the log says
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Names of players with an open session, sorted
    pub fn players(&self) -> Vec<&str> {
        let mut players: Vec<&str> = self.open.keys().map(String::as_str).collect();
        players.sort_unstable();
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    fn tracker() -> SessionTracker {
        SessionTracker::new(craftwatch_types::default_session_date())
    }

    #[test]
    fn test_join_then_leave_completes_session() {
        let mut sessions = tracker();
        assert!(sessions.on_join("Alice", t("12:00:01")).is_none());
        assert!(sessions.is_open("Alice"));

        let session = sessions.on_leave("Alice", t("12:05:30")).unwrap();
        assert_eq!(session.player, "Alice");
        assert_eq!(session.join_time, t("12:00:01"));
        assert_eq!(session.leave_time, t("12:05:30"));
        assert_eq!(session.date, craftwatch_types::default_session_date());
        assert!(!sessions.is_open("Alice"));
    }

    #[test]
    fn test_second_join_overwrites_first() {
        let mut sessions = tracker();
        sessions.on_join("Alice", t("12:00:00"));
        let replaced = sessions.on_join("Alice", t("12:30:00"));
        assert_eq!(
            replaced,
            Some(SessionEntry {
                join_time: Some(t("12:00:00")),
            })
        );
        assert_eq!(sessions.open_count(), 1);

        let session = sessions.on_leave("Alice", t("13:00:00")).unwrap();
        assert_eq!(session.join_time, t("12:30:00"));
    }

    #[test]
    fn test_orphan_leave_yields_nothing() {
        let mut sessions = tracker();
        assert!(sessions.on_leave("Bob", t("12:00:00")).is_none());

        sessions.on_join("Alice", t("12:00:00"));
        assert!(sessions.on_leave("Alice", t("12:01:00")).is_some());
        // already consumed
        assert!(sessions.on_leave("Alice", t("12:02:00")).is_none());
    }

    #[test]
    fn test_players_are_tracked_independently() {
        let mut sessions = tracker();
        sessions.on_join("Bob", t("10:00:00"));
        sessions.on_join("Alice", t("10:01:00"));
        assert_eq!(sessions.players(), vec!["Alice", "Bob"]);

        let bob = sessions.on_leave("Bob", t("11:00:00")).unwrap();
        assert_eq!(bob.join_time, t("10:00:00"));
        assert_eq!(sessions.players(), vec!["Alice"]);
    }
}
