use chrono::NaiveTime;
use regex::{Captures, Regex};

use craftwatch_types::LogEvent;

use crate::error::ClassifyError;
use crate::timestamp::extract_timestamp;

/// Death message phrases, longest first so `was slain by` wins over `was`
pub const DEATH_VERBS: &[&str] = &[
    "was slain by",
    "was shot by",
    "was killed by",
    "was blown up by",
    "was fireballed by",
    "was pricked to death",
    "was struck by lightning",
    "was squashed by",
    "was impaled by",
    "hit the ground too hard",
    "went up in flames",
    "withered away",
    "walked into",
    "blew up",
    "burned",
    "drowned",
    "died",
    "fell",
    "starved",
    "suffocated",
    "froze",
    "tried",
    "was",
];

const PLAYER: &str = r"(?P<player>[A-Za-z0-9_-]+)";
const SERVER_PREFIX: &str = r"\[Server thread/INFO\] \[net\.minecraft\.server\.MinecraftServer\]: ";
const PACKET_PREFIX: &str =
    r"\[Server thread/INFO\] \[net\.minecraft\.server\.network\.ServerGamePacketListenerImpl\]: ";

/// Which event a rule produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Join,
    Leave,
    Death,
}

/// A pattern paired with the event it builds.
///
/// Patterns capture `player`; death patterns also capture `verb` and an
/// optional `cause`.
#[derive(Clone, Debug)]
pub struct Rule {
    kind: RuleKind,
    pattern: Regex,
}

impl Rule {
    pub fn new(kind: RuleKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    fn build(&self, caps: &Captures<'_>, time: NaiveTime) -> LogEvent {
        let player = caps
            .name("player")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        match self.kind {
            RuleKind::Join => LogEvent::Join { player, time },
            RuleKind::Leave => LogEvent::Leave { player, time },
            RuleKind::Death => {
                // "Bob died" has no trailing text; the verb is the cause
                let cause = caps
                    .name("cause")
                    .map(|m| m.as_str().trim())
                    .filter(|c| !c.is_empty())
                    .or_else(|| caps.name("verb").map(|m| m.as_str()))
                    .unwrap_or_default()
                    .to_string();
                LogEvent::Death {
                    player,
                    cause,
                    time,
                }
            }
        }
    }
}

/// Ordered rule list turning raw log lines into [`LogEvent`]s
#[derive(Clone, Debug)]
pub struct LineClassifier {
    rules: Vec<Rule>,
}

impl LineClassifier {
    /// Join, leave and death rules for vanilla server logs
    pub fn new() -> Self {
        let verbs = DEATH_VERBS
            .iter()
            .map(|v| regex::escape(v))
            .collect::<Vec<_>>()
            .join("|");

        let rules = [
            (RuleKind::Join, format!("{SERVER_PREFIX}{PLAYER} joined the game")),
            (RuleKind::Leave, format!("{SERVER_PREFIX}{PLAYER} left the game")),
            (
                RuleKind::Death,
                format!(r"{PACKET_PREFIX}{PLAYER} (?P<verb>{verbs})(?:\s+(?P<cause>.+))?$"),
            ),
        ]
        .into_iter()
        .map(|(kind, pattern)| Rule::new(kind, &pattern).expect("built-in rule compiles"))
        .collect();

        Self { rules }
    }

    /// Classifier over a custom rule list, evaluated in the given order
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a raw line. Lines without a timestamp are `Unrecognized`.
    pub fn parse(&self, line: &str) -> Result<LogEvent, ClassifyError> {
        match extract_timestamp(line) {
            Some(time) => self.classify(line, time),
            None => Ok(LogEvent::Unrecognized),
        }
    }

    /// Classify a line whose timestamp has already been extracted.
    ///
    /// Every rule is tried; a line matching more than one is an error.
    pub fn classify(&self, line: &str, time: NaiveTime) -> Result<LogEvent, ClassifyError> {
        let mut event = None;
        let mut kinds = Vec::new();

        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(line) {
                kinds.push(rule.kind);
                if event.is_none() {
                    event = Some(rule.build(&caps, time));
                }
            }
        }

        if kinds.len() > 1 {
            return Err(ClassifyError::Ambiguous { kinds });
        }
        Ok(event.unwrap_or(LogEvent::Unrecognized))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
