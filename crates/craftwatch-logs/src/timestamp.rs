use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{2}:\d{2}:\d{2})\]").expect("timestamp pattern compiles"));

/// Time of day from the first bracketed `[HH:MM:SS]` in a line.
///
/// Returns `None` when there is no such token or it is not a valid time
/// (`[25:00:00]`). Every line format the pipeline understands carries one.
pub fn extract_timestamp(line: &str) -> Option<NaiveTime> {
    let caps = TIMESTAMP.captures(line)?;
    NaiveTime::parse_from_str(&caps[1], "%H:%M:%S").ok()
}
