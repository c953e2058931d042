//! Configuration: defaults, then an optional TOML file, then environment
//! variables and command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Deserialize;

use craftwatch_logs::{DEFAULT_POLL_INTERVAL, TruncationPolicy};
use craftwatch_rcon::{DEFAULT_RCON_PORT, RconConfig};
use craftwatch_sink::NotionConfig;

/// How to treat a log file that got shorter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Truncation {
    /// Re-read the file from the start
    #[default]
    Rewind,
    /// Wait for it to grow past the old end
    Ignore,
}

impl From<Truncation> for TruncationPolicy {
    fn from(value: Truncation) -> Self {
        match value {
            Truncation::Rewind => Self::Rewind,
            Truncation::Ignore => Self::Ignore,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_path: PathBuf,
    pub poll_interval_ms: u64,
    pub sink_timeout_ms: u64,
    pub truncation: Truncation,
    /// Date session join/leave times are anchored to
    pub session_date: NaiveDate,
    pub dry_run: bool,
    pub notion: NotionSection,
    pub rcon: RconSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("latest.log"),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            sink_timeout_ms: 5000,
            truncation: Truncation::default(),
            session_date: craftwatch_types::default_session_date(),
            dry_run: false,
            notion: NotionSection::default(),
            rcon: RconSection::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotionSection {
    pub api_key: Option<String>,
    pub sessions_db: Option<String>,
    pub deaths_db: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RconSection {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RconSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_RCON_PORT,
            password: None,
            timeout_ms: 5000,
        }
    }
}

/// Settings that can come from the environment or the command line
#[derive(clap::Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Server log to tail
    #[arg(long, env = "LATEST_LOG_PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Notion integration token
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true, global = true)]
    pub notion_api_key: Option<String>,

    /// Notion database receiving sessions
    #[arg(long, env = "NOTION_SESSIONS_DB_ID", global = true)]
    pub notion_sessions_db: Option<String>,

    /// Notion database receiving deaths
    #[arg(long, env = "NOTION_DEATHS_DB_ID", global = true)]
    pub notion_deaths_db: Option<String>,

    #[arg(long, env = "RCON_HOST", global = true)]
    pub rcon_host: Option<String>,

    #[arg(long, env = "RCON_PORT", global = true)]
    pub rcon_port: Option<u16>,

    #[arg(long, env = "RCON_PASSWORD", hide_env_values = true, global = true)]
    pub rcon_password: Option<String>,

    /// Fallback poll interval for log growth, in milliseconds
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Bound on each record store write, in milliseconds
    #[arg(long, global = true)]
    pub sink_timeout_ms: Option<u64>,

    /// What to do when the log gets shorter
    #[arg(long, value_enum, global = true)]
    pub truncation: Option<Truncation>,

    /// Date session records are stamped with (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub session_date: Option<NaiveDate>,

    /// Log records instead of writing them to Notion
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl Config {
    /// Defaults, overlaid with the TOML file at `path` if given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment and command-line values on top
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.log_path {
            self.log_path = path.clone();
        }
        if let Some(key) = &overrides.notion_api_key {
            self.notion.api_key = Some(key.clone());
        }
        if let Some(db) = &overrides.notion_sessions_db {
            self.notion.sessions_db = Some(db.clone());
        }
        if let Some(db) = &overrides.notion_deaths_db {
            self.notion.deaths_db = Some(db.clone());
        }
        if let Some(host) = &overrides.rcon_host {
            self.rcon.host = host.clone();
        }
        if let Some(port) = overrides.rcon_port {
            self.rcon.port = port;
        }
        if let Some(password) = &overrides.rcon_password {
            self.rcon.password = Some(password.clone());
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = overrides.sink_timeout_ms {
            self.sink_timeout_ms = ms;
        }
        if let Some(truncation) = overrides.truncation {
            self.truncation = truncation;
        }
        if let Some(date) = overrides.session_date {
            self.session_date = date;
        }
        if overrides.dry_run {
            self.dry_run = true;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    /// Notion settings, if all three identifiers are present
    pub fn notion_config(&self) -> Option<NotionConfig> {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        let mut config = NotionConfig::new(
            present(&self.notion.api_key)?,
            present(&self.notion.sessions_db)?,
            present(&self.notion.deaths_db)?,
        );
        if let Some(base_url) = present(&self.notion.base_url) {
            config.base_url = base_url;
        }
        Some(config)
    }

    pub fn rcon_config(&self) -> Result<RconConfig> {
        let Some(password) = self.rcon.password.clone().filter(|p| !p.is_empty()) else {
            bail!("RCON password is not set (RCON_PASSWORD or [rcon] password)");
        };
        Ok(RconConfig {
            host: self.rcon.host.clone(),
            port: self.rcon.port,
            password,
            timeout: Duration::from_millis(self.rcon.timeout_ms),
        })
    }
}
