use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use craftwatch_types::{PersistedDeath, PersistedSession, record_timestamp};

use crate::{EventSink, SinkError};

/// Public Notion API endpoint
pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";

/// API version the page payloads are written against
const NOTION_VERSION: &str = "2022-06-28";

/// Notion caps a single rich text object at 2000 characters
const MAX_RICH_TEXT_CHARS: usize = 2000;

/// Credentials and database ids for the Notion sink
#[derive(Clone, Debug)]
pub struct NotionConfig {
    pub api_key: String,
    pub sessions_db: String,
    pub deaths_db: String,
    pub base_url: String,
}

impl NotionConfig {
    pub fn new(api_key: String, sessions_db: String, deaths_db: String) -> Self {
        Self {
            api_key,
            sessions_db,
            deaths_db,
            base_url: DEFAULT_NOTION_BASE_URL.to_string(),
        }
    }
}

/// Writes sessions and deaths as pages in two Notion databases
#[derive(Debug)]
pub struct NotionSink {
    http: Client,
    config: NotionConfig,
}

impl NotionSink {
    pub fn new(config: NotionConfig) -> Result<Self, SinkError> {
        for (name, value) in [
            ("api key", &config.api_key),
            ("sessions database id", &config.sessions_db),
            ("deaths database id", &config.deaths_db),
        ] {
            if value.trim().is_empty() {
                return Err(SinkError::Config(format!("Notion {name} is empty")));
            }
        }

        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Page body for a session record
    pub fn session_payload(&self, session: &PersistedSession) -> Value {
        json!({
            "parent": { "database_id": self.config.sessions_db },
            "properties": {
                "Player": { "title": [{ "type": "text", "text": { "content": session.player } }] },
                "JoinTime": { "date": { "start": record_timestamp(session.joined_at()) } },
                "LeaveTime": { "date": { "start": record_timestamp(session.left_at()) } },
            }
        })
    }

    /// Page body for a death record
    pub fn death_payload(&self, death: &PersistedDeath) -> Value {
        let cause = truncate_chars(&death.cause, MAX_RICH_TEXT_CHARS);
        json!({
            "parent": { "database_id": self.config.deaths_db },
            "properties": {
                "Player": { "title": [{ "text": { "content": death.player } }] },
                "Cause": { "rich_text": [{ "text": { "content": cause } }] },
                "Timestamp": { "date": { "start": record_timestamp(death.timestamp) } },
            }
        })
    }

    async fn create_page(&self, payload: &Value) -> Result<(), SinkError> {
        let url = format!("{}/pages", self.config.base_url.trim_end_matches('/'));
        debug!(%url, "creating Notion page");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for NotionSink {
    async fn persist_session(&self, session: &PersistedSession) -> Result<(), SinkError> {
        self.create_page(&self.session_payload(session)).await?;
        info!(
            player = %session.player,
            join = %session.join_time,
            leave = %session.leave_time,
            "session saved to Notion"
        );
        Ok(())
    }

    async fn persist_death(&self, death: &PersistedDeath) -> Result<(), SinkError> {
        self.create_page(&self.death_payload(death)).await?;
        info!(player = %death.player, cause = %death.cause, "death saved to Notion");
        Ok(())
    }
}

/// Cut `s` to at most `max` characters without splitting one
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
