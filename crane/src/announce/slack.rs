//! Slack announcer

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::announce::notification::Notification;
use crate::announce::{Announcer, Stage};
use crate::errors::CraneError;

pub const SLACK_API_URL: &str = "https://slack.com/api";

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,

    #[serde(default)]
    error: Option<String>,
}

/// Posts each stage to every channel of the notification
pub struct SlackAnnouncer {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl SlackAnnouncer {
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, CraneError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn text(stage: Stage, note: &Notification) -> String {
        match stage {
            Stage::Start => {
                let mut text = format!("Deploying version {}\n{}", note.version, note.changelog());
                if !note.message.is_empty() {
                    text.push_str(&format!("\n{}", note.message));
                }
                text
            }
            Stage::Success => format!("Deployed version {} :tada:", note.version),
            Stage::Failure => format!("Deploying version {} failed: {}", note.version, note.message),
        }
    }

    async fn post(&self, channel: &str, text: &str) -> Result<(), CraneError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        debug!(channel = %channel, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&PostMessage { channel, text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CraneError::AnnounceError(format!(
                "{}: {}",
                channel,
                response.status()
            )));
        }

        let body: ApiResponse = response.json().await.unwrap_or_default();
        if !body.ok {
            return Err(CraneError::AnnounceError(format!(
                "{}: {}",
                channel,
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Announcer for SlackAnnouncer {
    fn name(&self) -> &str {
        "slack"
    }

    async fn announce(&self, stage: Stage, note: &Notification) -> Result<(), CraneError> {
        let text = Self::text(stage, note);

        let mut failures = Vec::new();
        for channel in &note.channels {
            if let Err(e) = self.post(channel, &text).await {
                error!(channel = %channel, "Couldn't post to Slack: {}", e);
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CraneError::AnnounceError(failures.join(", ")))
        }
    }
}
