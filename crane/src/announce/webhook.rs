//! Webhook announcer

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error};

use crate::announce::notification::Notification;
use crate::announce::{Announcer, Stage};
use crate::errors::CraneError;

#[derive(Debug, Serialize)]
struct WebhookCommit<'a> {
    id: &'a str,
    message: &'a str,
    author: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    status: &'static str,
    version: &'a str,
    timestamp: &'a str,
    commits: Vec<WebhookCommit<'a>>,
}

/// POSTs the release to a list of URLs once it succeeded
pub struct WebhookAnnouncer {
    client: Client,
    urls: Vec<String>,
    token: Option<SecretString>,
}

impl WebhookAnnouncer {
    pub fn new(urls: Vec<String>, token: Option<SecretString>) -> Result<Self, CraneError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            urls: urls
                .into_iter()
                .map(|url| url.trim_end_matches('/').to_string())
                .collect(),
            token,
        })
    }

    fn body<'a>(note: &'a Notification) -> WebhookBody<'a> {
        WebhookBody {
            status: "success",
            version: &note.version,
            timestamp: &note.timestamp,
            commits: note
                .commits
                .iter()
                .map(|commit| WebhookCommit {
                    id: commit.hexsha(),
                    message: commit.summary(),
                    author: commit.author(),
                    timestamp: commit.at().to_rfc3339(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Announcer for WebhookAnnouncer {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn announce(&self, stage: Stage, note: &Notification) -> Result<(), CraneError> {
        if stage != Stage::Success {
            return Ok(());
        }

        let body = Self::body(note);
        let mut failures = Vec::new();
        for url in &self.urls {
            debug!("POST {}", url);

            let mut request = self.client.post(url).json(&body);
            if let Some(token) = &self.token {
                request = request.header("Auth-Token", token.expose_secret());
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    error!("Webhook {} failed: {}", url, response.status());
                    failures.push(format!("{}: {}", url, response.status()));
                }
                Err(e) => {
                    error!("Webhook {} failed: {}", url, e);
                    failures.push(format!("{}: {}", url, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CraneError::AnnounceError(failures.join(", ")))
        }
    }
}
