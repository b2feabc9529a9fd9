//! Notification record handed to announcers

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::commit::Commit;
use crate::deploy::classifier::DeploymentKind;

/// What gets announced
#[derive(Debug, Clone, Default, Serialize)]
pub struct Notification {
    pub message: String,
    pub channels: Vec<String>,
    pub commits: Vec<Commit>,

    /// Unix time in milliseconds
    pub timestamp: String,

    /// Deployment kind, when history is available
    pub kind: Option<DeploymentKind>,

    /// Version being deployed
    pub version: String,
}

impl Notification {
    pub fn new(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            timestamp: now.timestamp_millis().to_string(),
            ..Default::default()
        }
    }

    /// Human-readable list of what changes, by deployment kind
    pub fn changelog(&self) -> String {
        let prefix = match self.kind {
            Some(DeploymentKind::Redeploy) => {
                return "This is just a re-deploy, you are not deploying any new commits.\n"
                    .to_string();
            }
            Some(DeploymentKind::Rollback) => "Rolling back the following changes:\n",
            Some(DeploymentKind::Disconnected) => {
                "Switching branches, so the exact changes cannot be determined. \
                 The latest commit now is:\n"
            }
            Some(DeploymentKind::Forward) | None => "",
        };

        let lines: Vec<String> = self
            .commits
            .iter()
            .map(|commit| format!("  {}", commit.summary()))
            .collect();

        format!("{}\n{}", prefix, lines.join("\n"))
    }
}
