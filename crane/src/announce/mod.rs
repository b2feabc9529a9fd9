//! Deployment announcements

pub mod echo;
pub mod notification;
pub mod slack;
pub mod webhook;

use std::fmt;

use async_trait::async_trait;
use tracing::warn;

use crate::announce::notification::Notification;
use crate::errors::CraneError;

/// Point in the deployment an announcement is made at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Success,
    Failure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Success => "success",
            Stage::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// A channel deployments are announced on
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn announce(&self, stage: Stage, note: &Notification) -> Result<(), CraneError>;
}

/// Announce on every channel, logging and skipping the ones that fail
pub async fn dispatch(announcers: &[Box<dyn Announcer>], stage: Stage, note: &Notification) {
    for announcer in announcers {
        if let Err(e) = announcer.announce(stage, note).await {
            warn!(
                announcer = announcer.name(),
                stage = %stage,
                "Couldn't announce, on with the release: {}",
                e
            );
        }
    }
}
