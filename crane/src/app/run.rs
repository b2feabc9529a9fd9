//! Command runners

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::announce::echo::EchoAnnouncer;
use crate::announce::notification::Notification;
use crate::announce::slack::SlackAnnouncer;
use crate::announce::webhook::WebhookAnnouncer;
use crate::announce::{dispatch, Announcer, Stage};
use crate::app::options::{AnnounceOptions, AppOptions};
use crate::commit::history::VersionHistory;
use crate::commit::local::LocalRepository;
use crate::deploy::orchestrator::{Deployment, UpgradeOrchestrator};
use crate::errors::CraneError;
use crate::fleet::client::{FleetApiClient, FleetControl};
use crate::fleet::models::EntityLocator;

/// Build the configured announcers
pub fn build_announcers(options: &AnnounceOptions) -> Result<Vec<Box<dyn Announcer>>, CraneError> {
    let mut announcers: Vec<Box<dyn Announcer>> = Vec::new();
    if options.echo {
        announcers.push(Box::new(EchoAnnouncer));
    }
    if !options.webhook_urls.is_empty() {
        announcers.push(Box::new(WebhookAnnouncer::new(
            options.webhook_urls.clone(),
            options.webhook_token.clone(),
        )?));
    }
    if let Some(token) = &options.slack_token {
        if options.channels.is_empty() {
            warn!("A Slack token is set but no channel, Slack announcements are off");
        } else {
            announcers.push(Box::new(SlackAnnouncer::new(&options.slack_url, token.clone())?));
        }
    }
    Ok(announcers)
}

/// Notification describing a prepared deployment
pub fn deployment_notification(deployment: &Deployment, channels: &[String]) -> Notification {
    let links: Vec<String> = deployment
        .services
        .iter()
        .map(|service| service.web_url())
        .collect();

    let mut note = Notification::new(
        format!("(But please supervise me at {})", links.join(" , ")),
        Utc::now(),
    );
    note.channels = channels.to_vec();
    note.version = deployment.versions.new.clone();
    if let Some(classification) = &deployment.classification {
        note.kind = Some(classification.kind);
        note.commits = classification.commits.clone();
    }
    note
}

/// Upgrade the configured services, announcing along the way
pub async fn run_deploy(options: AppOptions) -> Result<(), CraneError> {
    let fleet: Arc<dyn FleetControl> = Arc::new(FleetApiClient::new(
        &options.fleet.url,
        options.fleet.auth(),
    )?);
    let history: Arc<dyn VersionHistory> = Arc::new(LocalRepository::new());
    let announcers = build_announcers(&options.announce)?;

    deploy(fleet, history, &announcers, options).await
}

/// Same as [`run_deploy`] with the collaborators supplied by the caller
pub async fn deploy(
    fleet: Arc<dyn FleetControl>,
    history: Arc<dyn VersionHistory>,
    announcers: &[Box<dyn Announcer>],
    options: AppOptions,
) -> Result<(), CraneError> {
    let mut orchestrator = UpgradeOrchestrator::new(fleet, history, options.settings);

    let deployment = orchestrator.prepare().await?;
    let mut note = deployment_notification(&deployment, &options.announce.channels);

    if !deployment.limited {
        dispatch(announcers, Stage::Start, &note).await;
    }

    match orchestrator.execute(&deployment).await {
        Ok(()) => {
            info!(stack = %deployment.stack, version = %deployment.versions.new, "Deployed");
            if !deployment.limited {
                dispatch(announcers, Stage::Success, &note).await;
            }
            Ok(())
        }
        Err(e) => {
            error!("Deployment failed: {}", e);
            if !deployment.limited {
                note.message = e.to_string();
                dispatch(announcers, Stage::Failure, &note).await;
            }
            Err(e)
        }
    }
}

/// Announce a stage without touching Rancher
pub async fn run_announce(stage: Stage, options: AppOptions) -> Result<(), CraneError> {
    let announcers = build_announcers(&options.announce)?;

    let mut note = Notification::new(String::new(), Utc::now());
    note.channels = options.announce.channels.clone();
    note.version = options
        .settings
        .target_version()
        .unwrap_or_default()
        .to_string();

    dispatch(&announcers, stage, &note).await;
    Ok(())
}
