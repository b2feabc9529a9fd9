//! Waiting for upgraded services to settle

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::app::settings::Settings;
use crate::errors::CraneError;
use crate::fleet::client::FleetControl;
use crate::fleet::models::Service;
use crate::fleet::payload::decode_service;

const STATE_UPGRADING: &str = "upgrading";
const STATE_UPGRADED: &str = "upgraded";

/// Settle wait options
#[derive(Debug, Clone)]
pub struct SettleOptions {
    /// Delay before each polling round
    pub poll_interval: Duration,

    /// Wall-clock bound on the whole wait
    pub wait_timeout: Duration,

    /// Poll failures tolerated across all services
    pub fail_timeout: u32,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            wait_timeout: Duration::from_secs(60),
            fail_timeout: 20,
        }
    }
}

impl SettleOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            wait_timeout: Duration::from_secs(settings.wait_timeout),
            fail_timeout: settings.fail_timeout,
            ..Default::default()
        }
    }
}

/// Wait until every service reports `upgraded`
///
/// Polling runs on its own task and reports back over a oneshot channel,
/// raced against the wait timeout. When the timeout wins the poller is left
/// running until its failure budget runs out or the process exits.
pub async fn wait_for_settle(
    fleet: Arc<dyn FleetControl>,
    services: Vec<Service>,
    options: SettleOptions,
) -> Result<(), CraneError> {
    let (tx, rx) = oneshot::channel();
    let wait_timeout = options.wait_timeout;

    tokio::spawn(async move {
        let result = poll_until_settled(fleet.as_ref(), &services, &options).await;
        let _ = tx.send(result);
    });

    tokio::select! {
        result = rx => result.unwrap_or_else(|_| {
            Err(CraneError::DeployFailed("settle poller stopped unexpectedly".to_string()))
        }),
        _ = tokio::time::sleep(wait_timeout) => {
            error!(timeout = ?wait_timeout, "Bailed out after timeout expired");
            Err(CraneError::Timeout(format!(
                "services did not settle within {:?}",
                wait_timeout
            )))
        }
    }
}

async fn poll_until_settled(
    fleet: &dyn FleetControl,
    services: &[Service],
    options: &SettleOptions,
) -> Result<(), CraneError> {
    let mut fails: u32 = 0;
    let mut pending: Vec<&Service> = Vec::with_capacity(services.len());
    for service in services {
        if !pending.contains(&service) {
            pending.push(service);
        }
    }
    let mut settled: HashSet<&Service> = HashSet::new();

    while settled.len() != pending.len() {
        if fails >= options.fail_timeout {
            error!(fails, "Maximum number of failures fetching upgrade status reached");
            return Err(CraneError::DeployFailed(format!(
                "{} failures fetching upgrade status",
                fails
            )));
        }

        tokio::time::sleep(options.poll_interval).await;

        for &service in &pending {
            if settled.contains(service) {
                continue;
            }

            let state = match fleet.get_entity(service).await.and_then(decode_service) {
                Ok(entity) => entity.state,
                Err(e) => {
                    error!(service = %service, "Couldn't retrieve service info: {}", e);
                    fails += 1;
                    continue;
                }
            };

            match state.as_str() {
                STATE_UPGRADING => {
                    debug!(service = %service, "Still upgrading");
                }
                STATE_UPGRADED => {
                    info!(service = %service, "Rancher says {} is now '{}'", service.name, state);
                    settled.insert(service);
                }
                other => {
                    error!(
                        service = %service,
                        "Rancher says {} is '{}', which I don't know how to handle",
                        service.name,
                        other
                    );
                    fails += 1;
                }
            }
        }
    }

    Ok(())
}
