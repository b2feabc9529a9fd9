//! Upgrade request construction

use fleet_api::{InServiceStrategy, LaunchConfig, ServiceEntity, UpgradeRequest};
use serde_json::Value;

use crate::app::settings::Settings;
use crate::errors::CraneError;

/// Decode a service entity document
///
/// Accepts both the bare entity and a `data` listing wrapping it.
pub fn decode_service(document: Value) -> Result<ServiceEntity, CraneError> {
    let body = match document {
        Value::Object(mut map) if !map.contains_key("launchConfig") && map.contains_key("data") => {
            match map.remove("data") {
                Some(Value::Array(mut items)) if !items.is_empty() => items.swap_remove(0),
                _ => {
                    return Err(CraneError::DecodeFailed(
                        "service listing has no entries".to_string(),
                    ))
                }
            }
        }
        other => other,
    };
    serde_json::from_value(body).map_err(|e| CraneError::DecodeFailed(e.to_string()))
}

/// The launch config an upgrade acts on: the named sidekick when one is
/// configured, the primary config otherwise
pub fn target_launch_config<'a>(
    entity: &'a ServiceEntity,
    sidekick: Option<&str>,
) -> Result<&'a LaunchConfig, CraneError> {
    match sidekick {
        Some(name) => entity
            .secondary_launch_configs
            .iter()
            .find(|config| config.name.as_deref() == Some(name))
            .ok_or_else(|| payload_error(entity, format!("no sidekick named '{}'", name))),
        None => entity
            .launch_config
            .as_ref()
            .ok_or_else(|| payload_error(entity, "service has no launch config".to_string())),
    }
}

/// Build the in-service upgrade request for a service
pub fn build_upgrade_request(
    entity: &ServiceEntity,
    old_version: &str,
    new_version: &str,
    settings: &Settings,
) -> Result<UpgradeRequest, CraneError> {
    let mut launch_config = target_launch_config(entity, settings.sidekick())?.clone();

    launch_config.image_uuid = match settings.new_image() {
        Some(image) => format!("docker:{}", image),
        None => launch_config.image_uuid.replace(old_version, new_version),
    };

    let (primary, secondary) = match settings.sidekick() {
        Some(_) => (None, vec![launch_config]),
        None => (Some(launch_config), Vec::new()),
    };

    Ok(UpgradeRequest {
        in_service_strategy: InServiceStrategy {
            batch_size: settings.batch_size,
            interval_millis: settings.batch_interval_millis(),
            start_first: settings.start_first,
            launch_config: primary,
            secondary_launch_configs: secondary,
        },
    })
}

fn payload_error(entity: &ServiceEntity, message: String) -> CraneError {
    CraneError::UpgradeFailed {
        service: entity.name.clone(),
        message,
        action_not_available: false,
    }
}
