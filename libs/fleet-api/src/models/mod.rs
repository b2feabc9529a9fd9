//! API models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Listing envelope returned by collection endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Minimal resource reference (stacks and services in listings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

/// Container launch configuration, primary or sidekick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Sidekick name, absent on the primary configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Image reference, e.g. `docker:registry/app:<sha>`
    #[serde(default)]
    pub image_uuid: String,

    /// Untyped remainder of the configuration
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Service entity as returned by `GET /v1/projects/{env}/services/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntity {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Lifecycle state: `active`, `upgrading`, `upgraded`, ...
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub launch_config: Option<LaunchConfig>,

    #[serde(default)]
    pub secondary_launch_configs: Vec<LaunchConfig>,
}

/// In-service upgrade strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InServiceStrategy {
    pub batch_size: u32,
    pub interval_millis: u64,
    pub start_first: bool,
    pub launch_config: Option<LaunchConfig>,
    pub secondary_launch_configs: Vec<LaunchConfig>,
}

/// Body of `POST {service}?action=upgrade`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub in_service_strategy: InServiceStrategy,
}

/// Error body returned on non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub status: Option<u16>,
}

impl ApiError {
    /// Rancher refuses the action in the current service state
    pub const ACTION_NOT_AVAILABLE: &'static str = "ActionNotAvailable";

    pub fn is_action_not_available(&self) -> bool {
        self.code.as_deref() == Some(Self::ACTION_NOT_AVAILABLE)
    }
}
