//! Application configuration options

use secrecy::SecretString;

use crate::announce::slack::SLACK_API_URL;
use crate::app::settings::Settings;
use crate::fleet::client::FleetAuth;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Rancher connection
    pub fleet: FleetOptions,

    /// Announcement channels
    pub announce: AnnounceOptions,

    /// The deployment itself
    pub settings: Settings,
}

/// Rancher connection options
#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// Rancher base URL
    pub url: String,

    pub access_key: String,

    pub secret_key: SecretString,
}

impl Default for FleetOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            access_key: String::new(),
            secret_key: SecretString::from(String::new()),
        }
    }
}

impl FleetOptions {
    pub fn auth(&self) -> FleetAuth {
        FleetAuth {
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
        }
    }
}

/// Announcement options
#[derive(Debug, Clone)]
pub struct AnnounceOptions {
    /// Print the deployment story to stdout
    pub echo: bool,

    /// URLs to POST successful releases to
    pub webhook_urls: Vec<String>,

    /// Sent as `Auth-Token` with each webhook
    pub webhook_token: Option<SecretString>,

    /// Slack bot token, enables Slack announcements
    pub slack_token: Option<SecretString>,

    /// Slack Web API base URL
    pub slack_url: String,

    /// Slack channels to announce in
    pub channels: Vec<String>,
}

impl Default for AnnounceOptions {
    fn default() -> Self {
        Self {
            echo: true,
            webhook_urls: Vec::new(),
            webhook_token: None,
            slack_token: None,
            slack_url: SLACK_API_URL.to_string(),
            channels: Vec::new(),
        }
    }
}
