//! Command-line interface
//!
//! Every flag can also come from the environment, which is how CI jobs
//! usually configure crane.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use secrecy::SecretString;

use crate::announce::Stage;
use crate::app::options::{AnnounceOptions, AppOptions, FleetOptions};
use crate::app::settings::Settings;
use crate::logs::{LogLevel, LogOptions};

/// Rolling upgrades of Rancher stacks
#[derive(Debug, Parser)]
#[command(name = "crane")]
#[command(
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_HASH"),
        ", built ",
        env!("BUILD_TIME"),
        ")"
    ),
    about
)]
pub struct Cli {
    /// Log level
    #[arg(long, env = "CRANE_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log as JSON lines
    #[arg(long, env = "CRANE_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            json_format: self.log_json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upgrade services to a new version
    Deploy(DeployArgs),

    /// Announce a deployment stage without upgrading anything
    Announce(AnnounceCommandArgs),
}

/// Rancher connection flags
#[derive(Debug, Clone, Args)]
pub struct RancherArgs {
    /// Rancher base URL
    #[arg(long = "rancher-url", env = "RANCHER_URL")]
    pub url: String,

    #[arg(long = "rancher-access-key", env = "RANCHER_ACCESS_KEY")]
    pub access_key: String,

    #[arg(long = "rancher-secret-key", env = "RANCHER_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Environment (project) id
    #[arg(long = "rancher-env", env = "RANCHER_ENV_ID")]
    pub env: String,

    /// Stack name, falls back to CI_PROJECT_NAME
    #[arg(long = "rancher-stack", env = "RANCHER_STACK_NAME")]
    pub stack: Option<String>,

    /// Service to upgrade, may be repeated
    #[arg(
        long = "rancher-service",
        env = "RANCHER_SERVICE_NAME",
        value_delimiter = ',',
        default_value = "app"
    )]
    pub services: Vec<String>,

    /// Upgrade this sidekick instead of the primary container
    #[arg(long = "rancher-sidekick", env = "RANCHER_SIDEKICK_NAME")]
    pub sidekick: Option<String>,
}

/// Announcement flags
#[derive(Debug, Clone, Args)]
pub struct AnnounceArgs {
    /// Do not print the deployment story to stdout
    #[arg(long, env = "CRANE_QUIET")]
    pub quiet: bool,

    /// URL to POST successful releases to, may be repeated
    #[arg(long = "webhook-url", env = "CRANE_WEBHOOK_URL", value_delimiter = ',')]
    pub webhook_urls: Vec<String>,

    /// Sent as Auth-Token with each webhook
    #[arg(long, env = "CRANE_WEBHOOK_TOKEN", hide_env_values = true)]
    pub webhook_token: Option<String>,

    /// Slack bot token
    #[arg(long, env = "CRANE_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Slack channel to announce in, may be repeated
    #[arg(long = "channel", env = "CRANE_SLACK_CHANNEL", value_delimiter = ',')]
    pub channels: Vec<String>,
}

impl AnnounceArgs {
    pub fn options(&self) -> AnnounceOptions {
        AnnounceOptions {
            echo: !self.quiet,
            webhook_urls: self.webhook_urls.clone(),
            webhook_token: self.webhook_token.clone().map(SecretString::from),
            slack_token: self.slack_token.clone().map(SecretString::from),
            channels: self.channels.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Commit to deploy, falls back to CI_COMMIT_SHA
    #[arg(long, env = "CRANE_NEW_COMMIT")]
    pub new_commit: Option<String>,

    /// Commit expected to be running now
    #[arg(long, env = "CRANE_OLD_COMMIT")]
    pub old_commit: Option<String>,

    /// Full image to deploy instead of swapping the commit in the tag
    #[arg(long, env = "CRANE_NEW_IMAGE")]
    pub new_image: Option<String>,

    /// Containers to upgrade at once
    #[arg(long, env = "CRANE_BATCH_SIZE", default_value_t = 1)]
    pub batch_size: u32,

    /// Seconds between batches
    #[arg(long, env = "CRANE_BATCH_INTERVAL", default_value_t = 2)]
    pub batch_interval: u64,

    /// Start new containers before stopping old ones
    #[arg(long, env = "CRANE_START_FIRST")]
    pub start_first: bool,

    /// Seconds to wait before finishing the upgrade
    #[arg(long, env = "CRANE_SLEEP_AFTER_UPGRADE", default_value_t = 0)]
    pub sleep_after_upgrade: u64,

    /// Leave the upgrade for you to finish in Rancher
    #[arg(long, env = "CRANE_MANUAL_FINISH")]
    pub manual_finish: bool,

    /// Seconds to wait for services to settle
    #[arg(long, env = "CRANE_WAIT_TIMEOUT", default_value_t = 60)]
    pub wait_timeout: u64,

    /// Status poll failures tolerated while waiting
    #[arg(long, env = "CRANE_FAIL_TIMEOUT", default_value_t = 20)]
    pub fail_timeout: u32,

    /// Working copy of the project, falls back to CI_PROJECT_DIR
    #[arg(long, env = "CRANE_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(flatten)]
    pub rancher: RancherArgs,

    #[command(flatten)]
    pub announce: AnnounceArgs,
}

fn or_env(value: Option<String>, fallback: &str) -> Option<String> {
    value.or_else(|| std::env::var(fallback).ok().filter(|v| !v.is_empty()))
}

impl DeployArgs {
    pub fn options(self) -> AppOptions {
        let settings = Settings {
            env: self.rancher.env.clone(),
            stack: or_env(self.rancher.stack.clone(), "CI_PROJECT_NAME").unwrap_or_default(),
            services: self.rancher.services.clone(),
            old_commit: self.old_commit,
            new_commit: or_env(self.new_commit, "CI_COMMIT_SHA"),
            new_image: self.new_image,
            rancher_sidekick: self.rancher.sidekick.clone(),
            batch_size: self.batch_size,
            batch_interval: self.batch_interval,
            start_first: self.start_first,
            sleep_after_upgrade: self.sleep_after_upgrade,
            manual_finish: self.manual_finish,
            wait_timeout: self.wait_timeout,
            fail_timeout: self.fail_timeout,
            project_dir: self.project_dir.or_else(|| {
                or_env(None, "CI_PROJECT_DIR").map(PathBuf::from)
            }),
        };

        AppOptions {
            fleet: FleetOptions {
                url: self.rancher.url,
                access_key: self.rancher.access_key,
                secret_key: SecretString::from(self.rancher.secret_key),
            },
            announce: self.announce.options(),
            settings,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StageArg {
    Start,
    Success,
    Failure,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Start => Stage::Start,
            StageArg::Success => Stage::Success,
            StageArg::Failure => Stage::Failure,
        }
    }
}

#[derive(Debug, Args)]
pub struct AnnounceCommandArgs {
    /// Stage to announce
    #[arg(value_enum)]
    pub stage: StageArg,

    /// Version being announced, falls back to CI_COMMIT_SHA
    #[arg(long, env = "CRANE_NEW_COMMIT")]
    pub new_commit: Option<String>,

    #[command(flatten)]
    pub announce: AnnounceArgs,
}

impl AnnounceCommandArgs {
    pub fn options(self) -> AppOptions {
        AppOptions {
            announce: self.announce.options(),
            settings: Settings {
                new_commit: or_env(self.new_commit, "CI_COMMIT_SHA"),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
