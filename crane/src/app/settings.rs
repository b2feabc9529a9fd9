//! Deployment settings

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::commit::history::RepoRef;

/// What to deploy and how
///
/// Mirrors the recognized deployment keys. Optional keys fall back to the
/// defaults below when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Rancher environment (project) id
    #[serde(default)]
    pub env: String,

    /// Stack name
    #[serde(default)]
    pub stack: String,

    /// Services to upgrade, in order
    #[serde(default)]
    pub services: Vec<String>,

    /// Version the operator expects to be running
    #[serde(default)]
    pub old_commit: Option<String>,

    /// Commit to upgrade to
    #[serde(default)]
    pub new_commit: Option<String>,

    /// Full image reference to upgrade to, overriding commit substitution
    #[serde(default)]
    pub new_image: Option<String>,

    /// Sidekick launch config to upgrade instead of the primary one
    #[serde(default)]
    pub rancher_sidekick: Option<String>,

    /// Containers to upgrade at once
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Seconds between batches
    #[serde(default = "default_batch_interval")]
    pub batch_interval: u64,

    /// Start new containers before stopping old ones
    #[serde(default)]
    pub start_first: bool,

    /// Seconds to wait between settling and finishing the upgrade
    #[serde(default)]
    pub sleep_after_upgrade: u64,

    /// Leave the upgrade unfinished for the operator
    #[serde(default)]
    pub manual_finish: bool,

    /// Seconds to wait for all services to settle
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,

    /// Poll failures tolerated while waiting
    #[serde(default = "default_fail_timeout")]
    pub fail_timeout: u32,

    /// Working copy of the deployed project
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
}

fn default_batch_size() -> u32 {
    1
}

fn default_batch_interval() -> u64 {
    2
}

fn default_wait_timeout() -> u64 {
    60
}

fn default_fail_timeout() -> u32 {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: String::new(),
            stack: String::new(),
            services: Vec::new(),
            old_commit: None,
            new_commit: None,
            new_image: None,
            rancher_sidekick: None,
            batch_size: default_batch_size(),
            batch_interval: default_batch_interval(),
            start_first: false,
            sleep_after_upgrade: 0,
            manual_finish: false,
            wait_timeout: default_wait_timeout(),
            fail_timeout: default_fail_timeout(),
            project_dir: None,
        }
    }
}

impl Settings {
    /// Configured sidekick, with an empty name treated as none
    pub fn sidekick(&self) -> Option<&str> {
        self.rancher_sidekick.as_deref().filter(|s| !s.is_empty())
    }

    /// Configured image override, with an empty value treated as none
    pub fn new_image(&self) -> Option<&str> {
        self.new_image.as_deref().filter(|s| !s.is_empty())
    }

    pub fn new_commit(&self) -> Option<&str> {
        self.new_commit.as_deref().filter(|s| !s.is_empty())
    }

    pub fn old_commit(&self) -> Option<&str> {
        self.old_commit.as_deref().filter(|s| !s.is_empty())
    }

    /// The version the deployment targets: the image tag when an image
    /// override is given, the new commit otherwise
    pub fn target_version(&self) -> Option<&str> {
        match self.new_image() {
            Some(image) => image.rsplit(':').next(),
            None => self.new_commit(),
        }
    }

    /// Repository holding the project's history, if known
    pub fn repo(&self) -> Option<RepoRef> {
        self.project_dir.clone().map(RepoRef::Local)
    }

    pub fn batch_interval_millis(&self) -> u64 {
        self.batch_interval * 1000
    }

    pub fn sleep_after_upgrade(&self) -> Duration {
        Duration::from_secs(self.sleep_after_upgrade)
    }
}
