//! Deployment classification from repository ancestry

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::commit::history::{RepoRef, VersionHistory};
use crate::commit::Commit;
use crate::errors::CraneError;

/// What kind of change a deployment is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentKind {
    /// New commits on top of what runs now
    Forward,

    /// Same version again
    Redeploy,

    /// Going back to an older commit
    Rollback,

    /// No traceable path from the old commit to the new one
    Disconnected,
}

impl fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentKind::Forward => "forward",
            DeploymentKind::Redeploy => "redeploy",
            DeploymentKind::Rollback => "rollback",
            DeploymentKind::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// A deployment kind together with the commits worth reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: DeploymentKind,
    pub commits: Vec<Commit>,
}

/// Classifies deployments against one repository
pub struct DeploymentClassifier {
    history: Arc<dyn VersionHistory>,
    repo: RepoRef,
}

impl DeploymentClassifier {
    pub fn new(history: Arc<dyn VersionHistory>, repo: RepoRef) -> Self {
        Self { history, repo }
    }

    pub fn is_redeploy(old: &str, new: &str) -> bool {
        old == new
    }

    /// True when `old` is not an ancestor of `new`
    pub async fn is_disconnected(&self, old: &str, new: &str) -> Result<bool, CraneError> {
        let is_ancestor = self
            .history
            .is_ancestor(&self.repo, old, new)
            .await
            .inspect_err(|e| {
                error!("Can't determine if {} is an ancestor of {}: {}", old, new, e);
            })?;
        Ok(!is_ancestor)
    }

    /// True when the new commit is older than the old one
    pub async fn is_rollback(&self, old: &str, new: &str) -> Result<bool, CraneError> {
        let new_commit = self.commit(new).await?;
        let old_commit = self.commit(old).await?;
        Ok(new_commit.at() < old_commit.at())
    }

    async fn commit(&self, sha: &str) -> Result<Commit, CraneError> {
        self.history
            .get_single(&self.repo, sha)
            .await
            .inspect_err(|e| error!(commit_sha = %sha, "Could not fetch commit: {}", e))
    }

    /// Classify a deployment from `old` to `new`
    ///
    /// Redeploys report nothing, disconnected jumps report only the new
    /// commit, rollbacks report the reverted commits newest first and forward
    /// deploys report the new commits oldest first.
    pub async fn classify(&self, old: &str, new: &str) -> Result<Classification, CraneError> {
        if Self::is_redeploy(old, new) {
            return Ok(Classification {
                kind: DeploymentKind::Redeploy,
                commits: Vec::new(),
            });
        }

        if self.is_disconnected(old, new).await? {
            return Ok(Classification {
                kind: DeploymentKind::Disconnected,
                commits: vec![self.commit(new).await?],
            });
        }

        if self.is_rollback(old, new).await? {
            let commits = self.history.get_commits(&self.repo, new, old).await?;
            return Ok(Classification {
                kind: DeploymentKind::Rollback,
                commits,
            });
        }

        let mut commits = self.history.get_commits(&self.repo, old, new).await?;
        commits.reverse();
        Ok(Classification {
            kind: DeploymentKind::Forward,
            commits,
        })
    }
}
