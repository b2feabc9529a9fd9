//! Version history contract

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::commit::Commit;
use crate::errors::CraneError;

/// Where a version history lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoRef {
    /// A git working copy on the local filesystem
    Local(PathBuf),
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoRef::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Queries against a source-control history
///
/// Every operation fails with [`CraneError::RepositoryUnavailable`] when the
/// repository cannot be opened at all.
#[async_trait]
pub trait VersionHistory: Send + Sync {
    /// Commits reachable from `new` but not from `old`, newest first
    async fn get_commits(
        &self,
        repo: &RepoRef,
        old: &str,
        new: &str,
    ) -> Result<Vec<Commit>, CraneError>;

    /// A single commit, [`CraneError::CommitNotFound`] if `sha` does not resolve
    async fn get_single(&self, repo: &RepoRef, sha: &str) -> Result<Commit, CraneError>;

    /// The commit the current reference points at
    async fn get_head(&self, repo: &RepoRef) -> Result<Commit, CraneError>;

    /// Whether `first` is an ancestor of (or equal to) `second`
    async fn is_ancestor(
        &self,
        repo: &RepoRef,
        first: &str,
        second: &str,
    ) -> Result<bool, CraneError>;
}
