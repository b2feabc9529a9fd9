//! Local git repository reader

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tracing::debug;

use crate::commit::history::{RepoRef, VersionHistory};
use crate::commit::Commit;
use crate::errors::CraneError;

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';
const LOG_FORMAT: &str = "--format=%H%x1f%s%x1f%an <%ae>%x1f%ct%x1e";

/// Reads history from a working copy through the `git` binary
#[derive(Debug, Clone, Default)]
pub struct LocalRepository;

impl LocalRepository {
    pub fn new() -> Self {
        Self
    }

    async fn git(&self, path: &Path, args: &[&str]) -> Result<Output, CraneError> {
        debug!("git {} (in {})", args.join(" "), path.display());
        Command::new("git")
            .current_dir(path)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                CraneError::RepositoryUnavailable(format!(
                    "Failed to run git in {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    async fn open<'a>(&self, repo: &'a RepoRef) -> Result<&'a Path, CraneError> {
        let RepoRef::Local(path) = repo;
        let output = self.git(path, &["rev-parse", "--git-dir"]).await?;
        if !output.status.success() {
            return Err(CraneError::RepositoryUnavailable(format!(
                "{} is not a git repository",
                path.display()
            )));
        }
        Ok(path.as_path())
    }

    async fn resolve(&self, path: &Path, sha: &str) -> Result<String, CraneError> {
        if sha.is_empty() || sha.starts_with('-') {
            return Err(CraneError::CommitNotFound(sha.to_string()));
        }
        let spec = format!("{}^{{commit}}", sha);
        let output = self
            .git(path, &["rev-parse", "--verify", "--quiet", spec.as_str()])
            .await?;
        if !output.status.success() {
            return Err(CraneError::CommitNotFound(sha.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn log(&self, path: &Path, args: &[&str]) -> Result<Vec<Commit>, CraneError> {
        let mut full = vec!["log", LOG_FORMAT];
        full.extend_from_slice(args);
        let output = self.git(path, &full).await?;
        if !output.status.success() {
            return Err(CraneError::HistoryError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        parse_log(&String::from_utf8_lossy(&output.stdout))
    }

    async fn single(&self, path: &Path, sha: &str) -> Result<Commit, CraneError> {
        let resolved = self.resolve(path, sha).await?;
        self.log(path, &["-1", resolved.as_str()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CraneError::CommitNotFound(sha.to_string()))
    }
}

#[async_trait]
impl VersionHistory for LocalRepository {
    async fn get_commits(
        &self,
        repo: &RepoRef,
        old: &str,
        new: &str,
    ) -> Result<Vec<Commit>, CraneError> {
        let path = self.open(repo).await?;
        let old = self.resolve(path, old).await?;
        let new = self.resolve(path, new).await?;
        let range = format!("{}..{}", old, new);
        self.log(path, &[range.as_str()]).await
    }

    async fn get_single(&self, repo: &RepoRef, sha: &str) -> Result<Commit, CraneError> {
        let path = self.open(repo).await?;
        self.single(path, sha).await
    }

    async fn get_head(&self, repo: &RepoRef) -> Result<Commit, CraneError> {
        let path = self.open(repo).await?;
        self.single(path, "HEAD").await
    }

    async fn is_ancestor(
        &self,
        repo: &RepoRef,
        first: &str,
        second: &str,
    ) -> Result<bool, CraneError> {
        let path = self.open(repo).await?;
        let first = self.resolve(path, first).await?;
        let second = self.resolve(path, second).await?;
        let output = self
            .git(path, &["merge-base", "--is-ancestor", first.as_str(), second.as_str()])
            .await?;

        // 0: ancestor, 1: not an ancestor, anything else is a git failure
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(CraneError::HistoryError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }
}

/// Parse `git log` output produced with [`LOG_FORMAT`]
fn parse_log(output: &str) -> Result<Vec<Commit>, CraneError> {
    let mut commits = Vec::new();

    for record in output.split(RECORD_SEP) {
        let record = record.trim_matches('\n');
        if record.is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.splitn(4, FIELD_SEP).collect();
        let [hexsha, summary, author, timestamp] = fields[..] else {
            return Err(CraneError::HistoryError(format!(
                "Unexpected log record: {:?}",
                record
            )));
        };

        let secs: i64 = timestamp.trim().parse().map_err(|_| {
            CraneError::HistoryError(format!("Bad commit timestamp: {:?}", timestamp))
        })?;
        let at = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
            CraneError::HistoryError(format!("Commit timestamp out of range: {}", secs))
        })?;

        commits.push(Commit::new(hexsha, summary, author, at)?);
    }

    Ok(commits)
}
