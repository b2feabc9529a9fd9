//! Deployment classifier tests

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_test::{assert_err, assert_ok};

use crane::commit::history::{RepoRef, VersionHistory};
use crane::commit::Commit;
use crane::deploy::classifier::{DeploymentClassifier, DeploymentKind};
use crane::errors::CraneError;

fn commit(sha: &str, at: i64) -> Commit {
    Commit::new(
        sha,
        format!("Commit {}", sha),
        "Jane Doe <jane@example.com>",
        DateTime::<Utc>::from_timestamp(at, 0).unwrap(),
    )
    .unwrap()
}

/// History answering from fixed tables
#[derive(Default)]
struct FakeHistory {
    commits: HashMap<String, Commit>,
    ranges: HashMap<(String, String), Vec<Commit>>,
    ancestry: HashSet<(String, String)>,
    broken: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeHistory {
    fn with_commits(commits: &[Commit]) -> Self {
        Self {
            commits: commits
                .iter()
                .map(|c| (c.hexsha().to_string(), c.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn ancestor(mut self, first: &str, second: &str) -> Self {
        self.ancestry.insert((first.to_string(), second.to_string()));
        self
    }

    fn range(mut self, old: &str, new: &str, commits: Vec<Commit>) -> Self {
        self.ranges.insert((old.to_string(), new.to_string()), commits);
        self
    }

    fn record(&self, call: String) -> Result<(), CraneError> {
        self.calls.lock().unwrap().push(call);
        if self.broken {
            return Err(CraneError::RepositoryUnavailable("gone".to_string()));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionHistory for FakeHistory {
    async fn get_commits(
        &self,
        _repo: &RepoRef,
        old: &str,
        new: &str,
    ) -> Result<Vec<Commit>, CraneError> {
        self.record(format!("get_commits {}..{}", old, new))?;
        Ok(self
            .ranges
            .get(&(old.to_string(), new.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_single(&self, _repo: &RepoRef, sha: &str) -> Result<Commit, CraneError> {
        self.record(format!("get_single {}", sha))?;
        self.commits
            .get(sha)
            .cloned()
            .ok_or_else(|| CraneError::CommitNotFound(sha.to_string()))
    }

    async fn get_head(&self, _repo: &RepoRef) -> Result<Commit, CraneError> {
        self.record("get_head".to_string())?;
        self.commits
            .values()
            .max_by_key(|c| c.at())
            .cloned()
            .ok_or_else(|| CraneError::HistoryError("empty".to_string()))
    }

    async fn is_ancestor(
        &self,
        _repo: &RepoRef,
        first: &str,
        second: &str,
    ) -> Result<bool, CraneError> {
        self.record(format!("is_ancestor {} {}", first, second))?;
        Ok(first == second
            || self
                .ancestry
                .contains(&(first.to_string(), second.to_string())))
    }
}

fn classifier(history: Arc<FakeHistory>) -> DeploymentClassifier {
    DeploymentClassifier::new(history, RepoRef::Local(PathBuf::from("/srv/app")))
}

#[tokio::test]
async fn test_redeploy_touches_no_history() {
    let history = Arc::new(FakeHistory::default());
    let classification = assert_ok!(classifier(history.clone()).classify("a", "a").await);

    assert_eq!(classification.kind, DeploymentKind::Redeploy);
    assert!(classification.commits.is_empty());
    assert!(history.calls().is_empty());
}

#[tokio::test]
async fn test_redeploy_wins_over_broken_history() {
    let history = Arc::new(FakeHistory {
        broken: true,
        ..Default::default()
    });
    let classification = assert_ok!(classifier(history).classify("a", "a").await);
    assert_eq!(classification.kind, DeploymentKind::Redeploy);
}

#[tokio::test]
async fn test_forward_lists_new_commits_oldest_first() {
    let (a, b, c) = (commit("a", 100), commit("b", 200), commit("c", 300));
    let history = Arc::new(
        FakeHistory::with_commits(&[a.clone(), b.clone(), c.clone()])
            .ancestor("a", "c")
            .range("a", "c", vec![c.clone(), b.clone()]),
    );

    let classification = assert_ok!(classifier(history).classify("a", "c").await);
    assert_eq!(classification.kind, DeploymentKind::Forward);
    assert_eq!(classification.commits, vec![b, c]);
}

#[tokio::test]
async fn test_disconnected_reports_only_new_commit() {
    let (old, new) = (commit("old", 100), commit("new", 200));
    let history = Arc::new(FakeHistory::with_commits(&[old, new.clone()]));

    let classification = assert_ok!(classifier(history.clone()).classify("old", "new").await);
    assert_eq!(classification.kind, DeploymentKind::Disconnected);
    assert_eq!(classification.commits, vec![new]);
    assert!(!history.calls().iter().any(|c| c.starts_with("get_commits")));
}

#[tokio::test]
async fn test_rollback_lists_reverted_commits_newest_first() {
    // Rewritten history: the old commit is an ancestor yet carries a later date
    let (old, mid, new) = (commit("old", 300), commit("mid", 250), commit("new", 200));
    let history = Arc::new(
        FakeHistory::with_commits(&[old.clone(), mid.clone(), new.clone()])
            .ancestor("old", "new")
            .range("new", "old", vec![old.clone(), mid.clone()]),
    );

    let classification = assert_ok!(classifier(history.clone()).classify("old", "new").await);
    assert_eq!(classification.kind, DeploymentKind::Rollback);
    assert_eq!(classification.commits, vec![old, mid]);
    assert!(history.calls().contains(&"get_commits new..old".to_string()));
}

#[tokio::test]
async fn test_predicates() {
    let (old, new) = (commit("old", 300), commit("new", 200));
    let history = Arc::new(FakeHistory::with_commits(&[old, new]).ancestor("old", "new"));
    let classifier = classifier(history);

    assert!(DeploymentClassifier::is_redeploy("x", "x"));
    assert!(!DeploymentClassifier::is_redeploy("x", "y"));
    assert!(!assert_ok!(classifier.is_disconnected("old", "new").await));
    assert!(assert_ok!(classifier.is_disconnected("new", "old").await));
    assert!(assert_ok!(classifier.is_rollback("old", "new").await));
    assert!(!assert_ok!(classifier.is_rollback("new", "old").await));
}

#[tokio::test]
async fn test_history_errors_propagate() {
    let history = Arc::new(FakeHistory {
        broken: true,
        ..Default::default()
    });
    let result = classifier(history).classify("a", "b").await;
    assert!(matches!(
        assert_err!(result),
        CraneError::RepositoryUnavailable(_)
    ));
}

#[tokio::test]
async fn test_unknown_commit_propagates() {
    let history = Arc::new(
        FakeHistory::with_commits(&[commit("old", 100)]).ancestor("old", "ghost"),
    );
    let result = classifier(history).classify("old", "ghost").await;
    assert!(matches!(assert_err!(result), CraneError::CommitNotFound(_)));
}
