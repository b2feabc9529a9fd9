//! Commits and version history

pub mod history;
pub mod local;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CraneError;

/// A single commit as reported by a version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    hexsha: String,
    summary: String,
    author: String,
    at: DateTime<Utc>,
}

impl Commit {
    /// Build a commit, rejecting records without a usable hexsha
    pub fn new(
        hexsha: impl Into<String>,
        summary: impl Into<String>,
        author: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, CraneError> {
        let hexsha = hexsha.into();
        let summary = summary.into();
        let author = author.into();

        if hexsha.is_empty() && summary.is_empty() && author.is_empty() {
            return Err(CraneError::EmptyCommit);
        }
        if hexsha.trim().is_empty() {
            return Err(CraneError::HexShaMandatory);
        }

        Ok(Self {
            hexsha,
            summary,
            author,
            at,
        })
    }

    pub fn hexsha(&self) -> &str {
        &self.hexsha
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Commit timestamp
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }
}
