//! Old/new version resolution from image tags

use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use crate::app::settings::Settings;
use crate::errors::CraneError;

static COMMIT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9a-f]{40}").expect("commit hash pattern is valid"));

/// Version tokens of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versions {
    /// What is running now
    pub old: String,

    /// What we upgrade to
    pub new: String,
}

/// Every 40-hex commit hash embedded in an image reference
pub fn commit_hashes(image: &str) -> Vec<&str> {
    COMMIT_HASH.find_iter(image).map(|m| m.as_str()).collect()
}

/// The single commit hash embedded in an image reference, if exactly one
pub fn unique_commit_hash(image: &str) -> Option<&str> {
    match commit_hashes(image)[..] {
        [hash] => Some(hash),
        _ => None,
    }
}

fn tag(image: &str) -> &str {
    image.rsplit(':').next().unwrap_or(image)
}

/// Derive version tokens from the image currently running
///
/// With an image override, both tokens are the trailing tag segments. Without
/// one, the running image must embed exactly one commit hash, which is
/// replaced by the configured new commit.
pub fn resolve_versions(current_image: &str, settings: &Settings) -> Result<Versions, CraneError> {
    let versions = match settings.new_image() {
        Some(new_image) => Versions {
            old: tag(current_image).to_string(),
            new: tag(new_image).to_string(),
        },
        None => {
            let hashes = commit_hashes(current_image);
            let old = match hashes[..] {
                [hash] => hash.to_string(),
                [] => {
                    error!(
                        old_image = %current_image,
                        "Your existing image seems to have no commit hash in its tag for me to be \
                         able to upgrade to the new commit, but it's currently tagged as just :{}",
                        tag(current_image)
                    );
                    return Err(CraneError::DeployFailed(format!(
                        "no commit hash in image {}",
                        current_image
                    )));
                }
                _ => {
                    error!(
                        matches = ?hashes,
                        "Your existing image seems to have multiple commit hashes in its tag, \
                         I don't know which one to replace"
                    );
                    return Err(CraneError::DeployFailed(format!(
                        "multiple commit hashes in image {}",
                        current_image
                    )));
                }
            };
            let new = settings.new_commit().ok_or_else(|| {
                CraneError::DeployFailed("no new commit to upgrade to".to_string())
            })?;
            Versions {
                old,
                new: new.to_string(),
            }
        }
    };

    if versions.old.is_empty() || versions.new.is_empty() {
        return Err(CraneError::DeployFailed(format!(
            "could not derive versions from {}",
            current_image
        )));
    }

    Ok(versions)
}
