//! Stack and service value objects

use std::fmt;

/// Anything addressable on the platform by an API and a web URL
pub trait EntityLocator: fmt::Debug + Send + Sync {
    /// URL of the entity in the Rancher UI
    fn web_url(&self) -> String;

    /// URL of the entity in the v1 API
    fn api_url(&self) -> String;
}

/// A named grouping of services
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stack {
    pub id: String,
    pub url: String,
    pub env: String,
    pub name: String,
}

impl EntityLocator for Stack {
    fn web_url(&self) -> String {
        format!("{}/env/{}/apps/stacks/{}", self.url, self.env, self.id)
    }

    fn api_url(&self) -> String {
        format!("{}/v1/projects/{}/environments/{}", self.url, self.env, self.id)
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A deployable unit within a stack
///
/// Carries its own copy of the owning stack; both are immutable query
/// results so they compare and hash by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Service {
    pub id: String,
    pub url: String,
    pub env: String,
    pub name: String,
    pub stack: Stack,
}

impl EntityLocator for Service {
    fn web_url(&self) -> String {
        format!("{}/services/{}/containers", self.stack.web_url(), self.id)
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/services/{}",
            self.stack.url, self.stack.env, self.id
        )
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stack.name, self.name)
    }
}
