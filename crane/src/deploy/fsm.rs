//! Finite State Machine for a stack upgrade run

use serde::{Deserialize, Serialize};

/// Upgrade run state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeState {
    /// Looking up the stack by name
    ResolveStack,

    /// Looking up each service by name
    ResolveServices,

    /// Repository reachability and cross-service version checks
    CheckPreconditions,

    /// Deriving old and new version tokens
    ResolveVersions,

    /// Issuing upgrade commands
    StartUpgrade,

    /// Polling until every service reports upgraded
    WaitForSettle,

    /// Finishing the upgrade on the platform
    Finish,

    /// Terminal success
    Done,

    /// Terminal failure
    Failed,
}

impl UpgradeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UpgradeState::Done | UpgradeState::Failed)
    }
}

/// Upgrade run event
#[derive(Debug, Clone)]
pub enum UpgradeEvent {
    StackResolved,
    ServicesResolved,
    PreconditionsChecked,
    VersionsResolved,
    UpgradeStarted,
    Settled,
    Finished,

    /// Abort the run from any non-terminal state
    Fail(String),
}

/// Upgrade FSM
#[derive(Debug, Clone)]
pub struct UpgradeFsm {
    state: UpgradeState,
    error: Option<String>,
}

impl UpgradeFsm {
    /// Create a new FSM at the start of a run
    pub fn new() -> Self {
        Self {
            state: UpgradeState::ResolveStack,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &UpgradeState {
        &self.state
    }

    /// Get the failure reason if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: UpgradeEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (UpgradeState::ResolveStack, UpgradeEvent::StackResolved) => {
                UpgradeState::ResolveServices
            }
            (UpgradeState::ResolveServices, UpgradeEvent::ServicesResolved) => {
                UpgradeState::CheckPreconditions
            }
            (UpgradeState::CheckPreconditions, UpgradeEvent::PreconditionsChecked) => {
                UpgradeState::ResolveVersions
            }
            (UpgradeState::ResolveVersions, UpgradeEvent::VersionsResolved) => {
                UpgradeState::StartUpgrade
            }
            (UpgradeState::StartUpgrade, UpgradeEvent::UpgradeStarted) => {
                UpgradeState::WaitForSettle
            }
            (UpgradeState::WaitForSettle, UpgradeEvent::Settled) => UpgradeState::Finish,
            (UpgradeState::Finish, UpgradeEvent::Finished) => UpgradeState::Done,

            (state, UpgradeEvent::Fail(err)) if !state.is_terminal() => {
                self.error = Some(err.clone());
                UpgradeState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for UpgradeFsm {
    fn default() -> Self {
        Self::new()
    }
}
