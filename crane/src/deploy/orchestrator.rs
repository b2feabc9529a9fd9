//! Stack upgrade orchestration

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::settings::Settings;
use crate::commit::history::{RepoRef, VersionHistory};
use crate::deploy::classifier::{Classification, DeploymentClassifier};
use crate::deploy::fsm::{UpgradeEvent, UpgradeFsm, UpgradeState};
use crate::deploy::settle::{wait_for_settle, SettleOptions};
use crate::deploy::versions::{resolve_versions, unique_commit_hash, Versions};
use crate::errors::CraneError;
use crate::fleet::client::FleetControl;
use crate::fleet::models::{Service, Stack};
use crate::fleet::payload::{decode_service, target_launch_config};

/// Everything known about a run once it is ready to upgrade
#[derive(Debug, Clone)]
pub struct Deployment {
    pub stack: Stack,
    pub services: Vec<Service>,
    pub versions: Versions,

    /// History features are disabled for this run
    pub limited: bool,

    /// Kind and reportable commits, absent in limited mode
    pub classification: Option<Classification>,
}

/// Drives one stack upgrade from name resolution to finish
pub struct UpgradeOrchestrator {
    fleet: Arc<dyn FleetControl>,
    history: Arc<dyn VersionHistory>,
    settings: Settings,
    settle: SettleOptions,
    fsm: UpgradeFsm,
}

impl UpgradeOrchestrator {
    pub fn new(
        fleet: Arc<dyn FleetControl>,
        history: Arc<dyn VersionHistory>,
        settings: Settings,
    ) -> Self {
        let settle = SettleOptions::from_settings(&settings);
        Self {
            fleet,
            history,
            settings,
            settle,
            fsm: UpgradeFsm::new(),
        }
    }

    /// Override how the settle wait polls
    pub fn with_settle_options(mut self, settle: SettleOptions) -> Self {
        self.settle = settle;
        self
    }

    /// Get the current run state
    pub fn state(&self) -> &UpgradeState {
        self.fsm.state()
    }

    /// Get the failure reason if the run failed
    pub fn error(&self) -> Option<&str> {
        self.fsm.error()
    }

    /// Run the whole upgrade
    pub async fn deploy(&mut self) -> Result<Deployment, CraneError> {
        let deployment = self.prepare().await?;
        self.execute(&deployment).await?;
        Ok(deployment)
    }

    /// Resolve targets, check preconditions and versions, and classify
    pub async fn prepare(&mut self) -> Result<Deployment, CraneError> {
        let stack = self.get_stack().await?;
        self.advance(UpgradeEvent::StackResolved)?;

        let services = self.get_services(&stack).await?;
        self.advance(UpgradeEvent::ServicesResolved)?;

        let repo = match self.check_preconditions(&services).await {
            Ok(repo) => repo,
            Err(CraneError::LimitedMode(reason)) => {
                warn!(
                    "Some preconditions are not met ({}). Working in limited mode, \
                     all hooks have been disabled",
                    reason
                );
                None
            }
            Err(e) => {
                error!("Some preconditions failed! Check the logs for details");
                return Err(self.fail(failure_reason(e)));
            }
        };
        self.advance(UpgradeEvent::PreconditionsChecked)?;

        let versions = self.get_versions(&services[0]).await?;
        self.advance(UpgradeEvent::VersionsResolved)?;

        let classification = match repo {
            Some(repo) => self.classify(repo, &versions).await,
            None => None,
        };

        Ok(Deployment {
            stack,
            services,
            versions,
            limited: classification.is_none(),
            classification,
        })
    }

    /// Start the upgrade, wait for it to settle and finish it
    pub async fn execute(&mut self, deployment: &Deployment) -> Result<(), CraneError> {
        if self.fsm.state() != &UpgradeState::StartUpgrade {
            return Err(CraneError::InvalidTransition(format!(
                "cannot start upgrade from {:?}",
                self.fsm.state()
            )));
        }

        self.start_upgrade(deployment).await?;
        self.advance(UpgradeEvent::UpgradeStarted)?;

        if let Err(e) = wait_for_settle(
            self.fleet.clone(),
            deployment.services.clone(),
            self.settle.clone(),
        )
        .await
        {
            return Err(self.fail(failure_reason(e)));
        }
        self.advance(UpgradeEvent::Settled)?;

        self.finish_upgrade(&deployment.services).await?;
        self.advance(UpgradeEvent::Finished)?;

        info!(stack = %deployment.stack, "Upgrade done");
        Ok(())
    }

    fn advance(&mut self, event: UpgradeEvent) -> Result<(), CraneError> {
        self.fsm.process(event).map_err(CraneError::InvalidTransition)
    }

    /// Move to Failed and build the error surfaced to the caller
    fn fail(&mut self, reason: String) -> CraneError {
        if let Err(e) = self.fsm.process(UpgradeEvent::Fail(reason.clone())) {
            warn!("{}", e);
        }
        CraneError::DeployFailed(reason)
    }

    async fn get_stack(&mut self) -> Result<Stack, CraneError> {
        let result = self
            .fleet
            .get_stack_from_name(&self.settings.env, &self.settings.stack)
            .await;

        result.map_err(|e| {
            error!(
                env = %self.settings.env,
                stack = %self.settings.stack,
                "I could not find that stack: {}",
                e
            );
            self.fail(failure_reason(e))
        })
    }

    async fn get_services(&mut self, stack: &Stack) -> Result<Vec<Service>, CraneError> {
        if self.settings.services.is_empty() {
            return Err(self.fail("no services to upgrade".to_string()));
        }

        let mut services: Vec<Service> = Vec::with_capacity(self.settings.services.len());
        for name in self.settings.services.clone() {
            if services.iter().any(|service| service.name == name) {
                warn!(service = %name, "Service listed more than once, upgrading it once");
                continue;
            }
            match self.fleet.get_service_from_name(stack, &name).await {
                Ok(service) => services.push(service),
                Err(e) => {
                    error!(stack = %stack, service = %name, "Could not get service: {}", e);
                    return Err(self.fail(failure_reason(e)));
                }
            }
        }

        Ok(services)
    }

    /// Returns the repository to use for history features, `None` when it is
    /// unusable. `LimitedMode` never escapes; other errors abort the run.
    async fn check_preconditions(
        &self,
        services: &[Service],
    ) -> Result<Option<RepoRef>, CraneError> {
        let mut limited = None;

        let repo = match self.check_repository().await {
            Ok(repo) => Some(repo),
            Err(e) => {
                limited = Some(e.to_string());
                None
            }
        };

        if self.settings.new_image().is_none() {
            if let Err(e) = self.check_service_versions(services).await {
                match e {
                    CraneError::LimitedMode(reason) => limited = Some(reason),
                    e => return Err(e),
                }
            }
        }

        match limited {
            Some(reason) => Err(CraneError::LimitedMode(reason)),
            None => Ok(repo),
        }
    }

    async fn check_repository(&self) -> Result<RepoRef, CraneError> {
        let Some(repo) = self.settings.repo() else {
            error!(
                "You are not running crane in a Git repository. crane is running in limited mode, \
                 all hooks have been disabled. It is highly recommended you use Git references \
                 for your deployments"
            );
            return Err(CraneError::LimitedMode("no project directory".to_string()));
        };

        if let Err(e) = self.history.get_head(&repo).await {
            error!(
                repo = %repo,
                "You are not running crane in a Git repository ({}). crane is running in limited \
                 mode, all hooks have been disabled",
                e
            );
            return Err(CraneError::LimitedMode(e.to_string()));
        }

        let target = self.settings.target_version().unwrap_or_default();
        if let Err(e) = self.history.get_single(&repo, target).await {
            error!(
                "The new version you specified, {}, is not a valid git reference ({}). crane is \
                 running in limited mode, all hooks have been disabled",
                target,
                e
            );
            return Err(CraneError::LimitedMode(e.to_string()));
        }

        Ok(repo)
    }

    /// Every service must run the same version before it is upgraded
    async fn check_service_versions(&self, services: &[Service]) -> Result<(), CraneError> {
        let mut images = Vec::with_capacity(services.len());
        for service in services {
            let image = self.current_image(service).await.map_err(|e| match e {
                CraneError::ValidationError(_) => e,
                e => CraneError::LimitedMode(e.to_string()),
            })?;
            images.push((service, image));
        }

        let expected = match self.settings.old_commit() {
            Some(old) => old.to_string(),
            None => match images.first().and_then(|(_, image)| unique_commit_hash(image)) {
                Some(hash) => hash.to_string(),
                // Nothing to compare against, version resolution reports it
                None => return Ok(()),
            },
        };

        for (service, image) in &images {
            if !image.contains(&expected) {
                error!(
                    service = %service,
                    image = %image,
                    expected = %expected,
                    "All selected services must have the same commit SHA. Please manually change \
                     their versions so they are all the same, and then retry the upgrade"
                );
                return Err(CraneError::ValidationError(format!(
                    "{} runs {}, expected {}",
                    service, image, expected
                )));
            }
        }

        Ok(())
    }

    /// Image of the launch config that will be upgraded
    async fn current_image(&self, service: &Service) -> Result<String, CraneError> {
        let entity = self
            .fleet
            .get_entity(service)
            .await
            .and_then(decode_service)
            .inspect_err(|e| error!(service = %service, "I could not query service: {}", e))?;

        let config = target_launch_config(&entity, self.settings.sidekick())
            .map_err(|e| CraneError::ValidationError(e.to_string()))?;
        Ok(config.image_uuid.clone())
    }

    async fn get_versions(&mut self, service: &Service) -> Result<Versions, CraneError> {
        let image = match self.current_image(service).await {
            Ok(image) => image,
            Err(e) => return Err(self.fail(failure_reason(e))),
        };

        match resolve_versions(&image, &self.settings) {
            Ok(versions) => {
                info!(old = %versions.old, new = %versions.new, "Resolved versions");
                Ok(versions)
            }
            Err(e) => {
                error!("Something went wrong while fetching versions: {}", e);
                Err(self.fail(failure_reason(e)))
            }
        }
    }

    async fn classify(&self, repo: RepoRef, versions: &Versions) -> Option<Classification> {
        let classifier = DeploymentClassifier::new(self.history.clone(), repo);
        match classifier.classify(&versions.old, &versions.new).await {
            Ok(classification) => {
                info!(
                    kind = %classification.kind,
                    commits = classification.commits.len(),
                    "Classified deployment"
                );
                Some(classification)
            }
            Err(e) => {
                warn!("Could not classify deployment, continuing in limited mode: {}", e);
                None
            }
        }
    }

    async fn start_upgrade(&mut self, deployment: &Deployment) -> Result<(), CraneError> {
        let Versions { old, new } = &deployment.versions;

        for service in &deployment.services {
            let result = self
                .fleet
                .upgrade_service(service, old, new, &self.settings)
                .await;

            if let Err(e) = result {
                error!(service = %service, "Couldn't upgrade service: {}", e);
                return Err(self.fail(failure_reason(e)));
            }
        }

        Ok(())
    }

    async fn finish_upgrade(&mut self, services: &[Service]) -> Result<(), CraneError> {
        let delay = self.settings.sleep_after_upgrade();
        if !delay.is_zero() {
            info!("Upgrade done, waiting {:?} as requested", delay);
            tokio::time::sleep(delay).await;
        }

        if self.settings.manual_finish {
            info!("Manual finish requested, leaving the upgrade for you to finish");
            return Ok(());
        }

        for service in services {
            if let Err(e) = self.fleet.finish_upgrade_service(service).await {
                error!(service = %service, "Couldn't finish upgrading service: {}", e);
                return Err(self.fail(failure_reason(e)));
            }
        }

        Ok(())
    }
}

/// Failure reason without repeating an outer `DeployFailed`
fn failure_reason(error: CraneError) -> String {
    match error {
        CraneError::DeployFailed(reason) => reason,
        other => other.to_string(),
    }
}
