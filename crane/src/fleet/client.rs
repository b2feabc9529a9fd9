//! Fleet-control API client

use std::time::Duration;

use async_trait::async_trait;
use fleet_api::{ApiError, Collection, ResourceRef};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::app::settings::Settings;
use crate::errors::CraneError;
use crate::fleet::models::{EntityLocator, Service, Stack};
use crate::fleet::payload::{build_upgrade_request, decode_service};

/// Operations crane needs from the fleet-control platform
#[async_trait]
pub trait FleetControl: Send + Sync {
    /// Fetch the raw document of a stack or service
    async fn get_entity(&self, entity: &dyn EntityLocator) -> Result<Value, CraneError>;

    /// Look up a stack by name within an environment
    async fn get_stack_from_name(&self, env: &str, name: &str) -> Result<Stack, CraneError>;

    /// Look up a service by name within a stack
    async fn get_service_from_name(&self, stack: &Stack, name: &str)
        -> Result<Service, CraneError>;

    /// Start an in-service upgrade from `old_version` to `new_version`
    async fn upgrade_service(
        &self,
        service: &Service,
        old_version: &str,
        new_version: &str,
        settings: &Settings,
    ) -> Result<Value, CraneError>;

    /// Mark a settled upgrade as finished
    async fn finish_upgrade_service(&self, service: &Service) -> Result<(), CraneError>;
}

/// Credentials for the Rancher API
#[derive(Debug, Clone)]
pub struct FleetAuth {
    pub access_key: String,
    pub secret_key: SecretString,
}

/// HTTP client for the Rancher v1 API
pub struct FleetApiClient {
    client: Client,
    base_url: String,
    auth: FleetAuth,
}

impl FleetApiClient {
    /// Create a new client for the Rancher instance at `base_url`
    pub fn new(base_url: &str, auth: FleetAuth) -> Result<Self, CraneError> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            CraneError::ConfigError(format!("Invalid Rancher URL {}: {}", base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(
            &self.auth.access_key,
            Some(self.auth.secret_key.expose_secret()),
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CraneError> {
        debug!("GET {}", url);

        let response = self
            .with_auth(self.client.get(url).query(query))
            .send()
            .await
            .map_err(|e| CraneError::FetchFailed(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(CraneError::FetchFailed(format!("{}: {}", url, status)));
        }

        decode(response).await
    }

    async fn post_action(
        &self,
        service: &Service,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Response, reqwest::Error> {
        let url = service.api_url();
        debug!("POST {}?action={}", url, action);

        let mut request = self
            .with_auth(self.client.post(&url))
            .query(&[("action", action)]);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CraneError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CraneError::FetchFailed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| CraneError::DecodeFailed(e.to_string()))
}

#[async_trait]
impl FleetControl for FleetApiClient {
    async fn get_entity(&self, entity: &dyn EntityLocator) -> Result<Value, CraneError> {
        self.get_json(&entity.api_url(), &[]).await
    }

    async fn get_stack_from_name(&self, env: &str, name: &str) -> Result<Stack, CraneError> {
        if name.is_empty() {
            error!(
                env = %env,
                rancher_url = %self.base_url,
                "You need to tell me what stack to upgrade in. Normally I can guess it from the \
                 CI environment, but it seems I'm not running in CI now."
            );
            return Err(CraneError::StackNotFound(
                "no stack name given, pass --rancher-stack explicitly".to_string(),
            ));
        }

        let url = format!("{}/v1/projects/{}/environments", self.base_url, env);
        let listing: Collection<ResourceRef> = self.get_json(&url, &[("name", name)]).await?;

        let Some(head) = listing.data.into_iter().next() else {
            error!(env = %env, name = %name, "I don't see a stack called '{}'", name);
            return Err(CraneError::StackNotFound(name.to_string()));
        };

        // The environments listing reports `1e<n>` ids, stacks are addressed as `1st<n>`
        Ok(Stack {
            id: head.id.replace("1e", "1st"),
            url: self.base_url.clone(),
            env: env.to_string(),
            name: head.name,
        })
    }

    async fn get_service_from_name(
        &self,
        stack: &Stack,
        name: &str,
    ) -> Result<Service, CraneError> {
        if name.is_empty() {
            return Err(CraneError::ServiceNotFound(
                "no service name given".to_string(),
            ));
        }

        let url = format!("{}/v1/projects/{}/services", stack.url, stack.env);
        let listing: Collection<ResourceRef> = self
            .get_json(&url, &[("name", name), ("stackId", stack.id.as_str())])
            .await?;

        let Some(head) = listing.data.into_iter().next() else {
            error!(stack = %stack, name = %name, "I don't see a service called {}", name);
            return Err(CraneError::ServiceNotFound(format!("{} in {}", name, stack.name)));
        };

        Ok(Service {
            id: head.id,
            url: stack.url.clone(),
            env: stack.env.clone(),
            name: head.name,
            stack: stack.clone(),
        })
    }

    async fn upgrade_service(
        &self,
        service: &Service,
        old_version: &str,
        new_version: &str,
        settings: &Settings,
    ) -> Result<Value, CraneError> {
        let entity = decode_service(self.get_entity(service).await?)?;
        let payload = serde_json::to_value(build_upgrade_request(
            &entity,
            old_version,
            new_version,
            settings,
        )?)?;

        info!(service = %service, "Upgrading {}", service.name);

        let response = self
            .post_action(service, "upgrade", Some(&payload))
            .await
            .map_err(|e| CraneError::UpgradeFailed {
                service: service.name.clone(),
                message: e.to_string(),
                action_not_available: false,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let api_error: ApiError = decode(response).await.unwrap_or_default();

            let (message, action_not_available) = if api_error.is_action_not_available() {
                (
                    format!(
                        "Rancher won't let me upgrade {}, please see if the service is upgradeable at {}",
                        service.name,
                        service.web_url()
                    ),
                    true,
                )
            } else {
                (
                    format!(
                        "Upgrade failed with {}: {}",
                        status,
                        api_error.message.unwrap_or_default()
                    ),
                    false,
                )
            };

            error!(service = %service, "{}", message);
            return Err(CraneError::UpgradeFailed {
                service: service.name.clone(),
                message,
                action_not_available,
            });
        }

        decode(response).await
    }

    async fn finish_upgrade_service(&self, service: &Service) -> Result<(), CraneError> {
        let response = self
            .post_action(service, "finishupgrade", None)
            .await
            .map_err(|e| {
                error!(service = %service, "Finish upgrade request failed: {}", e);
                CraneError::FinishUpgradeFailed(service.name.clone())
            })?;

        if !response.status().is_success() {
            error!(
                service = %service,
                status = %response.status(),
                "Rancher refused to finish the upgrade"
            );
            return Err(CraneError::FinishUpgradeFailed(service.name.clone()));
        }

        info!(service = %service, "Marked upgrade of {} as finished in Rancher", service.name);
        Ok(())
    }
}
