//! ARM Client
//!
//! Main client for Azure Resource Manager, combining authentication, the
//! HTTP layer and long-running-operation polling.

use super::auth::AzureCredentials;
use super::environment::CloudEnvironment;
use super::http::{ArmError, ArmHttpClient, ArmResponse};
use super::operation::{retry_after, OperationStatus, PollingStrategy};
use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default delay between polls of a long-running operation
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum pages to follow when listing, to avoid infinite loops
const MAX_PAGES: usize = 100;

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    pub credentials: AzureCredentials,
    pub http: ArmHttpClient,
    pub environment: CloudEnvironment,
    pub subscription_id: String,
    poll_interval: Duration,
}

impl ArmClient {
    /// Create a new ARM client
    pub fn new(credentials: AzureCredentials, environment: CloudEnvironment, subscription_id: &str) -> Result<Self> {
        Ok(Self {
            credentials,
            http: ArmHttpClient::new()?,
            environment,
            subscription_id: subscription_id.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Delay between polls of a long-running operation
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String, ArmError> {
        self.credentials.get_token().await
    }

    /// Build a Resource Manager URL for a resource ID or collection path
    pub fn url(&self, path: &str, api_version: &str, query: &[(&str, &str)]) -> Result<String, ArmError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.environment.resource_manager.trim_end_matches('/'),
            path
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", api_version);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    /// Send with the cached token, refreshing it once if Resource Manager rejects it
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<ArmResponse, ArmError> {
        let token = self.get_token().await?;
        match self.http.send(method.clone(), url, &token, body).await {
            Err(err) if err.was_status(StatusCode::UNAUTHORIZED) && self.credentials.can_refresh() => {
                tracing::debug!("Token was rejected, refreshing before retrying {}", url);
                let token = self.credentials.refresh_token().await?;
                self.http.send(method, url, &token, body).await
            }
            result => result,
        }
    }

    /// GET a single resource
    pub async fn get<T: DeserializeOwned>(&self, id: &str, api_version: &str) -> Result<T, ArmError> {
        let url = self.url(id, api_version, &[])?;
        let response = self.send(Method::GET, &url, None).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    /// GET a collection, following `nextLink` until exhausted
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ArmError> {
        let mut next = Some(self.url(path, api_version, query)?);
        let mut items = Vec::new();
        let mut pages = 0;

        while let Some(url) = next.take() {
            let response = self.send(Method::GET, &url, None).await?;
            if let Some(values) = response.body.get("value").and_then(Value::as_array) {
                for value in values {
                    items.push(serde_json::from_value(value.clone())?);
                }
            }

            pages += 1;
            if pages >= MAX_PAGES {
                tracing::warn!("Stopped listing {} after {} pages", path, MAX_PAGES);
                break;
            }

            next = response
                .body
                .get("nextLink")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }

        tracing::debug!("Listed {} items from {}", items.len(), path);
        Ok(items)
    }

    /// PUT a resource and wait for the operation to finish
    pub async fn put<B: Serialize>(&self, id: &str, api_version: &str, body: &B) -> Result<(), ArmError> {
        let body = serde_json::to_value(body)?;
        self.mutate(Method::PUT, id, api_version, Some(&body)).await.map(|_| ())
    }

    /// PATCH a resource and wait for the operation to finish
    pub async fn patch<B: Serialize>(&self, id: &str, api_version: &str, body: &B) -> Result<(), ArmError> {
        let body = serde_json::to_value(body)?;
        self.mutate(Method::PATCH, id, api_version, Some(&body)).await.map(|_| ())
    }

    /// DELETE a resource and wait for the operation to finish
    pub async fn delete(&self, id: &str, api_version: &str) -> Result<(), ArmError> {
        self.mutate(Method::DELETE, id, api_version, None).await.map(|_| ())
    }

    /// POST an action (`/suspend`, `/purge`, ...) and wait for it to finish
    pub async fn post(&self, path: &str, api_version: &str, body: Option<&Value>) -> Result<Value, ArmError> {
        self.mutate(Method::POST, path, api_version, body).await
    }

    async fn mutate(&self, method: Method, path: &str, api_version: &str, body: Option<&Value>) -> Result<Value, ArmError> {
        let url = self.url(path, api_version, &[])?;
        let response = self.send(method.clone(), &url, body).await?;
        let strategy = PollingStrategy::from_response(&method, &url, &response);
        let initial = response.body.clone();
        self.wait(strategy, &response).await?;
        Ok(initial)
    }

    /// Poll until the operation reaches a terminal state
    async fn wait(&self, strategy: PollingStrategy, first: &ArmResponse) -> Result<(), ArmError> {
        let mut delay = retry_after(first).unwrap_or(self.poll_interval);

        loop {
            let status = match &strategy {
                PollingStrategy::Done => return Ok(()),
                PollingStrategy::AsyncOperation(url) => {
                    tokio::time::sleep(delay).await;
                    let response = self.send(Method::GET, url, None).await?;
                    delay = retry_after(&response).unwrap_or(self.poll_interval);
                    OperationStatus::from_operation_body(&response.body)
                }
                PollingStrategy::Location(url) => {
                    tokio::time::sleep(delay).await;
                    let response = self.send(Method::GET, url, None).await?;
                    delay = retry_after(&response).unwrap_or(self.poll_interval);
                    if response.status == StatusCode::ACCEPTED {
                        OperationStatus::InProgress
                    } else {
                        OperationStatus::Succeeded
                    }
                }
                PollingStrategy::ProvisioningState(url) => {
                    tokio::time::sleep(delay).await;
                    let response = self.send(Method::GET, url, None).await?;
                    delay = retry_after(&response).unwrap_or(self.poll_interval);
                    OperationStatus::from_resource_body(&response.body)
                }
            };

            tracing::debug!("Operation status: {}", status.label());

            match status {
                OperationStatus::InProgress => continue,
                OperationStatus::Succeeded => return Ok(()),
                OperationStatus::Failed(message) => {
                    return Err(ArmError::OperationFailed {
                        status: "Failed".to_string(),
                        message,
                    })
                }
                OperationStatus::Canceled => {
                    return Err(ArmError::OperationFailed {
                        status: "Canceled".to_string(),
                        message: "the operation was canceled".to_string(),
                    })
                }
            }
        }
    }
}
