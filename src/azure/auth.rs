//! Azure Authentication
//!
//! Obtains Resource Manager access tokens from a pre-acquired token, a service
//! principal client secret or the Azure CLI, and caches them until shortly
//! before they expire.

use super::environment::CloudEnvironment;
use super::http::ArmError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

enum CredentialSource {
    Static(String),
    ClientSecret {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    },
    AzureCli {
        resource: String,
        tenant_id: Option<String>,
    },
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

struct FetchedToken {
    token: String,
    ttl: Duration,
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    source: Arc<CredentialSource>,
    http: reqwest::Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AzureCredentials {
    fn from_source(source: CredentialSource) -> Self {
        Self {
            source: Arc::new(source),
            http: reqwest::Client::new(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Use a bearer token acquired elsewhere
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::from_source(CredentialSource::Static(token.into()))
    }

    /// Service principal authenticating with a client secret
    pub fn client_secret(
        environment: &CloudEnvironment,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self::from_source(CredentialSource::ClientSecret {
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                environment.active_directory.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: environment.scope(),
        })
    }

    /// Tokens from `az account get-access-token`
    pub fn azure_cli(environment: &CloudEnvironment, tenant_id: Option<String>) -> Self {
        Self::from_source(CredentialSource::AzureCli {
            resource: environment.token_audience.clone(),
            tenant_id,
        })
    }

    pub fn describe(&self) -> &'static str {
        match self.source.as_ref() {
            CredentialSource::Static(_) => "access token",
            CredentialSource::ClientSecret { .. } => "client secret",
            CredentialSource::AzureCli { .. } => "Azure CLI",
        }
    }

    /// Whether a fresh token can be fetched after one is rejected
    pub fn can_refresh(&self) -> bool {
        !matches!(self.source.as_ref(), CredentialSource::Static(_))
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String, ArmError> {
        if let CredentialSource::Static(token) = self.source.as_ref() {
            return Ok(token.clone());
        }

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let fetched = match self.source.as_ref() {
            CredentialSource::Static(token) => FetchedToken {
                token: token.clone(),
                ttl: DEFAULT_TOKEN_TTL,
            },
            CredentialSource::ClientSecret {
                token_url,
                client_id,
                client_secret,
                scope,
            } => fetch_client_secret_token(&self.http, token_url, client_id, client_secret, scope).await?,
            CredentialSource::AzureCli { resource, tenant_id } => {
                fetch_cli_token(resource, tenant_id.as_deref()).await?
            }
        };

        let ttl = fetched.ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: fetched.token.clone(),
                expires_at: Instant::now() + ttl,
            });
        }

        tracing::debug!(
            "New {} token cached, expires in ~{} minutes",
            self.describe(),
            ttl.as_secs() / 60
        );

        Ok(fetched.token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String, ArmError> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

async fn fetch_client_secret_token(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    scope: &str,
) -> Result<FetchedToken, ArmError> {
    tracing::debug!("POST {}", token_url);

    let response = http
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", scope),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ArmError::Auth(format!(
            "the token endpoint returned {status} for client {client_id:?}"
        )));
    }

    let body: TokenResponse = response.json().await?;

    // expires_in is a number from most endpoints and a string from some older ones
    let ttl = body
        .expires_in
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_TTL);

    Ok(FetchedToken {
        token: body.access_token,
        ttl,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

async fn fetch_cli_token(resource: &str, tenant_id: Option<&str>) -> Result<FetchedToken, ArmError> {
    let mut command = tokio::process::Command::new("az");
    command.args(["account", "get-access-token", "--resource", resource, "--output", "json"]);
    if let Some(tenant_id) = tenant_id {
        command.args(["--tenant", tenant_id]);
    }

    let output = command
        .output()
        .await
        .map_err(|e| ArmError::Auth(format!("running the Azure CLI: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArmError::Auth(format!(
            "the Azure CLI exited with {}: {}. Run 'az login'",
            output.status,
            stderr.trim()
        )));
    }

    let token: CliToken = serde_json::from_slice(&output.stdout)?;

    let ttl = token
        .expires_on
        .map(|epoch| epoch - chrono::Utc::now().timestamp())
        .filter(|secs| *secs > 0)
        .map(|secs| Duration::from_secs(secs as u64))
        .unwrap_or(DEFAULT_TOKEN_TTL);

    Ok(FetchedToken {
        token: token.access_token,
        ttl,
    })
}
