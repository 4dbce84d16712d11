//! Provider Configuration
//!
//! Resolves the provider configuration block, falling back to `ARM_*`
//! environment variables, and turns it into an authenticated ARM client.

use crate::azure::{ArmClient, AzureCredentials, CloudEnvironment};
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::{ResourceData, StateMap};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Feature toggles from the `features` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Features {
    pub key_vault: KeyVaultFeatures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyVaultFeatures {
    pub purge_soft_deleted_hardware_security_modules_on_destroy: bool,
    pub recover_soft_deleted_hardware_security_modules: bool,
}

impl Default for KeyVaultFeatures {
    fn default() -> Self {
        Self {
            purge_soft_deleted_hardware_security_modules_on_destroy: true,
            recover_soft_deleted_hardware_security_modules: true,
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self {
            key_vault: KeyVaultFeatures::default(),
        }
    }
}

impl Features {
    fn from_data(data: &ResourceData) -> Self {
        let defaults = KeyVaultFeatures::default();
        let key_vault = "features.0.key_vault.0";
        Self {
            key_vault: KeyVaultFeatures {
                purge_soft_deleted_hardware_security_modules_on_destroy: data
                    .get_bool(&format!("{key_vault}.purge_soft_deleted_hardware_security_modules_on_destroy"))
                    .unwrap_or(defaults.purge_soft_deleted_hardware_security_modules_on_destroy),
                recover_soft_deleted_hardware_security_modules: data
                    .get_bool(&format!("{key_vault}.recover_soft_deleted_hardware_security_modules"))
                    .unwrap_or(defaults.recover_soft_deleted_hardware_security_modules),
            },
        }
    }
}

/// Resolved provider configuration
#[derive(Clone, Default)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub environment: String,
    pub use_cli: bool,
    pub resource_manager_endpoint: Option<String>,
    pub features: Features,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("environment", &self.environment)
            .field("use_cli", &self.use_cli)
            .field("resource_manager_endpoint", &self.resource_manager_endpoint)
            .field("features", &self.features)
            .finish()
    }
}

/// Schema of the provider configuration block
pub fn provider_schema() -> Schema {
    let key_vault = Schema::new()
        .attr(
            "purge_soft_deleted_hardware_security_modules_on_destroy",
            Attribute::optional(ValueType::Bool).default(true),
        )
        .attr(
            "recover_soft_deleted_hardware_security_modules",
            Attribute::optional(ValueType::Bool).default(true),
        );

    Schema::new()
        .attr(
            "subscription_id",
            Attribute::optional(ValueType::String).validate(validation::is_uuid()),
        )
        .attr(
            "tenant_id",
            Attribute::optional(ValueType::String).validate(validation::is_uuid()),
        )
        .attr("client_id", Attribute::optional(ValueType::String))
        .attr("client_secret", Attribute::optional(ValueType::String).sensitive())
        .attr("access_token", Attribute::optional(ValueType::String).sensitive())
        .attr(
            "environment",
            Attribute::optional(ValueType::String)
                .validate(validation::string_in_slice(&["public", "usgovernment", "china"], true)),
        )
        .attr("use_cli", Attribute::optional(ValueType::Bool))
        .attr(
            "resource_manager_endpoint",
            Attribute::optional(ValueType::String),
        )
        .attr(
            "features",
            Attribute::optional(ValueType::List).max_items(1).block(
                Schema::new().attr(
                    "key_vault",
                    Attribute::optional(ValueType::List).max_items(1).block(key_vault),
                ),
            ),
        )
}

impl ProviderConfig {
    /// Resolve from a configuration block, filling gaps from the process environment
    pub fn from_values(values: &StateMap) -> Result<Self> {
        Self::resolve(values, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve(values: &StateMap, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data = ResourceData::new(values.clone());
        let lookup = |attr: &str, var: &str| -> Option<String> {
            data.get_str(attr)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| env(var).filter(|s| !s.is_empty()))
        };

        let use_cli = match data.get_bool("use_cli") {
            Some(v) => v,
            None => match env("ARM_USE_CLI") {
                Some(v) => v
                    .parse::<bool>()
                    .with_context(|| format!("parsing ARM_USE_CLI {v:?}"))?,
                None => true,
            },
        };

        let config = Self {
            subscription_id: lookup("subscription_id", "ARM_SUBSCRIPTION_ID").unwrap_or_default(),
            tenant_id: lookup("tenant_id", "ARM_TENANT_ID"),
            client_id: lookup("client_id", "ARM_CLIENT_ID"),
            client_secret: lookup("client_secret", "ARM_CLIENT_SECRET"),
            access_token: lookup("access_token", "ARM_ACCESS_TOKEN"),
            environment: lookup("environment", "ARM_ENVIRONMENT").unwrap_or_else(|| "public".to_string()),
            use_cli,
            resource_manager_endpoint: lookup("resource_manager_endpoint", "ARM_RESOURCE_MANAGER_ENDPOINT"),
            features: Features::from_data(&data),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.subscription_id.is_empty() {
            bail!("`subscription_id` was not specified and ARM_SUBSCRIPTION_ID is not set");
        }
        uuid::Uuid::parse_str(&self.subscription_id)
            .with_context(|| format!("`subscription_id` {:?} is not a valid UUID", self.subscription_id))?;
        Ok(())
    }

    pub fn cloud_environment(&self) -> Result<CloudEnvironment> {
        let environment = CloudEnvironment::from_name(&self.environment)?;
        Ok(match &self.resource_manager_endpoint {
            Some(endpoint) => environment.with_resource_manager(endpoint),
            None => environment,
        })
    }

    /// Pick credentials: access token, then client secret, then the Azure CLI
    pub fn credentials(&self, environment: &CloudEnvironment) -> Result<AzureCredentials> {
        if let Some(token) = &self.access_token {
            return Ok(AzureCredentials::static_token(token.clone()));
        }

        if let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (&self.tenant_id, &self.client_id, &self.client_secret)
        {
            return Ok(AzureCredentials::client_secret(environment, tenant_id, client_id, client_secret));
        }

        if self.client_secret.is_some() {
            bail!("authenticating with a client secret requires `tenant_id`, `client_id` and `client_secret`");
        }

        if self.use_cli {
            return Ok(AzureCredentials::azure_cli(environment, self.tenant_id.clone()));
        }

        bail!("no credentials were configured: set `access_token`, a client secret or enable `use_cli`")
    }

    /// Build an authenticated ARM client
    pub fn client(&self) -> Result<ArmClient> {
        let environment = self.cloud_environment()?;
        let credentials = self.credentials(&environment)?;
        tracing::info!(
            "Authenticating to the {} cloud using {}",
            environment.name,
            credentials.describe()
        );
        ArmClient::new(credentials, environment, &self.subscription_id)
    }
}

/// Default location of the provider configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("azurerm-provider").join("provider.json"))
}

/// Load a provider configuration block from disk.
///
/// Files ending in `.yaml`/`.yml` are read as YAML, anything else as JSON.
/// A missing default file yields an empty block.
pub fn load_config_file(path: Option<&Path>) -> Result<StateMap> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(StateMap::new()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading provider configuration {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let value: Value = if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(StateMap::new()),
        _ => bail!("{} must contain an object", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    fn values(v: Value) -> StateMap {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_env_fallbacks() {
        let env: HashMap<&str, &str> = [
            ("ARM_SUBSCRIPTION_ID", SUB),
            ("ARM_ACCESS_TOKEN", "token"),
            ("ARM_USE_CLI", "false"),
        ]
        .into_iter()
        .collect();

        let config = ProviderConfig::resolve(&StateMap::new(), |k| env.get(k).map(|s| s.to_string())).unwrap();
        assert_eq!(config.subscription_id, SUB);
        assert_eq!(config.access_token.as_deref(), Some("token"));
        assert!(!config.use_cli);
        assert_eq!(config.environment, "public");
    }

    #[test]
    fn test_block_wins_over_env() {
        let config = ProviderConfig::resolve(
            &values(json!({ "subscription_id": SUB, "environment": "china" })),
            |k| (k == "ARM_ENVIRONMENT").then(|| "usgovernment".to_string()),
        )
        .unwrap();
        assert_eq!(config.cloud_environment().unwrap().name, "china");
    }

    #[test]
    fn test_subscription_must_be_uuid() {
        assert!(ProviderConfig::resolve(&values(json!({ "subscription_id": "abc" })), |_| None).is_err());
        assert!(ProviderConfig::resolve(&StateMap::new(), |_| None).is_err());
    }

    #[test]
    fn test_features_defaults_and_overrides() {
        let config = ProviderConfig::resolve(&values(json!({ "subscription_id": SUB })), |_| None).unwrap();
        assert!(config.features.key_vault.purge_soft_deleted_hardware_security_modules_on_destroy);

        let config = ProviderConfig::resolve(
            &values(json!({
                "subscription_id": SUB,
                "features": [{ "key_vault": [{ "recover_soft_deleted_hardware_security_modules": false }] }]
            })),
            |_| None,
        )
        .unwrap();
        assert!(!config.features.key_vault.recover_soft_deleted_hardware_security_modules);
        assert!(config.features.key_vault.purge_soft_deleted_hardware_security_modules_on_destroy);
    }

    #[test]
    fn test_credential_selection() {
        let env = CloudEnvironment::public();
        let mut config = ProviderConfig::resolve(&values(json!({ "subscription_id": SUB })), |_| None).unwrap();
        assert_eq!(config.credentials(&env).unwrap().describe(), "Azure CLI");

        config.tenant_id = Some(SUB.to_string());
        config.client_id = Some("app".to_string());
        config.client_secret = Some("secret".to_string());
        assert_eq!(config.credentials(&env).unwrap().describe(), "client secret");

        config.access_token = Some("token".to_string());
        assert_eq!(config.credentials(&env).unwrap().describe(), "access token");

        let partial = ProviderConfig {
            client_secret: Some("secret".to_string()),
            ..ProviderConfig::default()
        };
        assert!(partial.credentials(&env).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ProviderConfig {
            client_secret: Some("hunter2".to_string()),
            ..ProviderConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = std::env::temp_dir().join(format!("azurerm-provider-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("provider.yaml");
        std::fs::write(&path, format!("subscription_id: {SUB}\nuse_cli: false\n")).unwrap();

        let block = load_config_file(Some(&path)).unwrap();
        assert_eq!(block["subscription_id"], json!(SUB));
        assert_eq!(block["use_cli"], json!(false));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
