use super::client::{
    ManagedHsm, ManagedHsmClient, ManagedHsmProperties, ManagedHsmSku, NetworkAcls, CREATE_MODE_DEFAULT,
    CREATE_MODE_RECOVER,
};
use super::ids::{DeletedManagedHsmId, ManagedHsmId};
use crate::helpers::{location, tags};
use crate::provider::{ensure_not_exists, ProviderContext, Resource, Timeouts};
use crate::resourceids::ResourceId;
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

const SKUS: &[&str] = &["Standard_B1", "Custom_B32"];
const SKU_FAMILY: &str = "B";

pub struct KeyVaultManagedHardwareSecurityModuleResource;

fn opted_out_of_recovery_error(name: &str, location: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "An existing soft-deleted Managed HSM exists with the Name {name:?} in the location {location:?}, \
         however automatically recovering this Managed HSM has been disabled via the `features` block. \
         Set `recover_soft_deleted_hardware_security_modules` to true to recover it automatically, \
         or recover it manually and import it, or pick a different name/location."
    )
}

fn expand_network_acls(data: &ResourceData) -> Option<NetworkAcls> {
    data.get("network_acls.0").map(|_| NetworkAcls {
        bypass: data.get_str("network_acls.0.bypass").map(str::to_string),
        default_action: data.get_str("network_acls.0.default_action").map(str::to_string),
    })
}

fn flatten_network_acls(acls: Option<&NetworkAcls>) -> Value {
    match acls {
        Some(acls) => json!([{
            "bypass": acls.bypass.clone().unwrap_or_default(),
            "default_action": acls.default_action.clone().unwrap_or_default(),
        }]),
        None => json!([]),
    }
}

fn public_network_access(enabled: bool) -> String {
    if enabled { "Enabled" } else { "Disabled" }.to_string()
}

impl KeyVaultManagedHardwareSecurityModuleResource {
    /// Whether a soft-deleted HSM with this name should be recovered instead of created
    async fn should_recover(
        ctx: &ProviderContext,
        client: &ManagedHsmClient<'_>,
        id: &ManagedHsmId,
        location: &str,
    ) -> Result<bool> {
        let deleted_id = id.deleted(location);
        match client.get_deleted(&deleted_id).await {
            Ok(_) => {
                if !ctx.features.key_vault.recover_soft_deleted_hardware_security_modules {
                    return Err(opted_out_of_recovery_error(&id.managed_hsm_name, location));
                }
                tracing::info!("Recovering soft-deleted {}", id);
                Ok(true)
            }
            // without subscription-level read access ARM answers 403 rather than 404
            Err(err) if err.was_not_found() || err.was_status(StatusCode::FORBIDDEN) => Ok(false),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("checking for the presence of an existing soft-deleted {deleted_id}"))),
        }
    }
}

#[async_trait]
impl Resource for KeyVaultManagedHardwareSecurityModuleResource {
    fn type_name(&self) -> &'static str {
        "azurerm_key_vault_managed_hardware_security_module"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).force_new().validate(validation::string_matches(
                    "^[a-zA-Z][a-zA-Z0-9-]{1,22}[a-zA-Z0-9]$",
                    "must be between 3 and 24 characters, start with a letter, end with a letter or number and contain only letters, numbers and hyphens",
                )),
            )
            .attr("location", location::schema())
            .attr("resource_group_name", location::resource_group_name_schema())
            .attr(
                "sku_name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::string_in_slice(SKUS, false)),
            )
            .attr(
                "admin_object_ids",
                Attribute::required(ValueType::Set)
                    .force_new()
                    .min_items(1)
                    .elem_type(ValueType::String)
                    .validate(validation::each(validation::is_uuid())),
            )
            .attr(
                "tenant_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::is_uuid()),
            )
            .attr(
                "purge_protection_enabled",
                Attribute::optional(ValueType::Bool).force_new().default(false),
            )
            .attr(
                "soft_delete_retention_days",
                Attribute::optional(ValueType::Int)
                    .force_new()
                    .default(90)
                    .validate(validation::int_between(7, 90)),
            )
            .attr(
                "public_network_access_enabled",
                Attribute::optional(ValueType::Bool).force_new().default(true),
            )
            .attr(
                "network_acls",
                Attribute::optional(ValueType::List).also_computed().max_items(1).block(
                    Schema::new()
                        .attr(
                            "bypass",
                            Attribute::required(ValueType::String)
                                .validate(validation::string_in_slice(&["None", "AzureServices"], false)),
                        )
                        .attr(
                            "default_action",
                            Attribute::required(ValueType::String)
                                .validate(validation::string_in_slice(&["Allow", "Deny"], false)),
                        ),
                ),
            )
            .attr("hsm_uri", Attribute::computed(ValueType::String))
            .attr("tags", tags::schema())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(60, 5, 30, 60)
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        ManagedHsmId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = ManagedHsmClient::new(&ctx.client);
        let id = ManagedHsmId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );

        ensure_not_exists(self.type_name(), &id.id(), client.get(&id).await)?;

        let location = location::normalize(data.require_str("location")?);
        let recover = Self::should_recover(ctx, &client, &id, &location).await?;

        let hsm = ManagedHsm {
            location,
            sku: Some(ManagedHsmSku {
                family: SKU_FAMILY.to_string(),
                name: data.get_string("sku_name"),
            }),
            tags: Some(tags::expand(data)),
            properties: Some(ManagedHsmProperties {
                tenant_id: data.get_str("tenant_id").map(str::to_string),
                initial_admin_object_ids: data.get_string_list("admin_object_ids"),
                enable_soft_delete: Some(true),
                soft_delete_retention_in_days: Some(data.get_i64("soft_delete_retention_days").unwrap_or(90)),
                enable_purge_protection: Some(data.get_bool("purge_protection_enabled").unwrap_or(false)),
                create_mode: Some(if recover { CREATE_MODE_RECOVER } else { CREATE_MODE_DEFAULT }.to_string()),
                public_network_access: Some(public_network_access(
                    data.get_bool("public_network_access_enabled").unwrap_or(true),
                )),
                network_acls: expand_network_acls(data),
                ..Default::default()
            }),
            ..Default::default()
        };

        client
            .create_or_update(&id, &hsm)
            .await
            .with_context(|| format!("creating {id}"))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = ManagedHsmClient::new(&ctx.client);
        let id = ManagedHsmId::parse(data.id())?;

        let hsm = match client.get(&id).await {
            Ok(hsm) => hsm,
            Err(err) if err.was_not_found() => {
                tracing::debug!("{} was not found - removing from state", id);
                data.set_id("");
                return Ok(());
            }
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {id}"))),
        };

        data.set("name", &id.managed_hsm_name)?;
        data.set("resource_group_name", &id.resource_group_name)?;
        data.set("location", location::normalize(&hsm.location))?;
        data.set("sku_name", hsm.sku.as_ref().map(|s| s.name.as_str()).unwrap_or_default())?;

        let properties = hsm.properties.unwrap_or_default();
        data.set("tenant_id", properties.tenant_id)?;
        data.set("admin_object_ids", properties.initial_admin_object_ids)?;
        data.set("hsm_uri", properties.hsm_uri)?;
        data.set(
            "soft_delete_retention_days",
            properties.soft_delete_retention_in_days.unwrap_or(90),
        )?;
        data.set(
            "purge_protection_enabled",
            properties.enable_purge_protection.unwrap_or(false),
        )?;
        data.set(
            "public_network_access_enabled",
            !properties
                .public_network_access
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case("Disabled")),
        )?;
        data.set("network_acls", flatten_network_acls(properties.network_acls.as_ref()))?;
        data.set("tags", tags::flatten(hsm.tags.as_ref()))?;

        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = ManagedHsmClient::new(&ctx.client);
        let id = ManagedHsmId::parse(data.id())?;

        let mut patch = ManagedHsm::default();
        if data.has_change("tags") {
            patch.tags = Some(tags::expand(data));
        }
        if data.has_change("network_acls") {
            patch.properties = Some(ManagedHsmProperties {
                network_acls: expand_network_acls(data),
                ..Default::default()
            });
        }

        client
            .update(&id, &patch)
            .await
            .with_context(|| format!("updating {id}"))
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = ManagedHsmClient::new(&ctx.client);
        let id = ManagedHsmId::parse(data.id())?;

        let existing = match client.get(&id).await {
            Ok(hsm) => hsm,
            Err(err) if err.was_not_found() => return Ok(()),
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {id}"))),
        };
        let location = location::normalize(&existing.location);

        match client.delete(&id).await {
            Ok(()) => {}
            Err(err) if err.was_not_found() => {}
            Err(err) => return Err(anyhow::Error::new(err).context(format!("deleting {id}"))),
        }

        if !ctx.features.key_vault.purge_soft_deleted_hardware_security_modules_on_destroy {
            return Ok(());
        }

        let deleted_id = id.deleted(&location);
        if existing.purge_protection_enabled() {
            // only Azure can purge it, once the retention period has passed
            match client.get_deleted(&deleted_id).await {
                Ok(deleted) => {
                    let properties = deleted.properties.unwrap_or_default();
                    tracing::debug!(
                        "{} has purge protection enabled and was deleted on {:?}; Azure will purge it on {:?}",
                        id,
                        properties.deletion_date,
                        properties.scheduled_purge_date
                    );
                }
                Err(err) => tracing::debug!("Could not read deletion details for {}: {}", id, err),
            }
            return Ok(());
        }

        tracing::info!("Purging {}", deleted_id);
        purge(&client, &deleted_id).await
    }
}

async fn purge(client: &ManagedHsmClient<'_>, id: &DeletedManagedHsmId) -> Result<()> {
    match client.purge_deleted(id).await {
        Ok(()) => Ok(()),
        Err(err) if err.was_not_found() => Ok(()),
        Err(err) => Err(anyhow::Error::new(err).context(format!("purging {id}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: Value) -> ResourceData {
        ResourceData::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_network_acls() {
        let d = data(json!({ "network_acls": [{ "bypass": "AzureServices", "default_action": "Deny" }] }));
        let acls = expand_network_acls(&d).unwrap();
        assert_eq!(acls.default_action.as_deref(), Some("Deny"));
        assert_eq!(
            flatten_network_acls(Some(&acls)),
            json!([{ "bypass": "AzureServices", "default_action": "Deny" }])
        );

        assert!(expand_network_acls(&data(json!({}))).is_none());
        assert_eq!(flatten_network_acls(None), json!([]));
    }

    #[test]
    fn test_retention_days_bounds() {
        let schema = KeyVaultManagedHardwareSecurityModuleResource.schema();
        let check = &schema.get("soft_delete_retention_days").unwrap().validators[0];
        assert!(check(&json!(7), "soft_delete_retention_days").is_empty());
        assert!(check(&json!(90), "soft_delete_retention_days").is_empty());
        assert!(!check(&json!(6), "soft_delete_retention_days").is_empty());
        assert!(!check(&json!(91), "soft_delete_retention_days").is_empty());
    }

    #[test]
    fn test_opted_out_error_names_the_hsm() {
        let err = opted_out_of_recovery_error("hsm1", "westeurope");
        assert!(err.to_string().contains("\"hsm1\""));
        assert!(err.to_string().contains("recover_soft_deleted_hardware_security_modules"));
    }
}
