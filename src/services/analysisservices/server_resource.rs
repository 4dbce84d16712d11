use super::client::{
    IPv4FirewallRule, IPv4FirewallSettings, ResourceSku, Server, ServerAdministrators, ServerProperties,
    ServerUpdateParameters, ServersClient,
};
use super::ids::ServerId;
use crate::helpers::{location, tags};
use crate::provider::{ensure_not_exists, ProviderContext, Resource};
use crate::resourceids::ResourceId;
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const SKUS: &[&str] = &[
    "D1", "B1", "B2", "S0", "S1", "S2", "S4", "S8", "S9", "S8v2", "S9v2",
];

pub struct AnalysisServicesServerResource;

impl AnalysisServicesServerResource {
    fn expand_properties(data: &ResourceData) -> ServerProperties {
        ServerProperties {
            as_administrators: Some(ServerAdministrators {
                members: data.get_string_list("admin_users"),
            }),
            backup_blob_container_uri: data.get_str("backup_blob_container_uri").map(str::to_string),
            ip_v4_firewall_settings: Some(expand_firewall_settings(data)),
            querypool_connection_mode: data.get_str("querypool_connection_mode").map(str::to_string),
            ..Default::default()
        }
    }
}

fn expand_firewall_settings(data: &ResourceData) -> IPv4FirewallSettings {
    let firewall_rules = data
        .get_list("ipv4_firewall_rule")
        .iter()
        .map(|rule| IPv4FirewallRule {
            firewall_rule_name: rule.get("name").and_then(Value::as_str).map(str::to_string),
            range_start: rule.get("range_start").and_then(Value::as_str).map(str::to_string),
            range_end: rule.get("range_end").and_then(Value::as_str).map(str::to_string),
        })
        .collect();

    IPv4FirewallSettings {
        firewall_rules,
        enable_power_bi_service: Some(data.get_bool("power_bi_service_enabled").unwrap_or(false)),
    }
}

fn flatten_firewall_rules(settings: Option<&IPv4FirewallSettings>) -> Value {
    let rules: Vec<Value> = settings
        .map(|s| s.firewall_rules.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|rule| {
            json!({
                "name": rule.firewall_rule_name.clone().unwrap_or_default(),
                "range_start": rule.range_start.clone().unwrap_or_default(),
                "range_end": rule.range_end.clone().unwrap_or_default(),
            })
        })
        .collect();
    Value::Array(rules)
}

#[async_trait]
impl Resource for AnalysisServicesServerResource {
    fn type_name(&self) -> &'static str {
        "azurerm_analysis_services_server"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).force_new().validate(validation::string_matches(
                    "^[a-z][0-9a-z]{2,62}$",
                    "must start with a lowercase letter, contain only lowercase letters and numbers and be between 3 and 63 characters",
                )),
            )
            .attr("location", location::schema())
            .attr("resource_group_name", location::resource_group_name_schema())
            .attr(
                "sku",
                Attribute::required(ValueType::String).validate(validation::string_in_slice(SKUS, false)),
            )
            .attr(
                "admin_users",
                Attribute::optional(ValueType::Set).elem_type(ValueType::String),
            )
            .attr(
                "querypool_connection_mode",
                Attribute::optional(ValueType::String)
                    .also_computed()
                    .validate(validation::string_in_slice(&["All", "ReadOnly"], false)),
            )
            .attr(
                "backup_blob_container_uri",
                Attribute::optional(ValueType::String)
                    .sensitive()
                    .validate(validation::is_url_with_https()),
            )
            .attr("power_bi_service_enabled", Attribute::optional(ValueType::Bool))
            .attr(
                "ipv4_firewall_rule",
                Attribute::optional(ValueType::Set).block(
                    Schema::new()
                        .attr(
                            "name",
                            Attribute::required(ValueType::String).validate(validation::string_is_not_empty()),
                        )
                        .attr(
                            "range_start",
                            Attribute::required(ValueType::String).validate(validation::is_ipv4_address()),
                        )
                        .attr(
                            "range_end",
                            Attribute::required(ValueType::String).validate(validation::is_ipv4_address()),
                        ),
                ),
            )
            .attr("server_full_name", Attribute::computed(ValueType::String))
            .attr("tags", tags::schema())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        ServerId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = ServersClient::new(&ctx.client);
        let id = ServerId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );

        ensure_not_exists(self.type_name(), &id.id(), client.get(&id).await)?;

        let server = Server {
            location: location::normalize(data.require_str("location")?),
            sku: ResourceSku {
                name: data.get_string("sku"),
                ..Default::default()
            },
            tags: Some(tags::expand(data)),
            properties: Some(Self::expand_properties(data)),
            ..Default::default()
        };

        client
            .create(&id, &server)
            .await
            .with_context(|| format!("creating {id}"))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = ServersClient::new(&ctx.client);
        let id = ServerId::parse(data.id())?;

        let server = match client.get(&id).await {
            Ok(server) => server,
            Err(err) if err.was_not_found() => {
                tracing::debug!("{} was not found - removing from state", id);
                data.set_id("");
                return Ok(());
            }
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {id}"))),
        };

        data.set("name", &id.server_name)?;
        data.set("resource_group_name", &id.resource_group_name)?;
        data.set("location", location::normalize(&server.location))?;
        data.set("sku", &server.sku.name)?;

        let properties = server.properties.unwrap_or_default();
        data.set(
            "admin_users",
            properties
                .as_administrators
                .map(|a| a.members)
                .unwrap_or_default(),
        )?;
        data.set(
            "power_bi_service_enabled",
            properties
                .ip_v4_firewall_settings
                .as_ref()
                .and_then(|s| s.enable_power_bi_service)
                .unwrap_or(false),
        )?;
        data.set(
            "ipv4_firewall_rule",
            flatten_firewall_rules(properties.ip_v4_firewall_settings.as_ref()),
        )?;
        data.set("querypool_connection_mode", properties.querypool_connection_mode)?;
        data.set("server_full_name", properties.server_full_name)?;
        // not always returned; keep the configured value otherwise
        if let Some(uri) = properties.backup_blob_container_uri {
            data.set("backup_blob_container_uri", uri)?;
        }
        data.set("tags", tags::flatten(server.tags.as_ref()))?;

        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = ServersClient::new(&ctx.client);
        let id = ServerId::parse(data.id())?;

        let existing = client
            .get(&id)
            .await
            .with_context(|| format!("retrieving {id}"))?;

        // a paused server rejects updates, so resume it for the duration
        let paused = existing.is_paused();
        if paused {
            tracing::info!("Resuming {} to apply the update", id);
            client
                .resume(&id)
                .await
                .with_context(|| format!("starting {id}"))?;
        }

        let parameters = ServerUpdateParameters {
            sku: Some(ResourceSku {
                name: data.get_string("sku"),
                ..Default::default()
            }),
            tags: Some(tags::expand(data)),
            properties: Some(Self::expand_properties(data)),
        };

        client
            .update(&id, &parameters)
            .await
            .with_context(|| format!("updating {id}"))?;

        if paused {
            client
                .suspend(&id)
                .await
                .with_context(|| format!("pausing {id}"))?;
        }

        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = ServersClient::new(&ctx.client);
        let id = ServerId::parse(data.id())?;

        client
            .delete(&id)
            .await
            .with_context(|| format!("deleting {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: Value) -> ResourceData {
        ResourceData::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_expand_properties() {
        let d = data(json!({
            "admin_users": ["admin@example.com"],
            "power_bi_service_enabled": true,
            "ipv4_firewall_rule": [{ "name": "office", "range_start": "10.0.0.1", "range_end": "10.0.0.9" }]
        }));
        let properties = AnalysisServicesServerResource::expand_properties(&d);

        assert_eq!(properties.as_administrators.unwrap().members, vec!["admin@example.com"]);
        let firewall = properties.ip_v4_firewall_settings.unwrap();
        assert_eq!(firewall.enable_power_bi_service, Some(true));
        assert_eq!(firewall.firewall_rules[0].firewall_rule_name.as_deref(), Some("office"));
    }

    #[test]
    fn test_schema_rejects_bad_name() {
        let schema = AnalysisServicesServerResource.schema();
        let diags = schema.validate(
            json!({ "name": "Bad-Name", "location": "westeurope", "resource_group_name": "rg", "sku": "B1" })
                .as_object()
                .unwrap(),
        );
        assert!(diags.iter().any(|d| d.attribute.as_deref() == Some("name")));
    }
}
