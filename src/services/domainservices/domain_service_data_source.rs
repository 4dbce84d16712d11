use super::client::DomainServicesClient;
use super::domain_service_resource::{flatten_replica_set, flatten_secure_ldap, replica_set_schema, set_common};
use super::ids::DomainServiceId;
use crate::helpers::{location, tags};
use crate::provider::{DataSource, ProviderContext};
use crate::resourceids::ResourceId;
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct ActiveDirectoryDomainServiceDataSource;

fn computed_block(fields: &[(&str, ValueType)]) -> Attribute {
    let schema = fields
        .iter()
        .fold(Schema::new(), |schema, (name, value_type)| {
            schema.attr(name, Attribute::computed(*value_type))
        });
    Attribute::computed(ValueType::List).block(schema)
}

#[async_trait]
impl DataSource for ActiveDirectoryDomainServiceDataSource {
    fn type_name(&self) -> &'static str {
        "azurerm_active_directory_domain_service"
    }

    fn schema(&self) -> Schema {
        let computed = || Attribute::computed(ValueType::String);

        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validation::string_is_not_empty()),
            )
            .attr(
                "resource_group_name",
                Attribute::required(ValueType::String).validate(validation::string_is_not_empty()),
            )
            .attr("location", location::schema_computed())
            .attr("domain_name", computed())
            .attr("domain_configuration_type", computed())
            .attr("filtered_sync_enabled", Attribute::computed(ValueType::Bool))
            .attr("sku", computed())
            .attr(
                "replica_sets",
                Attribute::computed(ValueType::List).block(replica_set_schema(computed())),
            )
            .attr(
                "notifications",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr(
                            "additional_recipients",
                            Attribute::computed(ValueType::Set).elem_type(ValueType::String),
                        )
                        .attr("notify_dc_admins", Attribute::computed(ValueType::Bool))
                        .attr("notify_global_admins", Attribute::computed(ValueType::Bool)),
                ),
            )
            .attr(
                "secure_ldap",
                computed_block(&[
                    ("enabled", ValueType::Bool),
                    ("external_access_enabled", ValueType::Bool),
                    ("certificate_expiry", ValueType::String),
                    ("certificate_thumbprint", ValueType::String),
                    ("public_certificate", ValueType::String),
                ]),
            )
            .attr(
                "security",
                computed_block(&[
                    ("kerberos_armoring_enabled", ValueType::Bool),
                    ("kerberos_rc4_encryption_enabled", ValueType::Bool),
                    ("ntlm_v1_enabled", ValueType::Bool),
                    ("sync_kerberos_passwords", ValueType::Bool),
                    ("sync_ntlm_passwords", ValueType::Bool),
                    ("sync_on_prem_passwords", ValueType::Bool),
                    ("tls_v1_enabled", ValueType::Bool),
                ]),
            )
            .attr("deployment_id", computed())
            .attr("resource_id", computed())
            .attr("sync_owner", computed())
            .attr("tenant_id", computed())
            .attr("version", Attribute::computed(ValueType::Int))
            .attr("tags", tags::schema_computed())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );

        let service = client.get(&id).await.map_err(|err| {
            if err.was_not_found() {
                anyhow::anyhow!("{id} was not found")
            } else {
                anyhow::Error::new(err).context(format!("retrieving {id}"))
            }
        })?;

        data.set_id(id.id());
        set_common(data, &id, &service)?;

        let replica_sets: Vec<Value> = service.properties.replica_sets.iter().map(flatten_replica_set).collect();
        data.set("replica_sets", replica_sets)?;
        data.set(
            "secure_ldap",
            flatten_secure_ldap(service.properties.ldaps_settings.as_ref(), None),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lookup_fields_are_configurable() {
        let schema = ActiveDirectoryDomainServiceDataSource.schema();
        assert!(schema.get("name").unwrap().required);
        assert!(schema.get("resource_group_name").unwrap().required);
        assert!(schema.get("replica_sets").unwrap().computed);
        assert!(!schema.get("sku").unwrap().optional);
    }
}
