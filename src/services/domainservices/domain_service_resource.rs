use super::client::{
    enabled, is_enabled, DomainService, DomainServiceProperties, DomainSecuritySettings, DomainServicesClient,
    LdapsSettings, NotificationSettings, ReplicaSet,
};
use super::ids::DomainServiceId;
use crate::helpers::{location, tags};
use crate::provider::{ensure_not_exists, ProviderContext, Resource, Timeouts};
use crate::resourceids::{ResourceId, SubnetId};
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const SKUS: &[&str] = &["Standard", "Enterprise", "Premium"];

const SECURITY_SETTINGS: &[&str] = &[
    "kerberos_armoring_enabled",
    "kerberos_rc4_encryption_enabled",
    "ntlm_v1_enabled",
    "sync_kerberos_passwords",
    "sync_ntlm_passwords",
    "sync_on_prem_passwords",
    "tls_v1_enabled",
];

pub struct ActiveDirectoryDomainServiceResource;

/// Lock shared by everything that rewrites a domain service's replica sets
pub(super) fn lock_name(domain_service_name: &str) -> String {
    format!("azurerm_active_directory_domain_service.{domain_service_name}")
}

pub(super) fn all_replica_sets_ready(service: &DomainService) -> bool {
    !service.properties.replica_sets.is_empty() && service.properties.replica_sets.iter().all(ReplicaSet::is_ready)
}

fn expand_notifications(data: &ResourceData) -> Option<NotificationSettings> {
    data.get("notifications.0").map(|_| NotificationSettings {
        additional_recipients: data.get_string_list("notifications.0.additional_recipients"),
        notify_dc_admins: enabled(data.get_bool("notifications.0.notify_dc_admins").unwrap_or(false)),
        notify_global_admins: enabled(data.get_bool("notifications.0.notify_global_admins").unwrap_or(false)),
    })
}

fn expand_secure_ldap(data: &ResourceData) -> LdapsSettings {
    if data.get("secure_ldap.0").is_none() {
        return LdapsSettings {
            ldaps: enabled(false),
            ..Default::default()
        };
    }

    LdapsSettings {
        ldaps: enabled(data.get_bool("secure_ldap.0.enabled").unwrap_or(false)),
        external_access: enabled(data.get_bool("secure_ldap.0.external_access_enabled").unwrap_or(false)),
        pfx_certificate: data.get_str("secure_ldap.0.pfx_certificate").map(str::to_string),
        pfx_certificate_password: data.get_str("secure_ldap.0.pfx_certificate_password").map(str::to_string),
        ..Default::default()
    }
}

fn expand_security(data: &ResourceData) -> Option<DomainSecuritySettings> {
    data.get("security.0")?;
    let flag = |name: &str| enabled(data.get_bool(&format!("security.0.{name}")).unwrap_or(false));

    Some(DomainSecuritySettings {
        kerberos_armoring: flag("kerberos_armoring_enabled"),
        kerberos_rc4_encryption: flag("kerberos_rc4_encryption_enabled"),
        ntlm_v1: flag("ntlm_v1_enabled"),
        sync_kerberos_passwords: flag("sync_kerberos_passwords"),
        sync_ntlm_passwords: flag("sync_ntlm_passwords"),
        sync_on_prem_passwords: flag("sync_on_prem_passwords"),
        tls_v1: flag("tls_v1_enabled"),
    })
}

/// Apply the configured settings on top of `properties`, leaving replica sets alone
fn apply_settings(data: &ResourceData, properties: &mut DomainServiceProperties) {
    properties.sku = data.get_str("sku").map(str::to_string);
    properties.filtered_sync = enabled(data.get_bool("filtered_sync_enabled").unwrap_or(false));
    properties.ldaps_settings = Some(expand_secure_ldap(data));
    if let Some(notifications) = expand_notifications(data) {
        properties.notification_settings = Some(notifications);
    }
    if let Some(security) = expand_security(data) {
        properties.domain_security_settings = Some(security);
    }
}

pub(super) fn flatten_replica_set(replica: &ReplicaSet) -> Value {
    json!({
        "id": replica.replica_set_id.clone().unwrap_or_default(),
        "location": location::normalize(replica.location.as_deref().unwrap_or_default()),
        "subnet_id": replica.subnet_id.clone().unwrap_or_default(),
        "domain_controller_ip_addresses": replica.domain_controller_ip_address,
        "external_access_ip_address": replica.external_access_ip_address.clone().unwrap_or_default(),
        "service_status": replica.service_status.clone().unwrap_or_default(),
    })
}

pub(super) fn flatten_notifications(settings: Option<&NotificationSettings>) -> Value {
    match settings {
        Some(s) => json!([{
            "additional_recipients": s.additional_recipients,
            "notify_dc_admins": is_enabled(s.notify_dc_admins.as_deref()),
            "notify_global_admins": is_enabled(s.notify_global_admins.as_deref()),
        }]),
        None => json!([]),
    }
}

pub(super) fn flatten_security(settings: Option<&DomainSecuritySettings>) -> Value {
    match settings {
        Some(s) => json!([{
            "kerberos_armoring_enabled": is_enabled(s.kerberos_armoring.as_deref()),
            "kerberos_rc4_encryption_enabled": is_enabled(s.kerberos_rc4_encryption.as_deref()),
            "ntlm_v1_enabled": is_enabled(s.ntlm_v1.as_deref()),
            "sync_kerberos_passwords": is_enabled(s.sync_kerberos_passwords.as_deref()),
            "sync_ntlm_passwords": is_enabled(s.sync_ntlm_passwords.as_deref()),
            "sync_on_prem_passwords": is_enabled(s.sync_on_prem_passwords.as_deref()),
            "tls_v1_enabled": is_enabled(s.tls_v1.as_deref()),
        }]),
        None => json!([]),
    }
}

/// Secure LDAP block; the certificate and its password are never returned, so
/// they are taken from `data` when present
pub(super) fn flatten_secure_ldap(settings: Option<&LdapsSettings>, data: Option<&ResourceData>) -> Value {
    let Some(s) = settings.filter(|s| is_enabled(s.ldaps.as_deref())) else {
        return json!([]);
    };

    let mut block = json!({
        "enabled": true,
        "external_access_enabled": is_enabled(s.external_access.as_deref()),
        "certificate_expiry": s.certificate_not_after.clone().unwrap_or_default(),
        "certificate_thumbprint": s.certificate_thumbprint.clone().unwrap_or_default(),
        "public_certificate": s.public_certificate.clone().unwrap_or_default(),
    });
    if let Some(data) = data {
        block["pfx_certificate"] = json!(data.get_string("secure_ldap.0.pfx_certificate"));
        block["pfx_certificate_password"] = json!(data.get_string("secure_ldap.0.pfx_certificate_password"));
    }
    json!([block])
}

/// Attributes shared by the resource and the data source
pub(super) fn set_common(data: &mut ResourceData, id: &DomainServiceId, service: &DomainService) -> Result<()> {
    let properties = &service.properties;

    data.set("name", &id.domain_service_name)?;
    data.set("resource_group_name", &id.resource_group_name)?;
    data.set("location", location::normalize(service.location.as_deref().unwrap_or_default()))?;
    data.set("domain_name", &properties.domain_name)?;
    data.set("domain_configuration_type", &properties.domain_configuration_type)?;
    data.set("filtered_sync_enabled", is_enabled(properties.filtered_sync.as_deref()))?;
    data.set("sku", &properties.sku)?;
    data.set("notifications", flatten_notifications(properties.notification_settings.as_ref()))?;
    data.set("security", flatten_security(properties.domain_security_settings.as_ref()))?;
    data.set("deployment_id", &properties.deployment_id)?;
    data.set("resource_id", &service.id)?;
    data.set("sync_owner", &properties.sync_owner)?;
    data.set("tenant_id", &properties.tenant_id)?;
    data.set("version", properties.version)?;
    data.set("tags", tags::flatten(service.tags.as_ref()))?;
    Ok(())
}

pub(super) fn replica_set_schema(subnet: Attribute) -> Schema {
    Schema::new()
        .attr("subnet_id", subnet)
        .attr(
            "domain_controller_ip_addresses",
            Attribute::computed(ValueType::List).elem_type(ValueType::String),
        )
        .attr("external_access_ip_address", Attribute::computed(ValueType::String))
        .attr("id", Attribute::computed(ValueType::String))
        .attr("location", Attribute::computed(ValueType::String))
        .attr("service_status", Attribute::computed(ValueType::String))
}

#[async_trait]
impl Resource for ActiveDirectoryDomainServiceResource {
    fn type_name(&self) -> &'static str {
        "azurerm_active_directory_domain_service"
    }

    fn schema(&self) -> Schema {
        let security = SECURITY_SETTINGS.iter().fold(Schema::new(), |schema, name| {
            schema.attr(name, Attribute::optional(ValueType::Bool).default(false))
        });

        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
            .attr("location", location::schema())
            .attr("resource_group_name", location::resource_group_name_schema())
            .attr(
                "domain_name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
            .attr(
                "domain_configuration_type",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .validate(validation::string_in_slice(&["FullySynced", "ResourceTrusting"], false)),
            )
            .attr(
                "sku",
                Attribute::required(ValueType::String).validate(validation::string_in_slice(SKUS, false)),
            )
            .attr("filtered_sync_enabled", Attribute::optional(ValueType::Bool).default(false))
            .attr(
                "initial_replica_set",
                Attribute::required(ValueType::List)
                    .max_items(1)
                    .block(replica_set_schema(
                        Attribute::required(ValueType::String)
                            .force_new()
                            .validate(validation::resource_id::<SubnetId>()),
                    )),
            )
            .attr(
                "notifications",
                Attribute::optional(ValueType::List).also_computed().max_items(1).block(
                    Schema::new()
                        .attr(
                            "additional_recipients",
                            Attribute::optional(ValueType::Set)
                                .elem_type(ValueType::String)
                                .validate(validation::each(validation::string_is_not_empty())),
                        )
                        .attr("notify_dc_admins", Attribute::optional(ValueType::Bool).default(false))
                        .attr("notify_global_admins", Attribute::optional(ValueType::Bool).default(false)),
                ),
            )
            .attr(
                "secure_ldap",
                Attribute::optional(ValueType::List).max_items(1).block(
                    Schema::new()
                        .attr("enabled", Attribute::required(ValueType::Bool))
                        .attr("external_access_enabled", Attribute::optional(ValueType::Bool).default(false))
                        .attr(
                            "pfx_certificate",
                            Attribute::required(ValueType::String)
                                .sensitive()
                                .validate(validation::string_is_not_empty()),
                        )
                        .attr(
                            "pfx_certificate_password",
                            Attribute::required(ValueType::String)
                                .sensitive()
                                .validate(validation::string_is_not_empty()),
                        )
                        .attr("certificate_expiry", Attribute::computed(ValueType::String))
                        .attr("certificate_thumbprint", Attribute::computed(ValueType::String))
                        .attr("public_certificate", Attribute::computed(ValueType::String)),
                ),
            )
            .attr(
                "security",
                Attribute::optional(ValueType::List).also_computed().max_items(1).block(security),
            )
            .attr("tags", tags::schema())
            .attr("deployment_id", Attribute::computed(ValueType::String))
            .attr("resource_id", Attribute::computed(ValueType::String))
            .attr("sync_owner", Attribute::computed(ValueType::String))
            .attr("tenant_id", Attribute::computed(ValueType::String))
            .attr("version", Attribute::computed(ValueType::Int))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(180, 5, 120, 60)
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        DomainServiceId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );

        let _lock = ctx.locks.lock(&lock_name(&id.domain_service_name)).await;

        ensure_not_exists(self.type_name(), &id.id(), client.get(&id).await)?;

        let location = location::normalize(data.require_str("location")?);
        let mut properties = DomainServiceProperties {
            domain_name: data.get_str("domain_name").map(str::to_string),
            domain_configuration_type: data.get_str("domain_configuration_type").map(str::to_string),
            replica_sets: vec![ReplicaSet {
                location: Some(location.clone()),
                subnet_id: data.get_str("initial_replica_set.0.subnet_id").map(str::to_string),
                ..Default::default()
            }],
            ..Default::default()
        };
        apply_settings(data, &mut properties);

        let service = DomainService {
            location: Some(location),
            tags: Some(tags::expand(data)),
            properties,
            ..Default::default()
        };

        client
            .create_or_update(&id, &service)
            .await
            .with_context(|| format!("creating {id}"))?;
        data.set_id(id.id());

        // the resource reports success before its domain controllers are reachable
        client
            .wait_for(&id, "the initial replica set", all_replica_sets_ready)
            .await
            .with_context(|| format!("waiting for the initial replica set of {id} to become available"))?;

        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceId::parse(data.id())?;

        let service = match client.get(&id).await {
            Ok(service) => service,
            Err(err) if err.was_not_found() => {
                tracing::debug!("{} was not found - removing from state", id);
                data.set_id("");
                return Ok(());
            }
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {id}"))),
        };

        set_common(data, &id, &service)?;

        let known = data.get_str("initial_replica_set.0.id").unwrap_or_default().to_string();
        let initial = service
            .replica_set(&known)
            .or_else(|| service.properties.replica_sets.first());
        let initial_replica_set: Vec<Value> = initial.map(flatten_replica_set).into_iter().collect();
        data.set("initial_replica_set", initial_replica_set)?;

        let secure_ldap = flatten_secure_ldap(service.properties.ldaps_settings.as_ref(), Some(&*data));
        data.set("secure_ldap", secure_ldap)?;

        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceId::parse(data.id())?;

        let _lock = ctx.locks.lock(&lock_name(&id.domain_service_name)).await;

        let mut service = client
            .get(&id)
            .await
            .with_context(|| format!("retrieving {id}"))?;

        apply_settings(data, &mut service.properties);
        if data.has_change("tags") {
            service.tags = Some(tags::expand(data));
        }

        client
            .create_or_update(&id, &service)
            .await
            .with_context(|| format!("updating {id}"))?;

        client
            .wait_for(&id, "replica sets", all_replica_sets_ready)
            .await
            .with_context(|| format!("waiting for the replica sets of {id} to become available"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceId::parse(data.id())?;

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
    fn test_apply_settings() {
        let d = data(json!({
            "sku": "Enterprise",
            "filtered_sync_enabled": true,
            "notifications": [{ "additional_recipients": ["ops@example.com"], "notify_dc_admins": true }],
            "security": [{ "ntlm_v1_enabled": true, "tls_v1_enabled": false }]
        }));

        let mut properties = DomainServiceProperties::default();
        apply_settings(&d, &mut properties);

        assert_eq!(properties.sku.as_deref(), Some("Enterprise"));
        assert_eq!(properties.filtered_sync.as_deref(), Some("Enabled"));
        assert_eq!(properties.ldaps_settings.unwrap().ldaps.as_deref(), Some("Disabled"));

        let notifications = properties.notification_settings.unwrap();
        assert_eq!(notifications.notify_dc_admins.as_deref(), Some("Enabled"));
        assert_eq!(notifications.notify_global_admins.as_deref(), Some("Disabled"));

        let security = properties.domain_security_settings.unwrap();
        assert_eq!(security.ntlm_v1.as_deref(), Some("Enabled"));
        assert_eq!(security.tls_v1.as_deref(), Some("Disabled"));
    }

    #[test]
    fn test_secure_ldap_keeps_secrets_from_state() {
        let settings = LdapsSettings {
            ldaps: Some("Enabled".to_string()),
            external_access: Some("Disabled".to_string()),
            certificate_thumbprint: Some("ABC".to_string()),
            ..Default::default()
        };
        let d = data(json!({
            "secure_ldap": [{ "enabled": true, "pfx_certificate": "cert", "pfx_certificate_password": "pass" }]
        }));

        let flat = flatten_secure_ldap(Some(&settings), Some(&d));
        assert_eq!(flat[0]["pfx_certificate"], json!("cert"));
        assert_eq!(flat[0]["pfx_certificate_password"], json!("pass"));
        assert_eq!(flat[0]["certificate_thumbprint"], json!("ABC"));

        let disabled = LdapsSettings {
            ldaps: Some("Disabled".to_string()),
            ..Default::default()
        };
        assert_eq!(flatten_secure_ldap(Some(&disabled), Some(&d)), json!([]));
    }

    #[test]
    fn test_all_replica_sets_ready() {
        let mut service = DomainService::default();
        assert!(!all_replica_sets_ready(&service));

        service.properties.replica_sets.push(ReplicaSet {
            service_status: Some("Running".to_string()),
            domain_controller_ip_address: vec!["10.0.0.4".to_string(), "10.0.0.5".to_string()],
            ..Default::default()
        });
        assert!(all_replica_sets_ready(&service));

        service.properties.replica_sets.push(ReplicaSet {
            service_status: Some("Running".to_string()),
            domain_controller_ip_address: vec!["10.1.0.4".to_string()],
            ..Default::default()
        });
        assert!(!all_replica_sets_ready(&service));
    }
}
