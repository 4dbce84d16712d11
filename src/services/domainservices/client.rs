//! Azure AD Domain Services API (`2021-05-01`)

use super::ids::DomainServiceId;
use crate::azure::{ArmClient, ArmError};
use crate::resourceids::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2021-05-01";

pub const ENABLED: &str = "Enabled";
pub const DISABLED: &str = "Disabled";

/// Replica set status once its domain controllers are reachable
pub const SERVICE_STATUS_RUNNING: &str = "Running";

/// Domain controllers deployed per replica set
pub const DOMAIN_CONTROLLERS_PER_REPLICA_SET: usize = 2;

/// `Enabled`/`Disabled` as used throughout this API
pub fn enabled(value: bool) -> Option<String> {
    Some(if value { ENABLED } else { DISABLED }.to_string())
}

pub fn is_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(ENABLED))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub domain_controller_ip_address: Vec<String>,
    #[serde(default, skip_serializing)]
    pub external_access_ip_address: Option<String>,
    #[serde(default, skip_serializing)]
    pub service_status: Option<String>,
}

impl ReplicaSet {
    /// Running with every domain controller reachable
    pub fn is_ready(&self) -> bool {
        self.service_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(SERVICE_STATUS_RUNNING))
            && self.domain_controller_ip_address.len() == DOMAIN_CONTROLLERS_PER_REPLICA_SET
    }

    pub fn has_subnet(&self, subnet_id: &str) -> bool {
        self.subnet_id
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(subnet_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdapsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldaps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfx_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfx_certificate_password: Option<String>,
    #[serde(default, skip_serializing)]
    pub certificate_thumbprint: Option<String>,
    #[serde(default, skip_serializing)]
    pub certificate_not_after: Option<String>,
    #[serde(default, skip_serializing)]
    pub public_certificate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub additional_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_dc_admins: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_global_admins: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSecuritySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kerberos_armoring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kerberos_rc4_encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntlm_v1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_kerberos_passwords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_ntlm_passwords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_on_prem_passwords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_v1: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainServiceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_configuration_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_sync: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldaps_settings: Option<LdapsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_settings: Option<NotificationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_security_settings: Option<DomainSecuritySettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replica_sets: Vec<ReplicaSet>,
    #[serde(default, skip_serializing)]
    pub deployment_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub sync_owner: Option<String>,
    #[serde(default, skip_serializing)]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub version: Option<i64>,
    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainService {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub properties: DomainServiceProperties,
}

impl DomainService {
    pub fn replica_set(&self, replica_set_id: &str) -> Option<&ReplicaSet> {
        self.properties
            .replica_sets
            .iter()
            .find(|r| r.replica_set_id.as_deref().is_some_and(|id| id.eq_ignore_ascii_case(replica_set_id)))
    }
}

pub struct DomainServicesClient<'a> {
    client: &'a ArmClient,
}

impl<'a> DomainServicesClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &DomainServiceId) -> Result<DomainService, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update(&self, id: &DomainServiceId, service: &DomainService) -> Result<(), ArmError> {
        self.client.put(&id.id(), API_VERSION, service).await
    }

    pub async fn delete(&self, id: &DomainServiceId) -> Result<(), ArmError> {
        self.client.delete(&id.id(), API_VERSION).await
    }

    /// Poll the domain service until `done` holds for it
    pub async fn wait_for<F>(&self, id: &DomainServiceId, description: &str, done: F) -> Result<DomainService, ArmError>
    where
        F: Fn(&DomainService) -> bool + Send,
    {
        loop {
            let service = self.get(id).await?;
            if done(&service) {
                return Ok(service);
            }
            tracing::debug!("Waiting for {} of {}", description, id);
            tokio::time::sleep(self.client.poll_interval()).await;
        }
    }
}
