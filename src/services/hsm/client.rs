//! Managed HSM API (`2021-10-01`)

use super::ids::{DeletedManagedHsmId, ManagedHsmId};
use crate::azure::{ArmClient, ArmError};
use crate::resourceids::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2021-10-01";

pub const CREATE_MODE_DEFAULT: &str = "default";
pub const CREATE_MODE_RECOVER: &str = "recover";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedHsmSku {
    pub family: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAcls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedHsmProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_admin_object_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_soft_delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete_retention_in_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_purge_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_acls: Option<NetworkAcls>,
    #[serde(default, skip_serializing)]
    pub hsm_uri: Option<String>,
    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedHsm {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<ManagedHsmSku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagedHsmProperties>,
}

impl ManagedHsm {
    pub fn purge_protection_enabled(&self) -> bool {
        self.properties
            .as_ref()
            .and_then(|p| p.enable_purge_protection)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedManagedHsmProperties {
    #[serde(default)]
    pub mhsm_id: Option<String>,
    #[serde(default)]
    pub deletion_date: Option<String>,
    #[serde(default)]
    pub scheduled_purge_date: Option<String>,
    #[serde(default)]
    pub purge_protection_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeletedManagedHsm {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Option<DeletedManagedHsmProperties>,
}

pub struct ManagedHsmClient<'a> {
    client: &'a ArmClient,
}

impl<'a> ManagedHsmClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &ManagedHsmId) -> Result<ManagedHsm, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update(&self, id: &ManagedHsmId, hsm: &ManagedHsm) -> Result<(), ArmError> {
        self.client.put(&id.id(), API_VERSION, hsm).await
    }

    pub async fn update(&self, id: &ManagedHsmId, hsm: &ManagedHsm) -> Result<(), ArmError> {
        self.client.patch(&id.id(), API_VERSION, hsm).await
    }

    pub async fn delete(&self, id: &ManagedHsmId) -> Result<(), ArmError> {
        self.client.delete(&id.id(), API_VERSION).await
    }

    pub async fn get_deleted(&self, id: &DeletedManagedHsmId) -> Result<DeletedManagedHsm, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn purge_deleted(&self, id: &DeletedManagedHsmId) -> Result<(), ArmError> {
        self.client
            .post(&format!("{}/purge", id.id()), API_VERSION, None)
            .await
            .map(|_| ())
    }
}
