//! Video Analyzer API (`2021-05-01-preview`)

use super::ids::{EdgeModuleId, VideoAnalyzerId};
use crate::azure::{ArmClient, ArmError};
use crate::helpers::identity::Identity;
use crate::resourceids::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2021-05-01-preview";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    pub user_assigned_identity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ResourceIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalyzerProperties {
    #[serde(default)]
    pub storage_accounts: Vec<StorageAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalyzer {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<VideoAnalyzerProperties>,
}

/// PATCH body; location is immutable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalyzerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<VideoAnalyzerProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeModule {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct VideoAnalyzersClient<'a> {
    client: &'a ArmClient,
}

impl<'a> VideoAnalyzersClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &VideoAnalyzerId) -> Result<VideoAnalyzer, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update(&self, id: &VideoAnalyzerId, analyzer: &VideoAnalyzer) -> Result<(), ArmError> {
        self.client.put(&id.id(), API_VERSION, analyzer).await
    }

    pub async fn update(&self, id: &VideoAnalyzerId, update: &VideoAnalyzerUpdate) -> Result<(), ArmError> {
        self.client.patch(&id.id(), API_VERSION, update).await
    }

    pub async fn delete(&self, id: &VideoAnalyzerId) -> Result<(), ArmError> {
        self.client.delete(&id.id(), API_VERSION).await
    }
}

pub struct EdgeModulesClient<'a> {
    client: &'a ArmClient,
}

impl<'a> EdgeModulesClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &EdgeModuleId) -> Result<EdgeModule, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update(&self, id: &EdgeModuleId) -> Result<(), ArmError> {
        self.client.put(&id.id(), API_VERSION, &json!({})).await
    }

    pub async fn delete(&self, id: &EdgeModuleId) -> Result<(), ArmError> {
        self.client.delete(&id.id(), API_VERSION).await
    }
}
