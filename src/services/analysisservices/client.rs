//! Analysis Services servers API (`2017-08-01`)

use super::ids::ServerId;
use crate::azure::{ArmClient, ArmError};
use crate::resourceids::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2017-08-01";

/// Server state reported while it is suspended
pub const STATE_PAUSED: &str = "Paused";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAdministrators {
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IPv4FirewallRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_rule_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IPv4FirewallSettings {
    #[serde(default)]
    pub firewall_rules: Vec<IPv4FirewallRule>,
    #[serde(rename = "enablePowerBIService", default, skip_serializing_if = "Option::is_none")]
    pub enable_power_bi_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_administrators: Option<ServerAdministrators>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_blob_container_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_v4_firewall_settings: Option<IPv4FirewallSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub querypool_connection_mode: Option<String>,
    #[serde(default, skip_serializing)]
    pub server_full_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub state: Option<String>,
    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub location: String,
    pub sku: ResourceSku,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServerProperties>,
}

impl Server {
    pub fn is_paused(&self) -> bool {
        self.properties
            .as_ref()
            .and_then(|p| p.state.as_deref())
            .is_some_and(|s| s.eq_ignore_ascii_case(STATE_PAUSED))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerUpdateParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<ResourceSku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServerProperties>,
}

pub struct ServersClient<'a> {
    client: &'a ArmClient,
}

impl<'a> ServersClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &ServerId) -> Result<Server, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn create(&self, id: &ServerId, server: &Server) -> Result<(), ArmError> {
        self.client.put(&id.id(), API_VERSION, server).await
    }

    pub async fn update(&self, id: &ServerId, parameters: &ServerUpdateParameters) -> Result<(), ArmError> {
        self.client.patch(&id.id(), API_VERSION, parameters).await
    }

    pub async fn delete(&self, id: &ServerId) -> Result<(), ArmError> {
        self.client.delete(&id.id(), API_VERSION).await
    }

    pub async fn suspend(&self, id: &ServerId) -> Result<(), ArmError> {
        self.client
            .post(&format!("{}/suspend", id.id()), API_VERSION, None)
            .await
            .map(|_| ())
    }

    pub async fn resume(&self, id: &ServerId) -> Result<(), ArmError> {
        self.client
            .post(&format!("{}/resume", id.id()), API_VERSION, None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_server() {
        let server: Server = serde_json::from_value(json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AnalysisServices/servers/srv",
            "location": "West Europe",
            "sku": { "name": "B1", "tier": "Basic", "capacity": 1 },
            "properties": {
                "state": "Paused",
                "serverFullName": "asazure://westeurope.asazure.windows.net/srv",
                "ipV4FirewallSettings": {
                    "firewallRules": [{ "firewallRuleName": "all", "rangeStart": "0.0.0.0", "rangeEnd": "255.255.255.255" }],
                    "enablePowerBIService": true
                }
            }
        }))
        .unwrap();

        assert!(server.is_paused());
        let firewall = server.properties.unwrap().ip_v4_firewall_settings.unwrap();
        assert_eq!(firewall.enable_power_bi_service, Some(true));
        assert_eq!(firewall.firewall_rules[0].range_start.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn test_read_only_fields_are_not_sent() {
        let server = Server {
            location: "westeurope".to_string(),
            sku: ResourceSku {
                name: "B1".to_string(),
                ..Default::default()
            },
            properties: Some(ServerProperties {
                state: Some("Succeeded".to_string()),
                querypool_connection_mode: Some("All".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&server).unwrap(),
            json!({
                "location": "westeurope",
                "sku": { "name": "B1" },
                "properties": { "querypoolConnectionMode": "All" }
            })
        );
    }
}
