//! Security Center automations API (`2019-01-01-preview`)
//!
//! Automation actions are polymorphic on `actionType`. They decode into
//! [`AutomationAction`], matching the discriminator case-insensitively and
//! keeping kinds this crate does not model as raw JSON so they survive a
//! read-modify-write cycle unchanged.

use super::ids::AutomationId;
use crate::azure::{ArmClient, ArmError};
use crate::resourceids::ResourceId;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2019-01-01-preview";

const ACTION_TYPE: &str = "actionType";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicAppAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_app_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHubAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_hub_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(default, skip_serializing)]
    pub sas_policy_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_resource_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationAction {
    LogicApp(LogicAppAction),
    EventHub(EventHubAction),
    Workspace(WorkspaceAction),
    /// An action type not modelled here, kept verbatim
    Unknown(Value),
}

impl AutomationAction {
    pub fn action_type(&self) -> Option<&str> {
        match self {
            Self::LogicApp(_) => Some("LogicApp"),
            Self::EventHub(_) => Some("EventHub"),
            Self::Workspace(_) => Some("Workspace"),
            Self::Unknown(value) => value.get(ACTION_TYPE).and_then(Value::as_str),
        }
    }
}

impl<'de> Deserialize<'de> for AutomationAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let kind = value
            .get(ACTION_TYPE)
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase);

        let action = match kind.as_deref() {
            Some("logicapp") => Self::LogicApp(serde_json::from_value(value).map_err(D::Error::custom)?),
            Some("eventhub") => Self::EventHub(serde_json::from_value(value).map_err(D::Error::custom)?),
            Some("workspace") => Self::Workspace(serde_json::from_value(value).map_err(D::Error::custom)?),
            _ => Self::Unknown(value),
        };
        Ok(action)
    }
}

impl Serialize for AutomationAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = match self {
            Self::LogicApp(action) => serde_json::to_value(action).map_err(S::Error::custom)?,
            Self::EventHub(action) => serde_json::to_value(action).map_err(S::Error::custom)?,
            Self::Workspace(action) => serde_json::to_value(action).map_err(S::Error::custom)?,
            Self::Unknown(value) => return value.serialize(serializer),
        };

        if let (Value::Object(map), Some(kind)) = (&mut value, self.action_type()) {
            map.insert(ACTION_TYPE.to_string(), Value::String(kind.to_string()));
        }
        value.serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub scope_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationTriggeringRule {
    #[serde(default)]
    pub property_j_path: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub expected_value: String,
    #[serde(default)]
    pub operator: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRuleSet {
    #[serde(default)]
    pub rules: Vec<AutomationTriggeringRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSource {
    #[serde(default)]
    pub event_source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_sets: Vec<AutomationRuleSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub scopes: Vec<AutomationScope>,
    #[serde(default)]
    pub sources: Vec<AutomationSource>,
    #[serde(default)]
    pub actions: Vec<AutomationAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub properties: AutomationProperties,
}

pub struct AutomationsClient<'a> {
    client: &'a ArmClient,
}

impl<'a> AutomationsClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &AutomationId) -> Result<Automation, ArmError> {
        self.client.get(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update(&self, id: &AutomationId, automation: &Automation) -> Result<(), ArmError> {
        self.client.put(&id.id(), API_VERSION, automation).await
    }

    pub async fn delete(&self, id: &AutomationId) -> Result<(), ArmError> {
        self.client.delete(&id.id(), API_VERSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_type_is_case_insensitive() {
        let action: AutomationAction = serde_json::from_value(json!({
            "actionType": "logicapp",
            "logicAppResourceId": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Logic/workflows/wf"
        }))
        .unwrap();

        let AutomationAction::LogicApp(logic_app) = &action else {
            panic!("expected a LogicApp action, got {action:?}");
        };
        assert!(logic_app.uri.is_none());
        assert_eq!(serde_json::to_value(&action).unwrap()["actionType"], json!("LogicApp"));
    }

    #[test]
    fn test_unknown_action_survives() {
        let raw = json!({ "actionType": "Teams", "channel": "alerts", "nested": { "a": 1 } });
        let action: AutomationAction = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(action, AutomationAction::Unknown(raw.clone()));
        assert_eq!(action.action_type(), Some("Teams"));
        assert_eq!(serde_json::to_value(&action).unwrap(), raw);
    }

    #[test]
    fn test_event_hub_sas_policy_is_read_only() {
        let action: AutomationAction = serde_json::from_value(json!({
            "actionType": "EventHub",
            "eventHubResourceId": "eh",
            "sasPolicyName": "send"
        }))
        .unwrap();
        let AutomationAction::EventHub(event_hub) = &action else {
            panic!("expected an EventHub action, got {action:?}");
        };
        assert_eq!(event_hub.sas_policy_name.as_deref(), Some("send"));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "actionType": "EventHub", "eventHubResourceId": "eh" })
        );
    }
}
