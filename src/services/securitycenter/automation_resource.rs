use super::client::{
    Automation, AutomationAction, AutomationProperties, AutomationRuleSet, AutomationScope, AutomationSource,
    AutomationTriggeringRule, AutomationsClient, EventHubAction, LogicAppAction, WorkspaceAction,
};
use super::ids::AutomationId;
use crate::helpers::{location, tags};
use crate::provider::{ensure_not_exists, ProviderContext, Resource};
use crate::resourceids::{EventHubId, LogAnalyticsWorkspaceId, LogicAppWorkflowId, ResourceId};
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const TYPE_LOGIC_APP: &str = "LogicApp";
const TYPE_EVENT_HUB: &str = "EventHub";
const TYPE_LOG_ANALYTICS: &str = "LogAnalytics";
const ACTION_TYPES: &[&str] = &[TYPE_LOGIC_APP, TYPE_EVENT_HUB, TYPE_LOG_ANALYTICS];

const EVENT_SOURCES: &[&str] = &[
    "Alerts",
    "Assessments",
    "AssessmentsSnapshot",
    "RegulatoryComplianceAssessment",
    "RegulatoryComplianceAssessmentSnapshot",
    "SecureScoreControls",
    "SecureScoreControlsSnapshot",
    "SecureScores",
    "SecureScoresSnapshot",
    "SubAssessments",
    "SubAssessmentsSnapshot",
];

const OPERATORS: &[&str] = &[
    "Contains",
    "EndsWith",
    "Equals",
    "GreaterThan",
    "GreaterThanOrEqualTo",
    "LesserThan",
    "LesserThanOrEqualTo",
    "NotEquals",
    "StartsWith",
];

const PROPERTY_TYPES: &[&str] = &["Integer", "String", "Boolean", "Number"];

pub struct SecurityCenterAutomationResource;

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn expand_action(action: &Value, index: usize) -> Result<AutomationAction> {
    let kind = str_field(action, "type").unwrap_or_default();
    let resource_id = str_field(action, "resource_id").unwrap_or_default();

    if kind.eq_ignore_ascii_case(TYPE_LOGIC_APP) {
        LogicAppWorkflowId::parse(resource_id).with_context(|| format!("parsing `action.{index}.resource_id`"))?;
        let Some(trigger_url) = str_field(action, "trigger_url") else {
            bail!("`action.{index}.trigger_url` is required when the action type is {TYPE_LOGIC_APP:?}");
        };
        return Ok(AutomationAction::LogicApp(LogicAppAction {
            logic_app_resource_id: Some(resource_id.to_string()),
            uri: Some(trigger_url.to_string()),
        }));
    }

    if kind.eq_ignore_ascii_case(TYPE_EVENT_HUB) {
        EventHubId::parse(resource_id).with_context(|| format!("parsing `action.{index}.resource_id`"))?;
        let Some(connection_string) = str_field(action, "connection_string") else {
            bail!("`action.{index}.connection_string` is required when the action type is {TYPE_EVENT_HUB:?}");
        };
        return Ok(AutomationAction::EventHub(EventHubAction {
            event_hub_resource_id: Some(resource_id.to_string()),
            connection_string: Some(connection_string.to_string()),
            sas_policy_name: None,
        }));
    }

    if kind.eq_ignore_ascii_case(TYPE_LOG_ANALYTICS) {
        LogAnalyticsWorkspaceId::parse(resource_id)
            .with_context(|| format!("parsing `action.{index}.resource_id`"))?;
        return Ok(AutomationAction::Workspace(WorkspaceAction {
            workspace_resource_id: Some(resource_id.to_string()),
        }));
    }

    bail!("unsupported action type {kind:?} in `action.{index}.type`")
}

fn expand_actions(data: &ResourceData) -> Result<Vec<AutomationAction>> {
    data.get_list("action")
        .iter()
        .enumerate()
        .map(|(i, action)| expand_action(action, i))
        .collect()
}

fn expand_sources(data: &ResourceData) -> Vec<AutomationSource> {
    data.get_list("source")
        .iter()
        .map(|source| AutomationSource {
            event_source: str_field(source, "event_source").unwrap_or_default().to_string(),
            rule_sets: list(source, "rule_set")
                .iter()
                .map(|rule_set| AutomationRuleSet {
                    rules: list(rule_set, "rule")
                        .iter()
                        .map(|rule| AutomationTriggeringRule {
                            property_j_path: str_field(rule, "property_path").unwrap_or_default().to_string(),
                            property_type: str_field(rule, "property_type").unwrap_or_default().to_string(),
                            expected_value: str_field(rule, "expected_value").unwrap_or_default().to_string(),
                            operator: str_field(rule, "operator").unwrap_or_default().to_string(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn expand_scopes(data: &ResourceData) -> Vec<AutomationScope> {
    data.get_string_list("scopes")
        .into_iter()
        .map(|scope_path| AutomationScope {
            description: None,
            scope_path,
        })
        .collect()
}

/// The configured action with this resource ID, whose secrets the API never returns
fn configured_secret<'a>(configured: &'a [Value], resource_id: &str, key: &str) -> Option<&'a str> {
    configured
        .iter()
        .find(|a| str_field(a, "resource_id").is_some_and(|id| id.eq_ignore_ascii_case(resource_id)))
        .and_then(|a| str_field(a, key))
}

fn flatten_actions(actions: &[AutomationAction], configured: &[Value]) -> Vec<Value> {
    actions
        .iter()
        .filter_map(|action| match action {
            AutomationAction::LogicApp(a) => {
                let resource_id = a.logic_app_resource_id.clone().unwrap_or_default();
                let trigger_url = a
                    .uri
                    .as_deref()
                    .or_else(|| configured_secret(configured, &resource_id, "trigger_url"))
                    .unwrap_or_default();
                Some(json!({ "type": TYPE_LOGIC_APP, "resource_id": resource_id, "trigger_url": trigger_url }))
            }
            AutomationAction::EventHub(a) => {
                let resource_id = a.event_hub_resource_id.clone().unwrap_or_default();
                let connection_string = a
                    .connection_string
                    .as_deref()
                    .or_else(|| configured_secret(configured, &resource_id, "connection_string"))
                    .unwrap_or_default();
                Some(json!({ "type": TYPE_EVENT_HUB, "resource_id": resource_id, "connection_string": connection_string }))
            }
            AutomationAction::Workspace(a) => Some(json!({
                "type": TYPE_LOG_ANALYTICS,
                "resource_id": a.workspace_resource_id.clone().unwrap_or_default(),
            })),
            AutomationAction::Unknown(raw) => {
                tracing::warn!("Automation action of unsupported type {:?} is not tracked in state", raw.get("actionType"));
                None
            }
        })
        .collect()
}

fn flatten_sources(sources: &[AutomationSource]) -> Value {
    let sources: Vec<Value> = sources
        .iter()
        .map(|source| {
            let rule_sets: Vec<Value> = source
                .rule_sets
                .iter()
                .map(|rule_set| {
                    let rules: Vec<Value> = rule_set
                        .rules
                        .iter()
                        .map(|rule| {
                            json!({
                                "property_path": rule.property_j_path,
                                "property_type": rule.property_type,
                                "expected_value": rule.expected_value,
                                "operator": rule.operator,
                            })
                        })
                        .collect();
                    json!({ "rule": rules })
                })
                .collect();
            json!({ "event_source": source.event_source, "rule_set": rule_sets })
        })
        .collect();
    Value::Array(sources)
}

/// Actions of a kind the schema cannot express, carried over on update
fn unmanaged_actions(actions: Vec<AutomationAction>) -> impl Iterator<Item = AutomationAction> {
    actions
        .into_iter()
        .filter(|action| matches!(action, AutomationAction::Unknown(_)))
}

impl SecurityCenterAutomationResource {
    fn expand(data: &ResourceData) -> Result<Automation> {
        Ok(Automation {
            location: location::normalize(data.require_str("location")?),
            tags: Some(tags::expand(data)),
            properties: AutomationProperties {
                description: data.get_str("description").map(str::to_string),
                is_enabled: Some(data.get_bool("enabled").unwrap_or(true)),
                scopes: expand_scopes(data),
                sources: expand_sources(data),
                actions: expand_actions(data)?,
            },
            ..Default::default()
        })
    }
}

#[async_trait]
impl Resource for SecurityCenterAutomationResource {
    fn type_name(&self) -> &'static str {
        "azurerm_security_center_automation"
    }

    fn schema(&self) -> Schema {
        let rule = Schema::new()
            .attr(
                "property_path",
                Attribute::required(ValueType::String).validate(validation::string_is_not_empty()),
            )
            .attr(
                "expected_value",
                Attribute::required(ValueType::String).validate(validation::string_is_not_empty()),
            )
            .attr(
                "operator",
                Attribute::required(ValueType::String).validate(validation::string_in_slice(OPERATORS, false)),
            )
            .attr(
                "property_type",
                Attribute::required(ValueType::String).validate(validation::string_in_slice(PROPERTY_TYPES, true)),
            );

        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
            .attr("location", location::schema())
            .attr("resource_group_name", location::resource_group_name_schema())
            .attr("description", Attribute::optional(ValueType::String))
            .attr("enabled", Attribute::optional(ValueType::Bool).default(true))
            .attr(
                "scopes",
                Attribute::required(ValueType::List)
                    .min_items(1)
                    .elem_type(ValueType::String)
                    .validate(validation::each(validation::string_is_not_empty())),
            )
            .attr(
                "action",
                Attribute::optional(ValueType::List).block(
                    Schema::new()
                        .attr(
                            "type",
                            Attribute::required(ValueType::String)
                                .validate(validation::string_in_slice(ACTION_TYPES, true)),
                        )
                        .attr(
                            "resource_id",
                            Attribute::required(ValueType::String).validate(validation::string_is_not_empty()),
                        )
                        .attr("trigger_url", Attribute::optional(ValueType::String).validate(validation::is_url_with_https()))
                        .attr("connection_string", Attribute::optional(ValueType::String).sensitive()),
                ),
            )
            .attr(
                "source",
                Attribute::optional(ValueType::List).block(
                    Schema::new()
                        .attr(
                            "event_source",
                            Attribute::required(ValueType::String)
                                .validate(validation::string_in_slice(EVENT_SOURCES, true)),
                        )
                        .attr(
                            "rule_set",
                            Attribute::optional(ValueType::List).block(
                                Schema::new().attr("rule", Attribute::required(ValueType::List).min_items(1).block(rule)),
                            ),
                        ),
                ),
            )
            .attr("tags", tags::schema())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        AutomationId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = AutomationsClient::new(&ctx.client);
        let id = AutomationId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );

        ensure_not_exists(self.type_name(), &id.id(), client.get(&id).await)?;

        let automation = Self::expand(data)?;
        client
            .create_or_update(&id, &automation)
            .await
            .with_context(|| format!("creating {id}"))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = AutomationsClient::new(&ctx.client);
        let id = AutomationId::parse(data.id())?;

        let automation = match client.get(&id).await {
            Ok(automation) => automation,
            Err(err) if err.was_not_found() => {
                tracing::debug!("{} was not found - removing from state", id);
                data.set_id("");
                return Ok(());
            }
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {id}"))),
        };

        let properties = &automation.properties;
        let actions = flatten_actions(&properties.actions, data.get_list("action"));

        data.set("name", &id.automation_name)?;
        data.set("resource_group_name", &id.resource_group_name)?;
        data.set("location", location::normalize(&automation.location))?;
        data.set("description", &properties.description)?;
        data.set("enabled", properties.is_enabled.unwrap_or(false))?;
        data.set(
            "scopes",
            properties.scopes.iter().map(|s| s.scope_path.as_str()).collect::<Vec<_>>(),
        )?;
        data.set("action", actions)?;
        data.set("source", flatten_sources(&properties.sources))?;
        data.set("tags", tags::flatten(automation.tags.as_ref()))?;

        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = AutomationsClient::new(&ctx.client);
        let id = AutomationId::parse(data.id())?;

        let existing = client.get(&id).await.with_context(|| format!("retrieving {id}"))?;

        let mut automation = Self::expand(data)?;
        automation.properties.actions.extend(unmanaged_actions(existing.properties.actions));
        client
            .create_or_update(&id, &automation)
            .await
            .with_context(|| format!("updating {id}"))
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = AutomationsClient::new(&ctx.client);
        let id = AutomationId::parse(data.id())?;

        client
            .delete(&id)
            .await
            .with_context(|| format!("deleting {id}"))
    }
}
