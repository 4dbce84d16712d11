//! Provider functions
//!
//! `parse_resource_id` splits an arbitrary ARM ID into its components and
//! `normalise_resource_id` re-cases one to the canonical form ARM returns.

use super::registry;
use crate::config::provider_schema;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::protocol::*;
use crate::resourceids::{normalise_resource_id, parse_generic};
use crate::schema::ValueType;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

pub const PARSE_RESOURCE_ID: &str = "parse_resource_id";
pub const NORMALISE_RESOURCE_ID: &str = "normalise_resource_id";

#[derive(Default)]
pub struct FunctionServer;

impl FunctionServer {
    pub fn new() -> Self {
        Self
    }

    fn signatures() -> BTreeMap<String, FunctionSignature> {
        let id_parameter = || FunctionParameter {
            name: "id".to_string(),
            value_type: ValueType::String,
            description: "Resource ID to process".to_string(),
        };

        BTreeMap::from([
            (
                PARSE_RESOURCE_ID.to_string(),
                FunctionSignature {
                    summary: "Parses an Azure Resource Manager ID into its components".to_string(),
                    parameters: vec![id_parameter()],
                    return_type: ValueType::Map,
                },
            ),
            (
                NORMALISE_RESOURCE_ID.to_string(),
                FunctionSignature {
                    summary: "Normalises the casing of an Azure Resource Manager ID".to_string(),
                    parameters: vec![id_parameter()],
                    return_type: ValueType::String,
                },
            ),
        ])
    }

    fn call(name: &str, arguments: &[Value]) -> Result<Value> {
        let id = match arguments {
            [Value::String(id)] => id.as_str(),
            [other] => bail!("expected the `id` argument to be a string, got {other}"),
            _ => bail!("{name} takes exactly one argument, got {}", arguments.len()),
        };

        match name {
            PARSE_RESOURCE_ID => Ok(serde_json::to_value(parse_generic(id)?)?),
            NORMALISE_RESOURCE_ID => Ok(Value::String(normalise_resource_id(id, &registry::id_templates()))),
            other => bail!("unknown function {other:?}"),
        }
    }
}

fn not_served(rpc: &str) -> Diagnostics {
    Diagnostic::error("Unsupported call", format!("{rpc} is not served by the function server")).into()
}

#[async_trait]
impl ProviderServer for FunctionServer {
    async fn get_metadata(&self) -> ServerMetadata {
        ServerMetadata {
            functions: Self::signatures().into_keys().collect(),
            ..Default::default()
        }
    }

    async fn get_provider_schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: provider_schema(),
            functions: Self::signatures(),
            ..Default::default()
        }
    }

    async fn configure_provider(&self, _request: ConfigureProviderRequest) -> ConfigureProviderResponse {
        ConfigureProviderResponse::default()
    }

    async fn validate_resource_config(
        &self,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: not_served("ValidateResourceConfig"),
        }
    }

    async fn plan_resource_change(&self, _request: PlanResourceChangeRequest) -> PlanResourceChangeResponse {
        PlanResourceChangeResponse {
            diagnostics: not_served("PlanResourceChange"),
            ..Default::default()
        }
    }

    async fn apply_resource_change(&self, _request: ApplyResourceChangeRequest) -> ApplyResourceChangeResponse {
        ApplyResourceChangeResponse {
            diagnostics: not_served("ApplyResourceChange"),
            ..Default::default()
        }
    }

    async fn read_resource(&self, _request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            diagnostics: not_served("ReadResource"),
            ..Default::default()
        }
    }

    async fn import_resource_state(&self, _request: ImportResourceStateRequest) -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            diagnostics: not_served("ImportResourceState"),
            ..Default::default()
        }
    }

    async fn read_data_source(&self, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        ReadDataSourceResponse {
            diagnostics: not_served("ReadDataSource"),
            ..Default::default()
        }
    }

    async fn call_function(&self, request: CallFunctionRequest) -> CallFunctionResponse {
        match Self::call(&request.name, &request.arguments) {
            Ok(result) => CallFunctionResponse {
                result: Some(result),
                diagnostics: Diagnostics::new(),
            },
            Err(err) => CallFunctionResponse {
                result: None,
                diagnostics: Diagnostics::from_error(format!("Calling {}", request.name), &err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn call(name: &str, arguments: Vec<Value>) -> CallFunctionResponse {
        FunctionServer::new()
            .call_function(CallFunctionRequest {
                name: name.to_string(),
                arguments,
            })
            .await
    }

    #[tokio::test]
    async fn test_parse_resource_id() {
        let response = call(
            PARSE_RESOURCE_ID,
            vec![json!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AnalysisServices/servers/srv")],
        )
        .await;
        assert!(response.diagnostics.is_empty());
        let result = response.result.unwrap();
        assert_eq!(result["resource_name"], json!("srv"));
        assert_eq!(result["resource_provider"], json!("Microsoft.AnalysisServices"));
        assert_eq!(result["full_resource_type"], json!("Microsoft.AnalysisServices/servers"));
    }

    #[tokio::test]
    async fn test_normalise_resource_id() {
        let response = call(
            NORMALISE_RESOURCE_ID,
            vec![json!("/SUBSCRIPTIONS/sub/RESOURCEGROUPS/rg/PROVIDERS/Microsoft.AnalysisServices/SERVERS/srv")],
        )
        .await;
        assert_eq!(
            response.result,
            Some(json!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AnalysisServices/servers/srv"))
        );
    }

    #[tokio::test]
    async fn test_bad_arguments_become_diagnostics() {
        let response = call(PARSE_RESOURCE_ID, vec![]).await;
        assert!(response.diagnostics.has_errors());

        let response = call(PARSE_RESOURCE_ID, vec![json!(1)]).await;
        assert!(response.diagnostics.has_errors());

        let response = call(PARSE_RESOURCE_ID, vec![json!("not-an-id")]).await;
        assert!(response.diagnostics.has_errors());
        assert!(response.result.is_none());
    }

    #[tokio::test]
    async fn test_metadata_lists_functions() {
        let metadata = FunctionServer::new().get_metadata().await;
        assert_eq!(metadata.functions, vec![NORMALISE_RESOURCE_ID.to_string(), PARSE_RESOURCE_ID.to_string()]);
        assert!(metadata.resources.is_empty());
    }
}
