//! Plugin protocol surface
//!
//! [`ProviderServer`] is the RPC interface the infrastructure-as-code host
//! speaks to a provider. Requests and responses are plain structs; every
//! response carries [`Diagnostics`] instead of failing, so a server never
//! panics or errors across this boundary.

use crate::diagnostics::Diagnostics;
use crate::schema::{Schema, ValueType};
use crate::state::StateMap;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Type names a server implements
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerMetadata {
    pub resources: Vec<String>,
    pub data_sources: Vec<String>,
    pub functions: Vec<String>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSignature {
    pub summary: String,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: ValueType,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<String, Schema>,
    pub data_sources: BTreeMap<String, Schema>,
    pub functions: BTreeMap<String, FunctionSignature>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigureProviderRequest {
    pub config: StateMap,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigureProviderResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: StateMap,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateResourceConfigResponse {
    pub diagnostics: Diagnostics,
}

/// `prior_state: None` plans a create, `proposed_new_state: None` a destroy
#[derive(Debug, Clone, Default)]
pub struct PlanResourceChangeRequest {
    pub type_name: String,
    pub prior_state: Option<StateMap>,
    pub proposed_new_state: Option<StateMap>,
}

#[derive(Debug, Clone, Default)]
pub struct PlanResourceChangeResponse {
    pub planned_state: Option<StateMap>,
    /// Attribute paths whose change forces the resource to be replaced
    pub requires_replace: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// `prior_state: None` creates, `planned_state: None` deletes, both set updates
#[derive(Debug, Clone, Default)]
pub struct ApplyResourceChangeRequest {
    pub type_name: String,
    pub prior_state: Option<StateMap>,
    pub planned_state: Option<StateMap>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyResourceChangeResponse {
    pub new_state: Option<StateMap>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: StateMap,
}

/// `new_state: None` means the resource is gone and must leave state
#[derive(Debug, Clone, Default)]
pub struct ReadResourceResponse {
    pub new_state: Option<StateMap>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ImportedResource {
    pub type_name: String,
    pub state: StateMap,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResourceStateResponse {
    pub imported: Vec<ImportedResource>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: StateMap,
}

#[derive(Debug, Clone, Default)]
pub struct ReadDataSourceResponse {
    pub state: Option<StateMap>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct CallFunctionRequest {
    pub name: String,
    pub arguments: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct CallFunctionResponse {
    pub result: Option<Value>,
    pub diagnostics: Diagnostics,
}

/// Implemented by each embedded provider server and by the mux in front of them
#[async_trait]
pub trait ProviderServer: Send + Sync {
    async fn get_metadata(&self) -> ServerMetadata;

    async fn get_provider_schema(&self) -> ProviderSchema;

    async fn configure_provider(&self, request: ConfigureProviderRequest) -> ConfigureProviderResponse;

    async fn validate_resource_config(
        &self,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    async fn plan_resource_change(&self, request: PlanResourceChangeRequest) -> PlanResourceChangeResponse;

    async fn apply_resource_change(&self, request: ApplyResourceChangeRequest) -> ApplyResourceChangeResponse;

    async fn read_resource(&self, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn import_resource_state(&self, request: ImportResourceStateRequest) -> ImportResourceStateResponse;

    async fn read_data_source(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse;

    async fn call_function(&self, request: CallFunctionRequest) -> CallFunctionResponse;
}
