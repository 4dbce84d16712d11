//! Protocol Mux
//!
//! Presents several embedded [`ProviderServer`]s as one. The first call that
//! needs routing asks every server for its metadata and builds a routing
//! table from type name to server; later calls are forwarded through that
//! table. A name declared by more than one server is never routed: every
//! call naming it fails with the same error diagnostic.
//!
//! # Example
//!
//! ```ignore
//! use azurerm_provider::mux::MuxServer;
//! use azurerm_provider::provider::{FunctionServer, SdkServer};
//!
//! let mux = MuxServer::new(vec![Arc::new(SdkServer::from_registry()), Arc::new(FunctionServer::new())]);
//! let schema = mux.get_provider_schema().await;
//! ```

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::protocol::*;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Resource,
    DataSource,
    Function,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resource => "resource type",
            Self::DataSource => "data source type",
            Self::Function => "function",
        })
    }
}

#[derive(Debug, Clone)]
enum Route {
    Server(usize),
    Duplicate(Diagnostic),
}

#[derive(Debug, Default)]
struct RoutingTable {
    resources: BTreeMap<String, Route>,
    data_sources: BTreeMap<String, Route>,
    functions: BTreeMap<String, Route>,
    diagnostics: Diagnostics,
}

impl RoutingTable {
    fn build(metadata: &[ServerMetadata]) -> Self {
        let mut table = Self::default();

        for (index, meta) in metadata.iter().enumerate() {
            table.diagnostics.extend(meta.diagnostics.clone());
            for name in &meta.resources {
                table.register(Kind::Resource, name, index);
            }
            for name in &meta.data_sources {
                table.register(Kind::DataSource, name, index);
            }
            for name in &meta.functions {
                table.register(Kind::Function, name, index);
            }
        }

        table
    }

    fn routes(&self, kind: Kind) -> &BTreeMap<String, Route> {
        match kind {
            Kind::Resource => &self.resources,
            Kind::DataSource => &self.data_sources,
            Kind::Function => &self.functions,
        }
    }

    fn register(&mut self, kind: Kind, name: &str, index: usize) {
        let routes = match kind {
            Kind::Resource => &mut self.resources,
            Kind::DataSource => &mut self.data_sources,
            Kind::Function => &mut self.functions,
        };

        let duplicate = match routes.get(name) {
            None => {
                routes.insert(name.to_string(), Route::Server(index));
                return;
            }
            Some(Route::Duplicate(_)) => return,
            Some(Route::Server(first)) => Diagnostic::error(
                format!("Duplicate {kind}"),
                format!(
                    "The {kind} {name:?} is implemented by multiple provider servers ({first} and {index}). \
                     This is a defect in the provider and should be reported to its developers."
                ),
            ),
        };

        tracing::error!("{} {:?} is declared by more than one server", kind, name);
        routes.insert(name.to_string(), Route::Duplicate(duplicate.clone()));
        self.diagnostics.push(duplicate);
    }

    fn route(&self, kind: Kind, name: &str) -> Result<usize, Diagnostic> {
        match self.routes(kind).get(name) {
            Some(Route::Server(index)) => Ok(*index),
            Some(Route::Duplicate(diagnostic)) => Err(diagnostic.clone()),
            None => Err(Diagnostic::error(
                format!("Unknown {kind}"),
                format!("The {kind} {name:?} is not supported by this provider."),
            )),
        }
    }

    fn names(&self, kind: Kind) -> Vec<String> {
        self.routes(kind)
            .iter()
            .filter(|(_, route)| matches!(route, Route::Server(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

enum Discovery {
    Undiscovered,
    Discovered(Arc<RoutingTable>),
}

/// Routes protocol calls to the embedded server that declared the type
pub struct MuxServer {
    servers: Vec<Arc<dyn ProviderServer>>,
    discovery: Mutex<Discovery>,
}

impl MuxServer {
    pub fn new(servers: Vec<Arc<dyn ProviderServer>>) -> Self {
        Self {
            servers,
            discovery: Mutex::new(Discovery::Undiscovered),
        }
    }

    async fn table(&self) -> Arc<RoutingTable> {
        let mut discovery = self.discovery.lock().await;
        if let Discovery::Discovered(table) = &*discovery {
            return table.clone();
        }

        tracing::debug!("Discovering types across {} provider servers", self.servers.len());
        let metadata = join_all(self.servers.iter().map(|s| s.get_metadata())).await;
        let table = Arc::new(RoutingTable::build(&metadata));
        *discovery = Discovery::Discovered(table.clone());
        table
    }

    async fn server_for(&self, kind: Kind, name: &str) -> Result<&Arc<dyn ProviderServer>, Diagnostics> {
        let table = self.table().await;
        match table.route(kind, name) {
            Ok(index) => self
                .servers
                .get(index)
                .ok_or_else(|| Diagnostic::error("Invalid routing", format!("no server at index {index}")).into()),
            Err(diagnostic) => Err(diagnostic.into()),
        }
    }
}

#[async_trait]
impl ProviderServer for MuxServer {
    async fn get_metadata(&self) -> ServerMetadata {
        let table = self.table().await;
        ServerMetadata {
            resources: table.names(Kind::Resource),
            data_sources: table.names(Kind::DataSource),
            functions: table.names(Kind::Function),
            diagnostics: table.diagnostics.clone(),
        }
    }

    async fn get_provider_schema(&self) -> ProviderSchema {
        let table = self.table().await;
        let schemas = join_all(self.servers.iter().map(|s| s.get_provider_schema())).await;

        let mut merged = ProviderSchema {
            diagnostics: table.diagnostics.clone(),
            ..ProviderSchema::default()
        };
        let mut provider_schema: Option<serde_json::Value> = None;

        for (index, schema) in schemas.into_iter().enumerate() {
            merged.diagnostics.extend(schema.diagnostics);

            let rendered = serde_json::to_value(&schema.provider).unwrap_or_default();
            match &provider_schema {
                None => {
                    provider_schema = Some(rendered);
                    merged.provider = schema.provider;
                }
                Some(first) if *first != rendered => merged.diagnostics.push(Diagnostic::error(
                    "Invalid provider server combination",
                    format!("The provider configuration schema of server {index} differs from that of server 0."),
                )),
                Some(_) => {}
            }

            for (name, schema) in schema.resources {
                if matches!(table.route(Kind::Resource, &name), Ok(i) if i == index) {
                    merged.resources.insert(name, schema);
                }
            }
            for (name, schema) in schema.data_sources {
                if matches!(table.route(Kind::DataSource, &name), Ok(i) if i == index) {
                    merged.data_sources.insert(name, schema);
                }
            }
            for (name, signature) in schema.functions {
                if matches!(table.route(Kind::Function, &name), Ok(i) if i == index) {
                    merged.functions.insert(name, signature);
                }
            }
        }

        merged
    }

    async fn configure_provider(&self, request: ConfigureProviderRequest) -> ConfigureProviderResponse {
        let responses = join_all(self.servers.iter().map(|s| s.configure_provider(request.clone()))).await;

        let mut diagnostics = Diagnostics::new();
        for response in responses {
            diagnostics.extend(response.diagnostics);
        }
        ConfigureProviderResponse { diagnostics }
    }

    async fn validate_resource_config(
        &self,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        match self.server_for(Kind::Resource, &request.type_name).await {
            Ok(server) => server.validate_resource_config(request).await,
            Err(diagnostics) => ValidateResourceConfigResponse { diagnostics },
        }
    }

    async fn plan_resource_change(&self, request: PlanResourceChangeRequest) -> PlanResourceChangeResponse {
        match self.server_for(Kind::Resource, &request.type_name).await {
            Ok(server) => server.plan_resource_change(request).await,
            Err(diagnostics) => PlanResourceChangeResponse {
                diagnostics,
                ..Default::default()
            },
        }
    }

    async fn apply_resource_change(&self, request: ApplyResourceChangeRequest) -> ApplyResourceChangeResponse {
        match self.server_for(Kind::Resource, &request.type_name).await {
            Ok(server) => server.apply_resource_change(request).await,
            Err(diagnostics) => ApplyResourceChangeResponse {
                diagnostics,
                ..Default::default()
            },
        }
    }

    async fn read_resource(&self, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.server_for(Kind::Resource, &request.type_name).await {
            Ok(server) => server.read_resource(request).await,
            Err(diagnostics) => ReadResourceResponse {
                diagnostics,
                ..Default::default()
            },
        }
    }

    async fn import_resource_state(&self, request: ImportResourceStateRequest) -> ImportResourceStateResponse {
        match self.server_for(Kind::Resource, &request.type_name).await {
            Ok(server) => server.import_resource_state(request).await,
            Err(diagnostics) => ImportResourceStateResponse {
                diagnostics,
                ..Default::default()
            },
        }
    }

    async fn read_data_source(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.server_for(Kind::DataSource, &request.type_name).await {
            Ok(server) => server.read_data_source(request).await,
            Err(diagnostics) => ReadDataSourceResponse {
                diagnostics,
                ..Default::default()
            },
        }
    }

    async fn call_function(&self, request: CallFunctionRequest) -> CallFunctionResponse {
        match self.server_for(Kind::Function, &request.name).await {
            Ok(server) => server.call_function(request).await,
            Err(diagnostics) => CallFunctionResponse {
                diagnostics,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema, ValueType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers with its own label so tests can see where a call went
    struct StubServer {
        label: &'static str,
        resources: Vec<&'static str>,
        data_sources: Vec<&'static str>,
        provider: Schema,
        metadata_calls: AtomicUsize,
        configure_calls: AtomicUsize,
    }

    impl StubServer {
        fn new(label: &'static str, resources: Vec<&'static str>, data_sources: Vec<&'static str>) -> Self {
            Self {
                label,
                resources,
                data_sources,
                provider: Schema::new().attr("subscription_id", Attribute::optional(ValueType::String)),
                metadata_calls: AtomicUsize::new(0),
                configure_calls: AtomicUsize::new(0),
            }
        }

        fn labelled(&self) -> Diagnostics {
            let mut d = Diagnostics::new();
            d.warning("handled", self.label);
            d
        }
    }

    #[async_trait]
    impl ProviderServer for StubServer {
        async fn get_metadata(&self) -> ServerMetadata {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            ServerMetadata {
                resources: self.resources.iter().map(|s| s.to_string()).collect(),
                data_sources: self.data_sources.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        async fn get_provider_schema(&self) -> ProviderSchema {
            ProviderSchema {
                provider: self.provider.clone(),
                resources: self.resources.iter().map(|s| (s.to_string(), Schema::new())).collect(),
                data_sources: self.data_sources.iter().map(|s| (s.to_string(), Schema::new())).collect(),
                ..Default::default()
            }
        }

        async fn configure_provider(&self, _: ConfigureProviderRequest) -> ConfigureProviderResponse {
            self.configure_calls.fetch_add(1, Ordering::SeqCst);
            ConfigureProviderResponse {
                diagnostics: self.labelled(),
            }
        }

        async fn validate_resource_config(&self, _: ValidateResourceConfigRequest) -> ValidateResourceConfigResponse {
            ValidateResourceConfigResponse {
                diagnostics: self.labelled(),
            }
        }

        async fn plan_resource_change(&self, _: PlanResourceChangeRequest) -> PlanResourceChangeResponse {
            PlanResourceChangeResponse {
                diagnostics: self.labelled(),
                ..Default::default()
            }
        }

        async fn apply_resource_change(&self, _: ApplyResourceChangeRequest) -> ApplyResourceChangeResponse {
            ApplyResourceChangeResponse {
                diagnostics: self.labelled(),
                ..Default::default()
            }
        }

        async fn read_resource(&self, _: ReadResourceRequest) -> ReadResourceResponse {
            ReadResourceResponse {
                diagnostics: self.labelled(),
                ..Default::default()
            }
        }

        async fn import_resource_state(&self, _: ImportResourceStateRequest) -> ImportResourceStateResponse {
            ImportResourceStateResponse {
                diagnostics: self.labelled(),
                ..Default::default()
            }
        }

        async fn read_data_source(&self, _: ReadDataSourceRequest) -> ReadDataSourceResponse {
            ReadDataSourceResponse {
                diagnostics: self.labelled(),
                ..Default::default()
            }
        }

        async fn call_function(&self, _: CallFunctionRequest) -> CallFunctionResponse {
            CallFunctionResponse {
                diagnostics: self.labelled(),
                ..Default::default()
            }
        }
    }

    fn handled_by(diagnostics: &Diagnostics) -> Option<String> {
        diagnostics
            .iter()
            .find(|d| d.summary == "handled")
            .map(|d| d.detail.clone())
    }

    #[tokio::test]
    async fn test_routes_by_type_name() {
        let mux = MuxServer::new(vec![
            Arc::new(StubServer::new("a", vec!["azurerm_one"], vec![])),
            Arc::new(StubServer::new("b", vec!["azurerm_two"], vec!["azurerm_two"])),
        ]);

        let response = mux
            .read_resource(ReadResourceRequest {
                type_name: "azurerm_two".to_string(),
                ..Default::default()
            })
            .await;
        assert_eq!(handled_by(&response.diagnostics).as_deref(), Some("b"));

        let response = mux
            .read_data_source(ReadDataSourceRequest {
                type_name: "azurerm_two".to_string(),
                ..Default::default()
            })
            .await;
        assert_eq!(handled_by(&response.diagnostics).as_deref(), Some("b"));

        let response = mux
            .validate_resource_config(ValidateResourceConfigRequest {
                type_name: "azurerm_one".to_string(),
                ..Default::default()
            })
            .await;
        assert_eq!(handled_by(&response.diagnostics).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_duplicate_type_is_an_error() {
        let mux = MuxServer::new(vec![
            Arc::new(StubServer::new("a", vec!["azurerm_shared", "azurerm_one"], vec![])),
            Arc::new(StubServer::new("b", vec!["azurerm_shared"], vec![])),
        ]);

        let metadata = mux.get_metadata().await;
        assert!(metadata.diagnostics.has_errors());
        assert_eq!(metadata.resources, vec!["azurerm_one".to_string()]);

        let response = mux
            .apply_resource_change(ApplyResourceChangeRequest {
                type_name: "azurerm_shared".to_string(),
                ..Default::default()
            })
            .await;
        assert!(response.diagnostics.has_errors());
        assert!(handled_by(&response.diagnostics).is_none());
        let summary = &response.diagnostics.iter().next().unwrap().summary;
        assert_eq!(summary, "Duplicate resource type");

        let schema = mux.get_provider_schema().await;
        assert!(schema.diagnostics.has_errors());
        assert!(!schema.resources.contains_key("azurerm_shared"));
    }

    #[tokio::test]
    async fn test_unknown_type_is_an_error() {
        let mux = MuxServer::new(vec![Arc::new(StubServer::new("a", vec!["azurerm_one"], vec![]))]);
        let response = mux
            .call_function(CallFunctionRequest {
                name: "nope".to_string(),
                ..Default::default()
            })
            .await;
        assert!(response.diagnostics.has_errors());
        assert_eq!(response.diagnostics.iter().next().unwrap().summary, "Unknown function");
    }

    #[tokio::test]
    async fn test_discovery_runs_once() {
        let a = Arc::new(StubServer::new("a", vec!["azurerm_one"], vec![]));
        let mux = MuxServer::new(vec![a.clone()]);

        for _ in 0..3 {
            mux.plan_resource_change(PlanResourceChangeRequest {
                type_name: "azurerm_one".to_string(),
                ..Default::default()
            })
            .await;
        }
        assert_eq!(a.metadata_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configure_fans_out() {
        let a = Arc::new(StubServer::new("a", vec!["azurerm_one"], vec![]));
        let b = Arc::new(StubServer::new("b", vec!["azurerm_two"], vec![]));
        let mux = MuxServer::new(vec![a.clone(), b.clone()]);

        let response = mux.configure_provider(ConfigureProviderRequest::default()).await;
        assert_eq!(response.diagnostics.len(), 2);
        assert_eq!(a.configure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.configure_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_schema_merge_detects_mismatched_provider_schema() {
        let mut b = StubServer::new("b", vec!["azurerm_two"], vec![]);
        b.provider = Schema::new();
        let mux = MuxServer::new(vec![
            Arc::new(StubServer::new("a", vec!["azurerm_one"], vec![])),
            Arc::new(b),
        ]);

        let schema = mux.get_provider_schema().await;
        assert_eq!(schema.resources.len(), 2);
        assert!(schema
            .diagnostics
            .iter()
            .any(|d| d.summary == "Invalid provider server combination"));
    }
}
