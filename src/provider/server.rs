//! Typed resource and data source server
//!
//! Serves every registered resource and data source over the
//! [`ProviderServer`] protocol: validation against the declared schema,
//! planning with defaults and replacement detection, and CRUD under
//! per-operation deadlines.

use super::registry::{self, ServiceRegistration};
use super::resource::{with_timeout, DataSource, Operation, Resource};
use super::ProviderContext;
use crate::config::{provider_schema, ProviderConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::protocol::*;
use crate::schema::Schema;
use crate::state::{ResourceData, StateMap};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SdkServer {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
    context: RwLock<Option<Arc<ProviderContext>>>,
}

/// Full schema of a resource: its own attributes plus `id` and `timeouts`
fn resource_schema(resource: &dyn Resource) -> Schema {
    resource.schema().with_id().with_timeouts()
}

fn data_source_schema(data_source: &dyn DataSource) -> Schema {
    data_source.schema().with_id().with_timeouts()
}

fn unknown(kind: &str, name: &str) -> Diagnostics {
    Diagnostic::error(
        format!("Unknown {kind}"),
        format!("The {kind} {name:?} is not served by this server."),
    )
    .into()
}

impl SdkServer {
    pub fn new(registrations: &[ServiceRegistration]) -> Self {
        let mut resources = BTreeMap::new();
        let mut data_sources = BTreeMap::new();

        for registration in registrations {
            tracing::debug!("Registering service {}", registration.name);
            for resource in &registration.resources {
                resources.insert(resource.type_name(), resource.clone());
            }
            for data_source in &registration.data_sources {
                data_sources.insert(data_source.type_name(), data_source.clone());
            }
        }

        Self {
            resources,
            data_sources,
            context: RwLock::new(None),
        }
    }

    /// Server over every registered service
    pub fn from_registry() -> Self {
        Self::new(registry::registrations())
    }

    /// Use an existing context instead of waiting for `configure_provider`
    pub fn with_context(self, context: ProviderContext) -> Self {
        Self {
            context: RwLock::new(Some(Arc::new(context))),
            ..self
        }
    }

    async fn context(&self) -> Result<Arc<ProviderContext>> {
        self.context
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("the provider has not been configured"))
    }

    async fn create(&self, resource: &dyn Resource, planned: StateMap) -> ApplyResourceChangeResponse {
        let mut data = ResourceData::new(planned);
        let mut diagnostics = Diagnostics::new();

        let result = async {
            let ctx = self.context().await?;
            let timeouts = resource.timeouts().with_overrides(&data)?;
            with_timeout(Operation::Create, &timeouts, resource.create(&ctx, &mut data)).await?;
            with_timeout(Operation::Read, &timeouts, resource.read(&ctx, &mut data)).await
        }
        .await;

        if let Err(err) = result {
            diagnostics.extend(Diagnostics::from_error(format!("Creating {}", resource.type_name()), &err));
            // keep whatever was created so it can be cleaned up later
            let new_state = (!data.is_gone()).then(|| data.into_state());
            return ApplyResourceChangeResponse { new_state, diagnostics };
        }

        if data.is_gone() {
            diagnostics.error(
                format!("Creating {}", resource.type_name()),
                "the resource could not be found after it was created",
            );
            return ApplyResourceChangeResponse {
                new_state: None,
                diagnostics,
            };
        }

        ApplyResourceChangeResponse {
            new_state: Some(data.into_state()),
            diagnostics,
        }
    }

    async fn update(&self, resource: &dyn Resource, prior: StateMap, planned: StateMap) -> ApplyResourceChangeResponse {
        let fallback = prior.clone();
        let mut data = ResourceData::with_prior(planned, prior);

        let result = async {
            let ctx = self.context().await?;
            let timeouts = resource.timeouts().with_overrides(&data)?;
            with_timeout(Operation::Update, &timeouts, resource.update(&ctx, &mut data)).await?;
            with_timeout(Operation::Read, &timeouts, resource.read(&ctx, &mut data)).await
        }
        .await;

        match result {
            Ok(()) if data.is_gone() => ApplyResourceChangeResponse {
                new_state: None,
                diagnostics: Diagnostic::error(
                    format!("Updating {}", resource.type_name()),
                    "the resource could not be found after it was updated",
                )
                .into(),
            },
            Ok(()) => ApplyResourceChangeResponse {
                new_state: Some(data.into_state()),
                diagnostics: Diagnostics::new(),
            },
            Err(err) => ApplyResourceChangeResponse {
                new_state: Some(fallback),
                diagnostics: Diagnostics::from_error(format!("Updating {}", resource.type_name()), &err),
            },
        }
    }

    async fn delete(&self, resource: &dyn Resource, prior: StateMap) -> ApplyResourceChangeResponse {
        let data = ResourceData::new(prior.clone());

        let result = async {
            let ctx = self.context().await?;
            let timeouts = resource.timeouts().with_overrides(&data)?;
            with_timeout(Operation::Delete, &timeouts, resource.delete(&ctx, &data)).await
        }
        .await;

        match result {
            Ok(()) => ApplyResourceChangeResponse::default(),
            Err(err) => ApplyResourceChangeResponse {
                new_state: Some(prior),
                diagnostics: Diagnostics::from_error(format!("Deleting {}", resource.type_name()), &err),
            },
        }
    }
}

#[async_trait]
impl ProviderServer for SdkServer {
    async fn get_metadata(&self) -> ServerMetadata {
        ServerMetadata {
            resources: self.resources.keys().map(|s| s.to_string()).collect(),
            data_sources: self.data_sources.keys().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    async fn get_provider_schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: provider_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (name.to_string(), resource_schema(r.as_ref())))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (name.to_string(), data_source_schema(d.as_ref())))
                .collect(),
            ..Default::default()
        }
    }

    async fn configure_provider(&self, request: ConfigureProviderRequest) -> ConfigureProviderResponse {
        let diagnostics = provider_schema().validate(&request.config);
        if diagnostics.has_errors() {
            return ConfigureProviderResponse { diagnostics };
        }

        let configured = ProviderConfig::from_values(&request.config)
            .and_then(|config| Ok(ProviderContext::new(config.client()?, config.features)));

        match configured {
            Ok(context) => {
                tracing::info!("Provider configured for subscription {}", context.subscription_id());
                *self.context.write().await = Some(Arc::new(context));
                ConfigureProviderResponse { diagnostics }
            }
            Err(err) => ConfigureProviderResponse {
                diagnostics: Diagnostics::from_error("Configuring the provider", &err),
            },
        }
    }

    async fn validate_resource_config(
        &self,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let Some(resource) = self.resources.get(request.type_name.as_str()) else {
            return ValidateResourceConfigResponse {
                diagnostics: unknown("resource type", &request.type_name),
            };
        };

        ValidateResourceConfigResponse {
            diagnostics: resource_schema(resource.as_ref()).validate(&request.config),
        }
    }

    async fn plan_resource_change(&self, request: PlanResourceChangeRequest) -> PlanResourceChangeResponse {
        let Some(resource) = self.resources.get(request.type_name.as_str()) else {
            return PlanResourceChangeResponse {
                diagnostics: unknown("resource type", &request.type_name),
                ..Default::default()
            };
        };

        let Some(mut planned) = request.proposed_new_state else {
            return PlanResourceChangeResponse::default();
        };

        let schema = resource_schema(resource.as_ref());
        schema.apply_defaults(&mut planned);
        schema.apply_state_funcs(&mut planned);

        let requires_replace = match &request.prior_state {
            Some(prior) => {
                // computed values the config leaves unset keep their prior value
                for (name, attribute) in &schema.attributes {
                    let unset = matches!(planned.get(name), None | Some(Value::Null));
                    if attribute.computed && unset {
                        if let Some(value) = prior.get(name) {
                            planned.insert(name.clone(), value.clone());
                        }
                    }
                }
                schema.requires_replace(prior, &planned)
            }
            None => Vec::new(),
        };

        PlanResourceChangeResponse {
            planned_state: Some(planned),
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn apply_resource_change(&self, request: ApplyResourceChangeRequest) -> ApplyResourceChangeResponse {
        let Some(resource) = self.resources.get(request.type_name.as_str()) else {
            return ApplyResourceChangeResponse {
                diagnostics: unknown("resource type", &request.type_name),
                ..Default::default()
            };
        };
        let resource = resource.as_ref();

        match (request.prior_state, request.planned_state) {
            (None, Some(planned)) => self.create(resource, planned).await,
            (Some(prior), Some(planned)) => self.update(resource, prior, planned).await,
            (Some(prior), None) => self.delete(resource, prior).await,
            (None, None) => ApplyResourceChangeResponse {
                diagnostics: Diagnostic::error(
                    "Invalid change",
                    "neither a prior nor a planned state was provided",
                )
                .into(),
                ..Default::default()
            },
        }
    }

    async fn read_resource(&self, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(resource) = self.resources.get(request.type_name.as_str()) else {
            return ReadResourceResponse {
                diagnostics: unknown("resource type", &request.type_name),
                ..Default::default()
            };
        };

        let current = request.current_state.clone();
        let mut data = ResourceData::new(request.current_state);

        let result = async {
            let ctx = self.context().await?;
            let timeouts = resource.timeouts().with_overrides(&data)?;
            with_timeout(Operation::Read, &timeouts, resource.read(&ctx, &mut data)).await
        }
        .await;

        match result {
            Ok(()) if data.is_gone() => ReadResourceResponse::default(),
            Ok(()) => ReadResourceResponse {
                new_state: Some(data.into_state()),
                diagnostics: Diagnostics::new(),
            },
            Err(err) => ReadResourceResponse {
                new_state: Some(current),
                diagnostics: Diagnostics::from_error(format!("Reading {}", resource.type_name()), &err),
            },
        }
    }

    async fn import_resource_state(&self, request: ImportResourceStateRequest) -> ImportResourceStateResponse {
        let Some(resource) = self.resources.get(request.type_name.as_str()) else {
            return ImportResourceStateResponse {
                diagnostics: unknown("resource type", &request.type_name),
                ..Default::default()
            };
        };

        if let Err(err) = resource.validate_import_id(&request.id) {
            return ImportResourceStateResponse {
                diagnostics: Diagnostics::from_error(format!("Importing {}", resource.type_name()), &err),
                ..Default::default()
            };
        }

        ImportResourceStateResponse {
            imported: vec![ImportedResource {
                type_name: request.type_name,
                state: ResourceData::from_id(request.id).into_state(),
            }],
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read_data_source(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(data_source) = self.data_sources.get(request.type_name.as_str()) else {
            return ReadDataSourceResponse {
                diagnostics: unknown("data source type", &request.type_name),
                ..Default::default()
            };
        };

        let schema = data_source_schema(data_source.as_ref());
        let diagnostics = schema.validate(&request.config);
        if diagnostics.has_errors() {
            return ReadDataSourceResponse {
                state: None,
                diagnostics,
            };
        }

        let mut config = request.config;
        schema.apply_defaults(&mut config);
        let mut data = ResourceData::new(config);

        let result = async {
            let ctx = self.context().await?;
            let timeouts = data_source.timeouts().with_overrides(&data)?;
            with_timeout(Operation::Read, &timeouts, data_source.read(&ctx, &mut data)).await
        }
        .await;

        match result {
            Ok(()) => ReadDataSourceResponse {
                state: Some(data.into_state()),
                diagnostics,
            },
            Err(err) => ReadDataSourceResponse {
                state: None,
                diagnostics: Diagnostics::from_error(format!("Reading {}", data_source.type_name()), &err),
            },
        }
    }

    async fn call_function(&self, request: CallFunctionRequest) -> CallFunctionResponse {
        CallFunctionResponse {
            result: None,
            diagnostics: unknown("function", &request.name),
        }
    }
}
