use super::client::EdgeModulesClient;
use super::ids::EdgeModuleId;
use crate::helpers::location;
use crate::provider::{ensure_not_exists, ProviderContext, Resource};
use crate::resourceids::ResourceId;
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Edge modules carry no settings of their own; every attribute forces a new resource
pub struct VideoAnalyzerEdgeModuleResource;

#[async_trait]
impl Resource for VideoAnalyzerEdgeModuleResource {
    fn type_name(&self) -> &'static str {
        "azurerm_video_analyzer_edge_module"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).force_new().validate(validation::string_matches(
                    "^[-a-zA-Z0-9]{1,32}$",
                    "must be between 1 and 32 characters and contain only letters, numbers and hyphens",
                )),
            )
            .attr("resource_group_name", location::resource_group_name_schema())
            .attr(
                "video_analyzer_name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        EdgeModuleId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = EdgeModulesClient::new(&ctx.client);
        let id = EdgeModuleId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("video_analyzer_name")?,
            data.require_str("name")?,
        );

        ensure_not_exists(self.type_name(), &id.id(), client.get(&id).await)?;

        client
            .create_or_update(&id)
            .await
            .with_context(|| format!("creating {id}"))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = EdgeModulesClient::new(&ctx.client);
        let id = EdgeModuleId::parse(data.id())?;

        if let Err(err) = client.get(&id).await {
            if err.was_not_found() {
                tracing::debug!("{} was not found - removing from state", id);
                data.set_id("");
                return Ok(());
            }
            return Err(anyhow::Error::new(err).context(format!("retrieving {id}")));
        }

        data.set("name", &id.edge_module_name)?;
        data.set("resource_group_name", &id.resource_group_name)?;
        data.set("video_analyzer_name", &id.video_analyzer_name)?;
        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = EdgeModulesClient::new(&ctx.client);
        let id = EdgeModuleId::parse(data.id())?;

        client
            .delete(&id)
            .await
            .with_context(|| format!("deleting {id}"))
    }
}
