use super::client::{
    ResourceIdentity, StorageAccount, VideoAnalyzer, VideoAnalyzerProperties, VideoAnalyzerUpdate,
    VideoAnalyzersClient,
};
use super::ids::VideoAnalyzerId;
use crate::helpers::{identity, location, tags};
use crate::provider::{ensure_not_exists, ProviderContext, Resource};
use crate::resourceids::{ResourceId, StorageAccountId, UserAssignedIdentityId};
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct VideoAnalyzerResource;

fn expand_storage_accounts(data: &ResourceData) -> Vec<StorageAccount> {
    data.get_list("storage_account")
        .iter()
        .map(|account| StorageAccount {
            id: account
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            identity: account
                .get("user_assigned_identity_id")
                .and_then(Value::as_str)
                .map(|id| ResourceIdentity {
                    user_assigned_identity: id.to_string(),
                }),
        })
        .collect()
}

fn flatten_storage_accounts(accounts: &[StorageAccount]) -> Result<Value> {
    let mut out = Vec::new();
    for account in accounts {
        let id = StorageAccountId::parse_insensitively(&account.id)
            .with_context(|| format!("parsing storage account ID {:?}", account.id))?;
        let identity_id = match &account.identity {
            Some(identity) => UserAssignedIdentityId::parse_insensitively(&identity.user_assigned_identity)?.id(),
            None => String::new(),
        };
        out.push(json!({ "id": id.id(), "user_assigned_identity_id": identity_id }));
    }
    Ok(Value::Array(out))
}

#[async_trait]
impl Resource for VideoAnalyzerResource {
    fn type_name(&self) -> &'static str {
        "azurerm_video_analyzer"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).force_new().validate(validation::string_matches(
                    "^[-a-z0-9]{3,24}$",
                    "must be between 3 and 24 characters and contain only lowercase letters, numbers and hyphens",
                )),
            )
            .attr("location", location::schema())
            .attr("resource_group_name", location::resource_group_name_schema())
            .attr(
                "storage_account",
                Attribute::required(ValueType::List).max_items(1).block(
                    Schema::new()
                        .attr(
                            "id",
                            Attribute::required(ValueType::String)
                                .validate(validation::resource_id::<StorageAccountId>()),
                        )
                        .attr(
                            "user_assigned_identity_id",
                            Attribute::required(ValueType::String)
                                .validate(validation::resource_id::<UserAssignedIdentityId>()),
                        ),
                ),
            )
            .attr("identity", identity::user_assigned_schema())
            .attr("tags", tags::schema())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        VideoAnalyzerId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = VideoAnalyzersClient::new(&ctx.client);
        let id = VideoAnalyzerId::new(
            ctx.subscription_id(),
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );

        ensure_not_exists(self.type_name(), &id.id(), client.get(&id).await)?;

        let analyzer = VideoAnalyzer {
            location: location::normalize(data.require_str("location")?),
            identity: Some(identity::expand_user_assigned(data)?),
            tags: Some(tags::expand(data)),
            properties: Some(VideoAnalyzerProperties {
                storage_accounts: expand_storage_accounts(data),
            }),
            ..Default::default()
        };

        client
            .create_or_update(&id, &analyzer)
            .await
            .with_context(|| format!("creating {id}"))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = VideoAnalyzersClient::new(&ctx.client);
        let id = VideoAnalyzerId::parse(data.id())?;

        let analyzer = match client.get(&id).await {
            Ok(analyzer) => analyzer,
            Err(err) if err.was_not_found() => {
                tracing::debug!("{} was not found - removing from state", id);
                data.set_id("");
                return Ok(());
            }
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {id}"))),
        };

        data.set("name", &id.video_analyzer_name)?;
        data.set("resource_group_name", &id.resource_group_name)?;
        data.set("location", location::normalize(&analyzer.location))?;

        let storage_accounts = analyzer
            .properties
            .map(|p| p.storage_accounts)
            .unwrap_or_default();
        data.set("storage_account", flatten_storage_accounts(&storage_accounts)?)?;
        data.set("identity", identity::flatten_user_assigned(analyzer.identity.as_ref())?)?;
        data.set("tags", tags::flatten(analyzer.tags.as_ref()))?;

        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = VideoAnalyzersClient::new(&ctx.client);
        let id = VideoAnalyzerId::parse(data.id())?;

        let mut update = VideoAnalyzerUpdate::default();
        if data.has_change("storage_account") {
            update.properties = Some(VideoAnalyzerProperties {
                storage_accounts: expand_storage_accounts(data),
            });
        }
        if data.has_change("identity") {
            update.identity = Some(identity::expand_user_assigned(data)?);
        }
        if data.has_change("tags") {
            update.tags = Some(tags::expand(data));
        }

        client
            .update(&id, &update)
            .await
            .with_context(|| format!("updating {id}"))
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = VideoAnalyzersClient::new(&ctx.client);
        let id = VideoAnalyzerId::parse(data.id())?;

        client
            .delete(&id)
            .await
            .with_context(|| format!("deleting {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORAGE: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa";
    const IDENTITY: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/id1";

    #[test]
    fn test_expand_storage_accounts() {
        let data = ResourceData::new(
            json!({ "storage_account": [{ "id": STORAGE, "user_assigned_identity_id": IDENTITY }] })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let accounts = expand_storage_accounts(&data);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, STORAGE);
        assert_eq!(accounts[0].identity.as_ref().unwrap().user_assigned_identity, IDENTITY);
    }

    #[test]
    fn test_flatten_storage_accounts_recases_ids() {
        let accounts = vec![StorageAccount {
            id: STORAGE.replace("resourceGroups", "resourcegroups"),
            identity: Some(ResourceIdentity {
                user_assigned_identity: IDENTITY.to_string(),
            }),
        }];
        assert_eq!(
            flatten_storage_accounts(&accounts).unwrap(),
            json!([{ "id": STORAGE, "user_assigned_identity_id": IDENTITY }])
        );
    }
}
