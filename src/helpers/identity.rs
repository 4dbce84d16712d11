//! Managed identity blocks

use crate::resourceids::{ResourceId, UserAssignedIdentityId};
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentityDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// The `identity` payload ARM uses across resource providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_assigned_identities: BTreeMap<String, UserAssignedIdentityDetails>,
}

/// `identity` block accepting only `UserAssigned`
pub fn user_assigned_schema() -> Attribute {
    Attribute::required(ValueType::List).max_items(1).block(
        Schema::new()
            .attr(
                "type",
                Attribute::required(ValueType::String)
                    .validate(validation::string_in_slice(&["UserAssigned"], false)),
            )
            .attr(
                "identity_ids",
                Attribute::required(ValueType::Set)
                    .min_items(1)
                    .elem_type(ValueType::String)
                    .validate(validation::each(validation::resource_id::<UserAssignedIdentityId>())),
            ),
    )
}

pub fn expand_user_assigned(data: &ResourceData) -> Result<Identity> {
    let kind = data.get_string("identity.0.type");
    if kind != "UserAssigned" {
        bail!("expected `identity.0.type` to be \"UserAssigned\", got {kind:?}");
    }

    let mut user_assigned_identities = BTreeMap::new();
    for raw in data.get_string_list("identity.0.identity_ids") {
        let id = UserAssignedIdentityId::parse(&raw)?;
        user_assigned_identities.insert(id.id(), UserAssignedIdentityDetails::default());
    }

    Ok(Identity {
        kind,
        user_assigned_identities,
    })
}

/// Flatten to the `identity` block; identity IDs come back re-cased
pub fn flatten_user_assigned(identity: Option<&Identity>) -> Result<Value> {
    let Some(identity) = identity else {
        return Ok(json!([]));
    };

    let mut identity_ids = Vec::new();
    for raw in identity.user_assigned_identities.keys() {
        let id = UserAssignedIdentityId::parse_insensitively(raw)
            .with_context(|| format!("parsing identity ID {raw:?} returned by the API"))?;
        identity_ids.push(id.id());
    }

    Ok(json!([{ "type": identity.kind, "identity_ids": identity_ids }]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/id1";

    #[test]
    fn test_expand() {
        let data = ResourceData::new(
            json!({ "identity": [{ "type": "UserAssigned", "identity_ids": [IDENTITY] }] })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let identity = expand_user_assigned(&data).unwrap();
        assert_eq!(identity.kind, "UserAssigned");
        assert!(identity.user_assigned_identities.contains_key(IDENTITY));
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({ "type": "UserAssigned", "userAssignedIdentities": { IDENTITY: {} } })
        );
    }

    #[test]
    fn test_flatten_recases_ids() {
        let api: Identity = serde_json::from_value(json!({
            "type": "UserAssigned",
            "userAssignedIdentities": {
                "/subscriptions/sub/resourcegroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/id1": {
                    "principalId": "p", "clientId": "c"
                }
            }
        }))
        .unwrap();
        assert_eq!(
            flatten_user_assigned(Some(&api)).unwrap(),
            json!([{ "type": "UserAssigned", "identity_ids": [IDENTITY] }])
        );
        assert_eq!(flatten_user_assigned(None).unwrap(), json!([]));
    }
}
