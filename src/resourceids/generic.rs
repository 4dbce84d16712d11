//! Parsing and re-casing of arbitrary ARM resource IDs

use super::{format_segments, IdTemplate, Parser};
use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Components of an arbitrary ARM resource ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericResourceId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub resource_provider: String,
    pub resource_type: String,
    pub resource_name: String,
    pub full_resource_type: String,
    pub parent_resources: BTreeMap<String, String>,
}

/// Split an ARM ID of the shape
/// `/subscriptions/{sub}[/resourceGroups/{rg}]/providers/{ns}/{type}/{name}[/{type}/{name}...]`
pub fn parse_generic(input: &str) -> Result<GenericResourceId> {
    let Some(path) = input.strip_prefix('/') else {
        bail!("parsing {input:?}: a resource ID must begin with `/`");
    };
    let components: Vec<&str> = path.split('/').collect();
    if components.iter().any(|c| c.is_empty()) {
        bail!("parsing {input:?}: a resource ID cannot contain empty segments");
    }

    let mut rest = components.as_slice();

    let subscription_id = match rest {
        [key, value, tail @ ..] if key.eq_ignore_ascii_case("subscriptions") => {
            rest = tail;
            value.to_string()
        }
        _ => bail!("parsing {input:?}: expected the ID to begin with `/subscriptions/{{subscriptionId}}`"),
    };

    let mut resource_group_name = String::new();
    if let [key, value, tail @ ..] = rest {
        if key.eq_ignore_ascii_case("resourceGroups") {
            resource_group_name = value.to_string();
            rest = tail;
        }
    }

    let resource_provider = match rest {
        [key, namespace, tail @ ..] if key.eq_ignore_ascii_case("providers") => {
            rest = tail;
            namespace.to_string()
        }
        _ => bail!("parsing {input:?}: expected a `providers/{{namespace}}` segment"),
    };

    if rest.is_empty() || rest.len() % 2 != 0 {
        bail!("parsing {input:?}: expected resource type and name pairs after the provider namespace");
    }

    let pairs: Vec<(&str, &str)> = rest.chunks(2).map(|pair| (pair[0], pair[1])).collect();
    let mut parent_resources = BTreeMap::new();
    let mut types = Vec::with_capacity(pairs.len());
    for (resource_type, name) in &pairs[..pairs.len() - 1] {
        parent_resources.insert(resource_type.to_string(), name.to_string());
        types.push(*resource_type);
    }

    let (resource_type, resource_name) = pairs[pairs.len() - 1];
    types.push(resource_type);

    Ok(GenericResourceId {
        subscription_id,
        resource_group_name,
        full_resource_type: format!("{}/{}", resource_provider, types.join("/")),
        resource_provider,
        resource_type: resource_type.to_string(),
        resource_name: resource_name.to_string(),
        parent_resources,
    })
}

/// Re-case the static segments of `input`.
///
/// Known templates are tried first (case-insensitively); an ID matching none
/// of them only has its `subscriptions`, `resourceGroups` and `providers` keys
/// re-cased.
pub fn normalise_resource_id(input: &str, templates: &[IdTemplate]) -> String {
    for template in templates {
        let parser = Parser::new(template.id_type, template.segments);
        if let Ok(result) = parser.parse(input, true) {
            if let Ok(values) = result.user_values(template.segments) {
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                tracing::debug!("normalised {} using the {} template", input, template.id_type);
                return format_segments(template.segments, &values);
            }
        }
    }

    let components: Vec<String> = input
        .split('/')
        .enumerate()
        .map(|(i, component)| {
            // keys sit at the odd positions once the leading empty component is counted
            if i % 2 == 1 {
                for known in ["subscriptions", "resourceGroups", "providers"] {
                    if component.eq_ignore_ascii_case(known) {
                        return known.to_string();
                    }
                }
            }
            component.to_string()
        })
        .collect();
    components.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::{ResourceGroupId, SubnetId};

    #[test]
    fn test_parse_generic_nested() {
        let id = parse_generic(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default",
        )
        .unwrap();
        assert_eq!(id.subscription_id, "sub");
        assert_eq!(id.resource_group_name, "rg");
        assert_eq!(id.resource_provider, "Microsoft.Network");
        assert_eq!(id.resource_type, "subnets");
        assert_eq!(id.resource_name, "default");
        assert_eq!(id.full_resource_type, "Microsoft.Network/virtualNetworks/subnets");
        assert_eq!(id.parent_resources.get("virtualNetworks").map(String::as_str), Some("vnet"));
    }

    #[test]
    fn test_parse_generic_subscription_scoped() {
        let id = parse_generic("/subscriptions/sub/providers/Microsoft.Security/automations/auto").unwrap();
        assert_eq!(id.resource_group_name, "");
        assert_eq!(id.full_resource_type, "Microsoft.Security/automations");
    }

    #[test]
    fn test_parse_generic_rejects_malformed() {
        assert!(parse_generic("subscriptions/sub").is_err());
        assert!(parse_generic("/subscriptions/sub/resourceGroups/rg").is_err());
        assert!(parse_generic("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks").is_err());
        assert!(parse_generic("/subscriptions//resourceGroups/rg").is_err());
    }

    #[test]
    fn test_normalise_known_template() {
        let templates = [IdTemplate::of::<SubnetId>(), IdTemplate::of::<ResourceGroupId>()];
        let out = normalise_resource_id(
            "/SUBSCRIPTIONS/sub/resourcegroups/RG/providers/microsoft.network/VIRTUALNETWORKS/vnet/Subnets/default",
            &templates,
        );
        assert_eq!(
            out,
            "/subscriptions/sub/resourceGroups/RG/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default"
        );
    }

    #[test]
    fn test_normalise_unknown_template() {
        let out = normalise_resource_id(
            "/SUBSCRIPTIONS/sub/RESOURCEGROUPS/rg/PROVIDERS/Microsoft.Foo/bars/baz",
            &[],
        );
        assert_eq!(out, "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Foo/bars/baz");
    }
}
