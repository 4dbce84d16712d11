//! Location attributes

use crate::schema::{validation, Attribute, ValueType};
use serde_json::Value;
use std::sync::Arc;

/// Canonical form of an Azure region: `West Europe` becomes `westeurope`
pub fn normalize(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

fn normalize_value(value: &Value) -> Value {
    match value.as_str() {
        Some(location) => Value::String(normalize(location)),
        None => value.clone(),
    }
}

/// Required, force-new region; stored in its canonical form so `West Europe`
/// and `westeurope` plan as the same value
pub fn schema() -> Attribute {
    Attribute::required(ValueType::String)
        .force_new()
        .validate(validation::string_is_not_empty())
        .state_func(Arc::new(normalize_value))
}

pub fn schema_computed() -> Attribute {
    Attribute::computed(ValueType::String)
}

pub fn resource_group_name_schema() -> Attribute {
    Attribute::required(ValueType::String).force_new().validate(validation::string_matches(
        r"^[-\w._()]{1,90}$",
        "may only contain alphanumeric characters, dash, underscores, parentheses and periods",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("West Europe"), "westeurope");
        assert_eq!(normalize("eastus2"), "eastus2");
    }

    #[test]
    fn test_display_name_is_not_a_replacement() {
        let schema = crate::schema::Schema::new().attr("location", schema());
        let prior = json!({ "location": "westeurope" });
        let planned = json!({ "location": "West Europe" });
        assert!(schema
            .requires_replace(prior.as_object().unwrap(), planned.as_object().unwrap())
            .is_empty());

        let moved = json!({ "location": "North Europe" });
        assert_eq!(
            schema.requires_replace(prior.as_object().unwrap(), moved.as_object().unwrap()),
            vec!["location"]
        );
    }

    #[test]
    fn test_resource_group_name() {
        let attribute = resource_group_name_schema();
        let check = &attribute.validators[0];
        assert!(check(&json!("my-rg_1.(x)"), "resource_group_name").is_empty());
        assert!(!check(&json!("bad/name"), "resource_group_name").is_empty());
    }
}
