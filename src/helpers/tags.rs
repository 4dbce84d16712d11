//! Tags attributes

use crate::schema::{Attribute, ValueType, ValidateFunc};
use crate::state::ResourceData;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_TAGS: usize = 50;
const MAX_KEY_LENGTH: usize = 512;
const MAX_VALUE_LENGTH: usize = 256;

fn validate() -> ValidateFunc {
    Arc::new(|value: &Value, key: &str| {
        let Some(tags) = value.as_object() else {
            return vec![format!("expected {key:?} to be a map")];
        };

        let mut errors = Vec::new();
        if tags.len() > MAX_TAGS {
            errors.push(format!("a maximum of {MAX_TAGS} tags can be applied to each ARM resource"));
        }
        for (k, v) in tags {
            if k.len() > MAX_KEY_LENGTH {
                errors.push(format!("the maximum length for a tag key is {MAX_KEY_LENGTH} characters: {k:?}"));
            }
            if v.as_str().is_some_and(|v| v.len() > MAX_VALUE_LENGTH) {
                errors.push(format!(
                    "the maximum length for a tag value is {MAX_VALUE_LENGTH} characters: {k:?}"
                ));
            }
        }
        errors
    })
}

pub fn schema() -> Attribute {
    Attribute::optional(ValueType::Map)
        .elem_type(ValueType::String)
        .validate(validate())
}

pub fn schema_computed() -> Attribute {
    Attribute::computed(ValueType::Map).elem_type(ValueType::String)
}

pub fn expand(data: &ResourceData) -> BTreeMap<String, String> {
    data.get_string_map("tags").into_iter().collect()
}

pub fn flatten(tags: Option<&BTreeMap<String, String>>) -> Value {
    let map: Map<String, Value> = tags
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_limits() {
        let attribute = schema();
        let check = &attribute.validators[0];
        assert!(check(&json!({ "env": "prod" }), "tags").is_empty());

        let long_value = "v".repeat(MAX_VALUE_LENGTH + 1);
        assert_eq!(check(&json!({ "env": long_value }), "tags").len(), 1);

        let many: Map<String, Value> = (0..=MAX_TAGS).map(|i| (format!("k{i}"), json!("v"))).collect();
        assert_eq!(check(&Value::Object(many), "tags").len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let data = ResourceData::new(json!({ "tags": { "b": "2", "a": "1" } }).as_object().cloned().unwrap());
        let tags = expand(&data);
        assert_eq!(flatten(Some(&tags)), json!({ "a": "1", "b": "2" }));
        assert_eq!(flatten(None), json!({}));
    }
}
