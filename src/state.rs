//! Generic state container passed to every CRUD function

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Attribute values of one resource instance, keyed by attribute name
pub type StateMap = Map<String, Value>;

/// Values of a single resource instance plus its ID.
///
/// An empty ID means the resource no longer exists and must be dropped from
/// state.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    values: StateMap,
    prior: Option<StateMap>,
}

impl ResourceData {
    pub fn new(values: StateMap) -> Self {
        let id = values
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            values,
            prior: None,
        }
    }

    /// Planned values for an update, compared against the prior state
    pub fn with_prior(values: StateMap, prior: StateMap) -> Self {
        let mut data = Self::new(values);
        if data.id.is_empty() {
            data.id = prior
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
        }
        data.prior = Some(prior);
        data
    }

    /// State holding nothing but an ID, as used by import
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_gone(&self) -> bool {
        self.id.is_empty()
    }

    /// Look up a value by dotted path, e.g. `sku.0.name`. Null reads as absent.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.values, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// String value or an empty string
    pub fn get_string(&self, path: &str) -> String {
        self.get_str(path).unwrap_or_default().to_string()
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// List or set elements; empty when unset
    pub fn get_list(&self, path: &str) -> &[Value] {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_string_list(&self, path: &str) -> Vec<String> {
        self.get_list(path)
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    pub fn get_string_map(&self, path: &str) -> HashMap<String, String> {
        self.get(path)
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A string attribute the schema marks as required
    pub fn require_str(&self, path: &str) -> Result<&str> {
        self.get_str(path)
            .filter(|s| !s.is_empty())
            .with_context(|| format!("`{path}` is required"))
    }

    /// Set a top-level attribute
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("setting `{key}`"))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Value of `path` in the prior state, if there is one
    pub fn prior(&self, path: &str) -> Option<&Value> {
        self.prior.as_ref().and_then(|p| lookup(p, path))
    }

    /// Whether `path` differs from the prior state; always true without one
    pub fn has_change(&self, path: &str) -> bool {
        match &self.prior {
            Some(prior) => lookup(prior, path) != lookup(&self.values, path),
            None => true,
        }
    }

    pub fn has_changes(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.has_change(p))
    }

    /// The final state object, with `id` filled in
    pub fn into_state(mut self) -> StateMap {
        self.values.insert("id".to_string(), Value::String(self.id));
        self.values
    }
}

fn lookup<'a>(values: &'a StateMap, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = values.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> ResourceData {
        ResourceData::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_nested_lookup() {
        let d = data(json!({
            "id": "/subscriptions/x",
            "network_acls": [{ "bypass": "None", "default_action": "Deny" }],
            "tags": { "env": "prod" },
            "description": null
        }));
        assert_eq!(d.id(), "/subscriptions/x");
        assert_eq!(d.get_str("network_acls.0.bypass"), Some("None"));
        assert_eq!(d.get_str("network_acls.1.bypass"), None);
        assert_eq!(d.get_string_map("tags").get("env").map(String::as_str), Some("prod"));
        assert!(d.get("description").is_none());
        assert!(d.get_list("missing").is_empty());
    }

    #[test]
    fn test_has_change() {
        let prior = json!({ "id": "x", "sku": "B1", "tags": { "a": "1" } });
        let planned = json!({ "sku": "S0", "tags": { "a": "1" } });
        let d = ResourceData::with_prior(
            planned.as_object().cloned().unwrap(),
            prior.as_object().cloned().unwrap(),
        );
        assert_eq!(d.id(), "x");
        assert!(d.has_change("sku"));
        assert!(!d.has_change("tags"));
        assert!(d.has_changes(&["tags", "sku"]));
    }

    #[test]
    fn test_into_state_sets_id() {
        let mut d = data(json!({ "name": "a" }));
        d.set_id("/subscriptions/x/resourceGroups/y");
        d.set("location", "westeurope").unwrap();
        let state = d.into_state();
        assert_eq!(state["id"], json!("/subscriptions/x/resourceGroups/y"));
        assert_eq!(state["location"], json!("westeurope"));
    }

    #[test]
    fn test_require_str() {
        let d = data(json!({ "name": "" }));
        assert!(d.require_str("name").is_err());
        assert!(d.require_str("missing").is_err());
    }
}
