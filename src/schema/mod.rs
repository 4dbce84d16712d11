//! Schema declarations
//!
//! Every resource and data source declares a static [`Schema`]: a map of
//! attribute name to [`Attribute`] describing its type, whether it is
//! required/optional/computed, whether changing it forces replacement, its
//! default and any validators. The same declaration drives config
//! validation, defaulting and replacement planning.

pub mod validation;

use crate::diagnostics::{Diagnostic, Diagnostics};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Validator: receives the value and its attribute path, returns error messages
pub type ValidateFunc = Arc<dyn Fn(&Value, &str) -> Vec<String> + Send + Sync>;

/// Maps a configured value to the form stored in state, e.g. a canonical region name
pub type StateFunc = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Bool,
    Int,
    Float,
    List,
    Set,
    Map,
}

impl ValueType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::List | Self::Set => value.is_array(),
            Self::Map => value.is_object(),
        }
    }
}

/// Element of a collection attribute
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Elem {
    Type(ValueType),
    Block(Schema),
}

#[derive(Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub computed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Elem>,
    #[serde(skip)]
    pub validators: Vec<ValidateFunc>,
    #[serde(skip)]
    pub state_func: Option<StateFunc>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("value_type", &self.value_type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default)
            .field("elem", &self.elem)
            .field("validators", &self.validators.len())
            .field("state_func", &self.state_func.is_some())
            .finish()
    }
}

impl Attribute {
    fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            min_items: None,
            max_items: None,
            elem: None,
            validators: Vec::new(),
            state_func: None,
        }
    }

    pub fn required(value_type: ValueType) -> Self {
        Self {
            required: true,
            ..Self::new(value_type)
        }
    }

    pub fn optional(value_type: ValueType) -> Self {
        Self {
            optional: true,
            ..Self::new(value_type)
        }
    }

    pub fn computed(value_type: ValueType) -> Self {
        Self {
            computed: true,
            ..Self::new(value_type)
        }
    }

    /// Mark an optional attribute as also filled in by the API
    pub fn also_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn elem_type(mut self, value_type: ValueType) -> Self {
        self.elem = Some(Elem::Type(value_type));
        self
    }

    pub fn block(mut self, schema: Schema) -> Self {
        self.elem = Some(Elem::Block(schema));
        self
    }

    pub fn validate(mut self, f: ValidateFunc) -> Self {
        self.validators.push(f);
        self
    }

    pub fn state_func(mut self, f: StateFunc) -> Self {
        self.state_func = Some(f);
        self
    }

    /// The value as it would be stored in state
    fn state_value(&self, value: &Value) -> Value {
        match (&self.state_func, value) {
            (_, Value::Null) | (None, _) => value.clone(),
            (Some(f), value) => f(value),
        }
    }

    fn is_configurable(&self) -> bool {
        self.required || self.optional
    }

    fn validate_value(&self, path: &str, value: &Value, diags: &mut Diagnostics) {
        if !self.is_configurable() {
            diags.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!("can't configure a value for {path:?}: its value will be decided automatically"),
                )
                .with_attribute(path),
            );
            return;
        }

        if !self.value_type.matches(value) {
            diags.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!("{path:?}: expected a value of type {:?}", self.value_type),
                )
                .with_attribute(path),
            );
            return;
        }

        if let Value::Array(items) = value {
            if let Some(min) = self.min_items {
                if items.len() < min {
                    diags.push(
                        Diagnostic::error(
                            "Not enough list items",
                            format!("{path:?}: at least {min} item(s) are required, got {}", items.len()),
                        )
                        .with_attribute(path),
                    );
                }
            }
            if let Some(max) = self.max_items {
                if items.len() > max {
                    diags.push(
                        Diagnostic::error(
                            "Too many list items",
                            format!("{path:?}: at most {max} item(s) are allowed, got {}", items.len()),
                        )
                        .with_attribute(path),
                    );
                }
            }
            for (i, item) in items.iter().enumerate() {
                self.validate_element(&format!("{path}.{i}"), item, diags);
            }
        }

        if let (ValueType::Map, Value::Object(entries)) = (self.value_type, value) {
            for (key, item) in entries {
                self.validate_element(&format!("{path}.{key}"), item, diags);
            }
        }

        for validator in &self.validators {
            for message in validator(value, path) {
                diags.push(Diagnostic::error("Invalid value", message).with_attribute(path));
            }
        }
    }

    fn validate_element(&self, path: &str, item: &Value, diags: &mut Diagnostics) {
        match &self.elem {
            Some(Elem::Type(value_type)) => {
                if !value_type.matches(item) {
                    diags.push(
                        Diagnostic::error(
                            "Incorrect attribute value type",
                            format!("{path:?}: expected a value of type {value_type:?}"),
                        )
                        .with_attribute(path),
                    );
                }
            }
            Some(Elem::Block(schema)) => match item {
                Value::Object(obj) => schema.validate_at(path, obj, diags),
                _ => diags.push(
                    Diagnostic::error("Incorrect attribute value type", format!("{path:?}: expected a block"))
                        .with_attribute(path),
                ),
            },
            None => {}
        }
    }
}

/// Attribute map for a resource, data source, nested block or provider config
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "is_zero")]
    pub version: i64,
    pub attributes: BTreeMap<String, Attribute>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Add the computed `id` attribute every resource and data source exposes
    pub fn with_id(self) -> Self {
        if self.attributes.contains_key("id") {
            return self;
        }
        self.attr("id", Attribute::computed(ValueType::String))
    }

    /// Add the optional `timeouts` override map
    pub fn with_timeouts(self) -> Self {
        self.attr(
            "timeouts",
            Attribute::optional(ValueType::Map).elem_type(ValueType::String),
        )
    }

    /// Validate a configuration object against this schema
    pub fn validate(&self, config: &Map<String, Value>) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.validate_at("", config, &mut diags);
        diags
    }

    fn validate_at(&self, prefix: &str, obj: &Map<String, Value>, diags: &mut Diagnostics) {
        for (name, attribute) in &self.attributes {
            let path = join_path(prefix, name);
            match obj.get(name) {
                None | Some(Value::Null) => {
                    if attribute.required {
                        diags.push(
                            Diagnostic::error(
                                "Missing required argument",
                                format!("the argument {path:?} is required, but no definition was found"),
                            )
                            .with_attribute(path),
                        );
                    }
                }
                Some(value) => attribute.validate_value(&path, value, diags),
            }
        }

        for key in obj.keys() {
            if !self.attributes.contains_key(key) {
                let path = join_path(prefix, key);
                diags.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("an argument named {path:?} is not expected here"),
                    )
                    .with_attribute(path),
                );
            }
        }
    }

    /// Fill absent attributes that declare a default, recursing into blocks
    pub fn apply_defaults(&self, obj: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            if matches!(obj.get(name), None | Some(Value::Null)) {
                if let Some(default) = &attribute.default {
                    obj.insert(name.clone(), default.clone());
                }
                continue;
            }

            if let (Some(Elem::Block(schema)), Some(Value::Array(items))) = (&attribute.elem, obj.get_mut(name)) {
                for item in items.iter_mut() {
                    if let Value::Object(nested) = item {
                        schema.apply_defaults(nested);
                    }
                }
            }
        }
    }

    /// Rewrite configured values through each attribute's state func, recursing into blocks
    pub fn apply_state_funcs(&self, obj: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            let Some(value) = obj.get_mut(name) else {
                continue;
            };

            if attribute.state_func.is_some() {
                *value = attribute.state_value(value);
                continue;
            }

            if let (Some(Elem::Block(schema)), Value::Array(items)) = (&attribute.elem, value) {
                for item in items.iter_mut() {
                    if let Value::Object(nested) = item {
                        schema.apply_state_funcs(nested);
                    }
                }
            }
        }
    }

    /// Paths of force-new attributes whose value differs between the two states
    pub fn requires_replace(&self, prior: &Map<String, Value>, planned: &Map<String, Value>) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_replacements("", prior, planned, &mut paths);
        paths
    }

    fn collect_replacements(
        &self,
        prefix: &str,
        prior: &Map<String, Value>,
        planned: &Map<String, Value>,
        paths: &mut Vec<String>,
    ) {
        for (name, attribute) in &self.attributes {
            let path = join_path(prefix, name);
            let before = prior.get(name).unwrap_or(&Value::Null);
            let after = planned.get(name).unwrap_or(&Value::Null);

            if attribute.force_new {
                let changed = attribute.state_value(before) != attribute.state_value(after);
                // computed values the config leaves unset are not a change
                if changed && !(attribute.computed && after.is_null()) {
                    paths.push(path);
                }
                continue;
            }

            if let (Some(Elem::Block(schema)), Value::Array(old), Value::Array(new)) = (&attribute.elem, before, after) {
                for (i, (old, new)) in old.iter().zip(new.iter()).enumerate() {
                    if let (Value::Object(old), Value::Object(new)) = (old, new) {
                        schema.collect_replacements(&format!("{path}.{i}"), old, new, paths);
                    }
                }
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Schema {
        Schema::new()
            .attr("name", Attribute::required(ValueType::String).force_new())
            .attr("enabled", Attribute::optional(ValueType::Bool).default(true))
            .attr("fqdn", Attribute::computed(ValueType::String))
            .attr(
                "rule",
                Attribute::optional(ValueType::List).max_items(1).block(
                    Schema::new()
                        .attr("subnet_id", Attribute::required(ValueType::String).force_new())
                        .attr("size", Attribute::optional(ValueType::Int).default(3)),
                ),
            )
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_missing_required() {
        let diags = sample().validate(&obj(json!({ "enabled": true })));
        assert!(diags.has_errors());
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Missing required argument");
        assert_eq!(diag.attribute.as_deref(), Some("name"));
    }

    #[test]
    fn test_validate_nested_block_paths() {
        let diags = sample().validate(&obj(json!({
            "name": "x",
            "rule": [{ "size": "three" }]
        })));
        let attributes: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(attributes.contains(&"rule.0.subnet_id".to_string()));
        assert!(attributes.contains(&"rule.0.size".to_string()));
    }

    #[test]
    fn test_validate_rejects_computed_and_unknown() {
        let diags = sample().validate(&obj(json!({ "name": "x", "fqdn": "a", "bogus": 1 })));
        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"Value for unconfigurable attribute"));
        assert!(summaries.contains(&"Unsupported argument"));
    }

    #[test]
    fn test_max_items() {
        let diags = sample().validate(&obj(json!({
            "name": "x",
            "rule": [{ "subnet_id": "a" }, { "subnet_id": "b" }]
        })));
        assert!(diags.iter().any(|d| d.summary == "Too many list items"));
    }

    #[test]
    fn test_apply_defaults_recurses() {
        let mut value = obj(json!({ "name": "x", "rule": [{ "subnet_id": "a" }] }));
        sample().apply_defaults(&mut value);
        assert_eq!(value["enabled"], json!(true));
        assert_eq!(value["rule"][0]["size"], json!(3));
    }

    #[test]
    fn test_requires_replace() {
        let prior = obj(json!({ "name": "x", "enabled": true, "rule": [{ "subnet_id": "a", "size": 3 }] }));
        let planned = obj(json!({ "name": "x", "enabled": false, "rule": [{ "subnet_id": "b", "size": 3 }] }));
        assert_eq!(sample().requires_replace(&prior, &planned), vec!["rule.0.subnet_id".to_string()]);

        let renamed = obj(json!({ "name": "y", "enabled": true, "rule": [{ "subnet_id": "a", "size": 3 }] }));
        assert_eq!(sample().requires_replace(&prior, &renamed), vec!["name".to_string()]);
    }

    #[test]
    fn test_validators_run() {
        let schema = Schema::new().attr(
            "sku",
            Attribute::required(ValueType::String)
                .validate(validation::string_in_slice(&["B1", "S0"], false)),
        );
        assert!(schema.validate(&obj(json!({ "sku": "S0" }))).is_empty());
        assert!(schema.validate(&obj(json!({ "sku": "s0" }))).has_errors());
    }
}
