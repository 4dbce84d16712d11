//! Reusable attribute validators

use super::ValidateFunc;
use crate::resourceids::ResourceId;
use regex::Regex;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::sync::Arc;

fn expect_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, Vec<String>> {
    value
        .as_str()
        .ok_or_else(|| vec![format!("expected {key:?} to be a string")])
}

pub fn string_is_not_empty() -> ValidateFunc {
    Arc::new(|value: &Value, key: &str| match expect_str(value, key) {
        Ok(s) if s.trim().is_empty() => vec![format!("{key:?} must not be empty")],
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    })
}

/// Accept only one of `values`, optionally ignoring case
pub fn string_in_slice(values: &'static [&'static str], ignore_case: bool) -> ValidateFunc {
    Arc::new(move |value: &Value, key: &str| match expect_str(value, key) {
        Ok(s) => {
            let found = values
                .iter()
                .any(|v| if ignore_case { v.eq_ignore_ascii_case(s) } else { *v == s });
            if found {
                Vec::new()
            } else {
                vec![format!("expected {key:?} to be one of {values:?}, got {s:?}")]
            }
        }
        Err(errors) => errors,
    })
}

/// Accept strings matching `pattern`; `message` explains the rule to the user
pub fn string_matches(pattern: &str, message: &'static str) -> ValidateFunc {
    match Regex::new(pattern) {
        Ok(re) => Arc::new(move |value: &Value, key: &str| match expect_str(value, key) {
            Ok(s) if re.is_match(s) => Vec::new(),
            Ok(_) => vec![format!("{key:?}: {message}")],
            Err(errors) => errors,
        }),
        Err(err) => {
            let reason = err.to_string();
            Arc::new(move |_: &Value, key: &str| vec![format!("{key:?}: invalid validation pattern: {reason}")])
        }
    }
}

pub fn int_between(min: i64, max: i64) -> ValidateFunc {
    Arc::new(move |value: &Value, key: &str| match value.as_i64() {
        Some(n) if n < min || n > max => {
            vec![format!("expected {key:?} to be in the range ({min} - {max}), got {n}")]
        }
        Some(_) => Vec::new(),
        None => vec![format!("expected {key:?} to be an integer")],
    })
}

pub fn is_uuid() -> ValidateFunc {
    Arc::new(|value: &Value, key: &str| match expect_str(value, key) {
        Ok(s) if uuid::Uuid::parse_str(s).is_ok() => Vec::new(),
        Ok(s) => vec![format!("{key:?} must be a valid UUID, got {s:?}")],
        Err(errors) => errors,
    })
}

pub fn is_ipv4_address() -> ValidateFunc {
    Arc::new(|value: &Value, key: &str| match expect_str(value, key) {
        Ok(s) if s.parse::<Ipv4Addr>().is_ok() => Vec::new(),
        Ok(s) => vec![format!("expected {key:?} to contain a valid IPv4 address, got {s:?}")],
        Err(errors) => errors,
    })
}

pub fn is_url_with_https() -> ValidateFunc {
    Arc::new(|value: &Value, key: &str| match expect_str(value, key) {
        Ok(s) => match url::Url::parse(s) {
            Ok(u) if u.scheme() == "https" && u.host().is_some() => Vec::new(),
            Ok(_) => vec![format!("expected {key:?} to have a url with schema of: \"https\", got {s:?}")],
            Err(err) => vec![format!("expected {key:?} to be a valid url, got {s:?}: {err}")],
        },
        Err(errors) => errors,
    })
}

/// Validate a string as a typed resource ID
pub fn resource_id<T: ResourceId + 'static>() -> ValidateFunc {
    Arc::new(|value: &Value, key: &str| match expect_str(value, key) {
        Ok(s) => match T::parse(s) {
            Ok(_) => Vec::new(),
            Err(err) => vec![format!("{key:?}: {err}")],
        },
        Err(errors) => errors,
    })
}

/// Apply `f` to each element of a list or set attribute
pub fn each(f: ValidateFunc) -> ValidateFunc {
    Arc::new(move |value: &Value, key: &str| match value.as_array() {
        Some(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| f(item, &format!("{key}.{i}")))
            .collect(),
        None => vec![format!("expected {key:?} to be a list")],
    })
}
