//! Long-running operation tracking
//!
//! ARM reports asynchronous work in one of three ways, checked in this order:
//! an `Azure-AsyncOperation` header pointing at a status resource, a
//! `Location` header that answers 202 until the work is done, or a
//! `provisioningState` in the resource body itself.

use super::http::ArmResponse;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Status of a tracked operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed(String),
    Canceled,
}

impl OperationStatus {
    /// Map an ARM status string. Anything unrecognised is still running
    /// (`Accepted`, `Creating`, `Updating`, `Provisioning`, ...).
    pub fn from_state(state: &str, message: Option<&str>) -> Self {
        match state.to_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed(message.unwrap_or("no error message was returned").to_string()),
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress,
        }
    }

    /// Decode the body of an `Azure-AsyncOperation` status resource
    pub fn from_operation_body(body: &Value) -> Self {
        let state = body.get("status").and_then(Value::as_str).unwrap_or("InProgress");
        Self::from_state(state, error_message(body))
    }

    /// Decode `properties.provisioningState` of a resource body
    pub fn from_resource_body(body: &Value) -> Self {
        match provisioning_state(body) {
            Some(state) => Self::from_state(state, error_message(body)),
            None => Self::Succeeded,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed(_) => "Failed",
            Self::Canceled => "Canceled",
        }
    }
}

pub fn provisioning_state(body: &Value) -> Option<&str> {
    body.pointer("/properties/provisioningState").and_then(Value::as_str)
}

fn error_message(body: &Value) -> Option<&str> {
    body.pointer("/error/message")
        .or_else(|| body.pointer("/properties/error/message"))
        .and_then(Value::as_str)
}

/// How to find out when an accepted request has finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingStrategy {
    /// Nothing to wait for
    Done,
    AsyncOperation(String),
    Location(String),
    ProvisioningState(String),
}

impl PollingStrategy {
    pub fn from_response(method: &Method, resource_url: &str, response: &ArmResponse) -> Self {
        if let Some(url) = response.header("Azure-AsyncOperation") {
            return Self::AsyncOperation(url.to_string());
        }

        if response.status == StatusCode::ACCEPTED {
            if let Some(url) = response.header("Location") {
                return Self::Location(url.to_string());
            }
        }

        let mutates_body = *method == Method::PUT || *method == Method::PATCH;
        if mutates_body && !OperationStatus::from_resource_body(&response.body).is_terminal() {
            return Self::ProvisioningState(resource_url.to_string());
        }

        Self::Done
    }
}

/// Server-requested delay before the next poll
pub fn retry_after(response: &ArmResponse) -> Option<Duration> {
    let value = response.header("Retry-After")?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    // HTTP-date form; a date in the past means retry now
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some((at.with_timezone(&Utc) - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn response(status: StatusCode, headers: &[(&'static str, &'static str)], body: Value) -> ArmResponse {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.insert(*k, HeaderValue::from_static(v));
        }
        ArmResponse {
            status,
            headers: map,
            body,
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(OperationStatus::from_state("Succeeded", None), OperationStatus::Succeeded);
        assert_eq!(OperationStatus::from_state("canceled", None), OperationStatus::Canceled);
        assert_eq!(OperationStatus::from_state("Provisioning", None), OperationStatus::InProgress);
        assert!(!OperationStatus::InProgress.is_terminal());

        let failed = OperationStatus::from_operation_body(&json!({
            "status": "Failed",
            "error": { "code": "Conflict", "message": "boom" }
        }));
        assert_eq!(failed, OperationStatus::Failed("boom".to_string()));
    }

    #[test]
    fn test_async_operation_header_wins() {
        let r = response(
            StatusCode::CREATED,
            &[
                ("azure-asyncoperation", "https://op"),
                ("location", "https://loc"),
            ],
            json!({}),
        );
        assert_eq!(
            PollingStrategy::from_response(&Method::PUT, "https://res", &r),
            PollingStrategy::AsyncOperation("https://op".to_string())
        );
    }

    #[test]
    fn test_location_only_on_accepted() {
        let r = response(StatusCode::ACCEPTED, &[("location", "https://loc")], Value::Null);
        assert_eq!(
            PollingStrategy::from_response(&Method::DELETE, "https://res", &r),
            PollingStrategy::Location("https://loc".to_string())
        );

        let r = response(StatusCode::OK, &[("location", "https://loc")], Value::Null);
        assert_eq!(PollingStrategy::from_response(&Method::DELETE, "https://res", &r), PollingStrategy::Done);
    }

    #[test]
    fn test_provisioning_state_for_put() {
        let r = response(
            StatusCode::CREATED,
            &[],
            json!({ "properties": { "provisioningState": "Provisioning" } }),
        );
        assert_eq!(
            PollingStrategy::from_response(&Method::PUT, "https://res", &r),
            PollingStrategy::ProvisioningState("https://res".to_string())
        );
        assert_eq!(PollingStrategy::from_response(&Method::POST, "https://res", &r), PollingStrategy::Done);
    }

    #[test]
    fn test_retry_after() {
        let r = response(StatusCode::ACCEPTED, &[("retry-after", "5")], Value::Null);
        assert_eq!(retry_after(&r), Some(Duration::from_secs(5)));

        let r = response(StatusCode::ACCEPTED, &[("retry-after", "soon")], Value::Null);
        assert_eq!(retry_after(&r), None);
    }

    #[test]
    fn test_retry_after_http_date() {
        let past = response(StatusCode::ACCEPTED, &[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")], Value::Null);
        assert_eq!(retry_after(&past), Some(Duration::ZERO));

        let future = response(StatusCode::ACCEPTED, &[("retry-after", "Fri, 01 Jan 2100 00:00:00 GMT")], Value::Null);
        assert!(retry_after(&future).is_some_and(|d| d > Duration::from_secs(3600)));
    }
}
