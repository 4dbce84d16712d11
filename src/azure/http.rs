//! HTTP utilities for Azure Resource Manager REST calls

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Errors returned by the ARM REST layer
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("unexpected status {status} with error: {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("sending request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("building request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("obtaining an access token: {0}")]
    Auth(String),

    #[error("the long-running operation finished with status {status:?}: {message}")]
    OperationFailed { status: String, message: String },
}

impl ArmError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn was_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }

    pub fn was_not_found(&self) -> bool {
        self.was_status(StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

fn api_error(status: StatusCode, body: &str) -> ArmError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error);

    let (code, message) = match detail {
        Some(d) => (d.code, d.message),
        None => (None, None),
    };

    ArmError::Api {
        status,
        code: code.unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
        message: message.unwrap_or_else(|| sanitize_for_log(body)),
    }
}

/// A successful ARM response
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body, `Value::Null` when the body was empty
    pub body: Value,
}

impl ArmResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azurerm-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Send a request with a bearer token and an optional JSON body
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse, ArmError> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", Uuid::new_v4().to_string());

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(api_error(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(ArmResponse {
            status,
            headers,
            body,
        })
    }
}

/// Format an ARM error for display on the command line
pub fn format_arm_error(error: &anyhow::Error) -> String {
    let status = error
        .chain()
        .find_map(|e| e.downcast_ref::<ArmError>())
        .and_then(ArmError::status);

    match status.map(|s| s.as_u16()) {
        Some(401) => return "Authentication failed. Run 'az login' or check the client credentials.".to_string(),
        Some(403) => return "Permission denied. Check the role assignments for this principal.".to_string(),
        Some(404) => return "Resource not found.".to_string(),
        Some(409) => return "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(429) => return "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => return "Invalid request. Check your parameters.".to_string(),
        Some(s) if s >= 500 => return "Azure service temporarily unavailable. Please try again.".to_string(),
        _ => {}
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = format!("{error:#}");
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        let out = sanitize_for_log(&body);
        assert!(out.contains("truncated"));
    }

    #[test]
    fn test_api_error_parses_envelope() {
        let err = api_error(
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":"ResourceNotFound","message":"The Resource was not found."}}"#,
        );
        assert!(err.was_not_found());
        assert_eq!(
            err.to_string(),
            "unexpected status 404 Not Found with error: ResourceNotFound: The Resource was not found."
        );
    }

    #[test]
    fn test_api_error_without_envelope() {
        let err = api_error(StatusCode::BAD_GATEWAY, "upstream went away");
        match err {
            ArmError::Api { code, message, .. } => {
                assert_eq!(code, "Bad Gateway");
                assert_eq!(message, "upstream went away");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_format_arm_error_uses_status() {
        let err = anyhow::Error::new(api_error(StatusCode::FORBIDDEN, "{}")).context("retrieving Server");
        assert_eq!(
            format_arm_error(&err),
            "Permission denied. Check the role assignments for this principal."
        );
    }
}
