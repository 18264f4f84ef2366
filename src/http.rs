//! Shared HTTP plumbing for the Keyoku and LLM clients.

use crate::{DemoError, Result};
use reqwest::Client;
use std::time::Duration;

/// Per-request timeout for both remote services
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ERROR_DETAIL_CHARS: usize = 500;

pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("keyoku-demo/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DemoError::Config(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into a `Remote` error carrying the service's message.
pub async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = extract_error_detail(&body);
    let detail = truncate_error_detail(&detail, MAX_ERROR_DETAIL_CHARS);
    if !detail.is_empty() {
        return Err(DemoError::Remote(format!("API error {status}: {detail}")));
    }
    Err(DemoError::Remote(format!("API error {status}")))
}

pub fn extract_error_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        // Keyoku sends {"error": "..."} or {"detail": "..."}
        if let Some(msg) = value.get("error").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = value.get("detail").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    trimmed.to_string()
}

pub fn truncate_error_detail(detail: &str, max_chars: usize) -> String {
    if detail.chars().count() <= max_chars {
        return detail.to_string();
    }

    let mut truncated = detail.chars().take(max_chars).collect::<String>();
    truncated.push_str("... [truncated]");
    truncated
}

pub fn map_reqwest_error(e: reqwest::Error) -> DemoError {
    if e.is_timeout() {
        DemoError::Timeout(e.to_string())
    } else if e.is_connect() {
        DemoError::Remote(format!("network: {e}"))
    } else if e.is_decode() {
        DemoError::Remote(format!("unexpected response: {e}"))
    } else {
        DemoError::Remote(e.to_string())
    }
}
