//! HTTP utilities for the Overseerr client
//!
//! Shared request/response handling: client construction, status checks and
//! error body cleanup.

use crate::config::get_overseerr_http_timeout_secs;
use crate::overseerr::OverseerrError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Maximum length of an error body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Creates an HTTP client with the API key header and the standard timeout.
///
/// Uses `OVERSEERR_HTTP_TIMEOUT_SECS` environment variable or 30s default.
///
/// # Errors
///
/// Returns `OverseerrError::Config` if the API key is not a valid header value
/// or the client cannot be built.
pub fn create_http_client(api_key: &str) -> Result<HttpClient, OverseerrError> {
    let mut headers = HeaderMap::new();
    let mut key = HeaderValue::from_str(api_key)
        .map_err(|_| OverseerrError::Config("API key is not a valid header value".to_string()))?;
    key.set_sensitive(true);
    headers.insert("X-Api-Key", key);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let timeout = Duration::from_secs(get_overseerr_http_timeout_secs());
    HttpClient::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| OverseerrError::Config(e.to_string()))
}

/// Checks the response status and parses the JSON body.
///
/// # Errors
///
/// Returns `OverseerrError::Api` on non-success status codes or
/// `OverseerrError::Json` if parsing fails.
pub async fn parse_json_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, OverseerrError> {
    let response = ensure_success(response).await?;
    response
        .json()
        .await
        .map_err(|e| OverseerrError::Json(e.to_string()))
}

/// Returns `Ok(None)` for 404, otherwise behaves like [`parse_json_response`].
///
/// # Errors
///
/// Same as [`parse_json_response`].
pub async fn parse_optional_json_response<T: DeserializeOwned>(
    response: Response,
) -> Result<Option<T>, OverseerrError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    parse_json_response(response).await.map(Some)
}

async fn ensure_success(response: Response) -> Result<Response, OverseerrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(OverseerrError::Api {
        status: status.as_u16(),
        message: clean_error_body(&error_text),
    })
}

/// Collapses HTML error pages and truncates long bodies.
#[must_use]
pub fn clean_error_body(body: &str) -> String {
    let trimmed = body.trim_start();
    // Detect HTML error pages from reverse proxies
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return "Server returned HTML error page".to_string();
    }

    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        format!(
            "{}... (truncated)",
            crate::utils::truncate_str(body, MAX_ERROR_BODY_CHARS)
        )
    } else {
        body.to_string()
    }
}
