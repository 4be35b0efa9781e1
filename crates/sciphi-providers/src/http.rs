//! Shared HTTP plumbing for the network-backed providers.
//!
//! Clients are built once per provider (no network traffic at construction)
//! and every request goes through [`post_json`], which owns the mapping from
//! HTTP failures to [`CompletionError`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use sciphi_core::config::ProviderConfig;
use sciphi_core::error::ConfigError;

use crate::error::{parse_retry_after, CompletionError};
use crate::registry::ProviderSpec;

/// Build a connection-pooled client carrying the configured timeout and extra headers.
///
/// Headers that are not valid HTTP are skipped with a warning.
pub(crate) fn build_client(
    spec: &ProviderSpec,
    config: &ProviderConfig,
    mut headers: HeaderMap,
) -> Result<reqwest::Client, ConfigError> {
    if let Some(ref extra) = config.extra_headers {
        for (key, value) in extra {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(val)) => {
                    headers.insert(name, val);
                }
                _ => warn!(provider = spec.display_name, header = %key, "Invalid header, skipping"),
            }
        }
    }

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .default_headers(headers)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Header value from a secret, failing construction if it contains control characters.
pub(crate) fn secret_header(
    spec: &ProviderSpec,
    value: &str,
) -> Result<HeaderValue, ConfigError> {
    let mut header = HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidSetting {
        provider: spec.name,
        setting: "API key",
        reason: "contains characters not allowed in an HTTP header".to_string(),
    })?;
    header.set_sensitive(true);
    Ok(header)
}

/// POST `body` as JSON and decode a successful response as `T`.
///
/// Non-2xx statuses become classified [`CompletionError`]s; a `Retry-After`
/// header is carried on rate-limit errors.
pub(crate) async fn post_json<B, T>(
    request: reqwest::RequestBuilder,
    body: &B,
    provider: &str,
) -> Result<T, CompletionError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = request.json(body).send().await.map_err(|e| {
        error!(provider, error = %e, "HTTP request failed");
        CompletionError::from(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(provider, status = %status, body = %error_text, "API error");
        return Err(CompletionError::from_status(status, &error_text, retry_after));
    }

    let bytes = response.bytes().await.map_err(CompletionError::from)?;
    debug!(provider, bytes = bytes.len(), "Response received");
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(provider, error = %e, "Failed to parse response");
        CompletionError::MalformedResponse(e.to_string())
    })
}
