//! `CompletionError`: the single failure type of every provider call.
//!
//! Each variant carries enough to decide whether the call is worth repeating:
//! rate limits, timeouts, transport failures and 5xx responses are transient;
//! everything else is permanent.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use sciphi_core::utils::truncate_string;

/// Longest raw response body kept in an error message, in characters.
const MAX_ERROR_BODY: usize = 300;

/// Failure of a `complete` or `retrieve` call.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("invalid request (status {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// How the retry wrapper should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Do not retry; fail immediately.
    Permanent,
    /// Retry, waiting at least `retry_after` when the provider asked for it.
    Transient { retry_after: Option<Duration> },
}

impl CompletionError {
    pub fn classify(&self) -> Classification {
        match self {
            CompletionError::RateLimited { retry_after } => Classification::Transient {
                retry_after: *retry_after,
            },
            CompletionError::Timeout
            | CompletionError::Network(_)
            | CompletionError::Server { .. } => Classification::Transient { retry_after: None },
            CompletionError::Authentication { .. }
            | CompletionError::InvalidRequest { .. }
            | CompletionError::MalformedResponse(_) => Classification::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.classify(), Classification::Transient { .. })
    }

    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let message = extract_error_message(body);
        let code = status.as_u16();
        match code {
            401 | 403 => CompletionError::Authentication {
                status: code,
                message,
            },
            429 => CompletionError::RateLimited { retry_after },
            408 | 504 => CompletionError::Timeout,
            _ if status.is_server_error() => CompletionError::Server {
                status: code,
                message,
            },
            _ => CompletionError::InvalidRequest {
                status: code,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else if e.is_decode() {
            CompletionError::MalformedResponse(e.to_string())
        } else {
            CompletionError::Network(e.to_string())
        }
    }
}

/// Pull a readable message out of an error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else is returned trimmed and shortened.
fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return truncate_string(body.trim(), MAX_ERROR_BODY);
    };

    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("error").filter(|v| v.is_string()))
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str());

    match message {
        Some(m) => m.to_string(),
        None => truncate_string(body.trim(), MAX_ERROR_BODY),
    }
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds.
pub(crate) fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_rate_limit_is_transient_with_hint() {
        let err = CompletionError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            "",
            Some(Duration::from_secs(2)),
        );
        assert_eq!(
            err.classify(),
            Classification::Transient {
                retry_after: Some(Duration::from_secs(2))
            }
        );
    }

    #[test]
    fn test_auth_is_permanent() {
        let err = CompletionError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "Incorrect API key provided"}}"#,
            None,
        );
        assert!(!err.is_retryable());
        match err {
            CompletionError::Authentication { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_server_error_is_transient() {
        let err = CompletionError::from_status(StatusCode::BAD_GATEWAY, "upstream down", None);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_gateway_timeout_maps_to_timeout() {
        let err = CompletionError::from_status(StatusCode::GATEWAY_TIMEOUT, "", None);
        assert!(matches!(err, CompletionError::Timeout));
    }

    #[test]
    fn test_bad_request_is_permanent() {
        let err = CompletionError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "max_tokens too large"}"#,
            None,
        );
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("max_tokens too large"));
    }

    #[test]
    fn test_long_html_body_is_shortened() {
        let body = format!("<html>{}</html>", "x".repeat(1000));
        let err = CompletionError::from_status(StatusCode::SERVICE_UNAVAILABLE, &body, None);
        let CompletionError::Server { message, .. } = err else {
            panic!("expected server error");
        };
        assert_eq!(message.chars().count(), MAX_ERROR_BODY);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn test_malformed_is_permanent() {
        assert!(!CompletionError::MalformedResponse("no choices".into()).is_retryable());
    }

    #[test]
    fn test_parse_retry_after() {
        let header = HeaderValue::from_static("1.5");
        assert_eq!(
            parse_retry_after(Some(&header)),
            Some(Duration::from_millis(1500))
        );
        let bogus = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&bogus)), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
