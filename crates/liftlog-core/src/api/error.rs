use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized - please log in again")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body returned by the record store: `{code, message, data}` where
/// `data` maps field names to `{code, message}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: BTreeMap<String, FieldError>,
}

#[derive(Debug, Deserialize)]
struct FieldError {
    #[serde(default)]
    message: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Human-readable message from an error body, falling back to the raw text
    fn body_message(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if !parsed.message.is_empty() => {
                let fields: Vec<String> = parsed
                    .data
                    .iter()
                    .filter(|(_, e)| !e.message.is_empty())
                    .map(|(field, e)| format!("{}: {}", field, e.message))
                    .collect();
                if fields.is_empty() {
                    parsed.message
                } else {
                    format!("{} ({})", parsed.message, fields.join(", "))
                }
            }
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::body_message(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Display string for an error raised by a backend call.
///
/// Prefers the `ApiError` message anywhere in the chain, since it carries
/// what the server said; otherwise uses the outermost context.
pub fn describe_error(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(|api| api.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_server_message() {
        let body = r#"{"code":400,"message":"Failed to create record.","data":{"date":{"code":"validation_required","message":"Missing required value."}}}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err.to_string(),
            "Failed to create record. (date: Missing required value.)"
        );
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, r#"{"message":"The requested resource wasn't found."}"#),
            ApiError::NotFound(m) if m == "The requested resource wasn't found."
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down"),
            ApiError::ServerError(m) if m == "upstream down"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.len() < long.len() + 40);
    }

    #[test]
    fn test_describe_error_prefers_api_message() {
        let err: anyhow::Error = ApiError::BadRequest("network error".into()).into();
        let err = err.context("Failed to save sets");
        assert_eq!(describe_error(&err), "network error");

        let plain = anyhow::anyhow!("connection reset");
        assert_eq!(describe_error(&plain), "connection reset");

        let nested: anyhow::Result<()> = Err(anyhow::anyhow!("io")).context("Failed to send request");
        assert_eq!(describe_error(&nested.unwrap_err()), "Failed to send request");
    }
}
