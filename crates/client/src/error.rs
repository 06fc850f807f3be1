//! Unified error handling for the marketplace client.
//!
//! Every fallible operation returns [`ClientError`]. Backend failures are
//! normalized into [`ClientError::Backend`] with a human-readable message so
//! front ends can show [`ClientError::user_message`] directly.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No session, or the backend rejected it. The user has been sent to login.
    #[error("Authentication required")]
    AuthRequired {
        /// Path the login page should return to.
        return_url: String,
    },

    /// A cart mutation would exceed the product's stock.
    #[error("{message}")]
    StockExceeded {
        message: String,
        available: u32,
        in_cart: u32,
    },

    /// A checkout step is missing a selection it needs.
    #[error("{0}")]
    MissingSelection(String),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },

    /// An order submission is already in progress.
    #[error("An order is already being placed")]
    OrderInFlight,

    /// Client-side input validation failed. Nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The email address is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// The signed-in user lacks the role required for the operation.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired { .. } => "Please log in to continue".to_string(),
            Self::Backend { message, .. } => message.clone(),
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::Transport(_) => {
                "Could not reach the server. Please check your connection".to_string()
            }
            Self::Decode(_) => "Unexpected response from the server".to_string(),
            Self::Storage(_) | Self::Config(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }

    /// HTTP status for backend errors.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

// =============================================================================
// Backend error bodies
// =============================================================================

const MAX_PLAIN_TEXT_MESSAGE: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
    error_code: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, String>>,
}

/// Build a [`ClientError::Backend`] from a failed response.
///
/// The message comes from the body's `message`, then `detail`, then field
/// `errors`, then a short plain-text body, and finally a fallback keyed to the
/// status code.
#[must_use]
pub fn backend_error(status: StatusCode, body: &str) -> ClientError {
    let (message, code) = extract_message(body);
    ClientError::Backend {
        status,
        message: message.unwrap_or_else(|| fallback_message(status)),
        code,
    }
}

fn extract_message(body: &str) -> (Option<String>, Option<String>) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(trimmed) {
        let field_errors = parsed.errors.filter(|e| !e.is_empty()).map(|errors| {
            errors
                .iter()
                .map(|(field, msg)| format!("{field}: {msg}"))
                .collect::<Vec<_>>()
                .join(", ")
        });
        let message = non_blank(parsed.message)
            .or_else(|| non_blank(parsed.detail))
            .or(field_errors);
        return (message, parsed.error_code);
    }

    if let Ok(serde_json::Value::String(text)) = serde_json::from_str(trimmed) {
        return (non_blank(Some(text)), None);
    }

    // Plain text bodies are used as-is when short; HTML error pages are not.
    let looks_structured = trimmed.starts_with('<') || trimmed.starts_with('{');
    if !looks_structured && trimmed.chars().count() <= MAX_PLAIN_TEXT_MESSAGE {
        return (Some(trimmed.to_string()), None);
    }

    (None, None)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Default message for a status when the body carries none.
#[must_use]
pub fn fallback_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Invalid request".to_string(),
        401 => "Unauthorized access".to_string(),
        403 => "Access denied".to_string(),
        404 => "Resource not found".to_string(),
        409 => "Resource already exists".to_string(),
        500 => "Server error".to_string(),
        other => format!("Request failed with status {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_of(err: &ClientError) -> &str {
        match err {
            ClientError::Backend { message, .. } => message,
            _ => panic!("expected backend error, got {err:?}"),
        }
    }

    #[test]
    fn test_message_field_wins() {
        let err = backend_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Insufficient stock","detail":"ignored","errorCode":"STOCK"}"#,
        );
        assert_eq!(message_of(&err), "Insufficient stock");
        assert!(matches!(err, ClientError::Backend { code: Some(ref c), .. } if c == "STOCK"));
    }

    #[test]
    fn test_detail_used_when_message_missing() {
        let err = backend_error(StatusCode::CONFLICT, r#"{"detail":"Email taken"}"#);
        assert_eq!(message_of(&err), "Email taken");
    }

    #[test]
    fn test_field_errors_joined() {
        let err = backend_error(
            StatusCode::BAD_REQUEST,
            r#"{"errors":{"city":"must not be blank","country":"must not be blank"}}"#,
        );
        assert_eq!(
            message_of(&err),
            "city: must not be blank, country: must not be blank"
        );
    }

    #[test]
    fn test_plain_text_body() {
        let err = backend_error(StatusCode::BAD_REQUEST, "Not enough stock for product");
        assert_eq!(message_of(&err), "Not enough stock for product");
    }

    #[test]
    fn test_html_body_falls_back_to_status() {
        let err = backend_error(StatusCode::NOT_FOUND, "<html><body>404</body></html>");
        assert_eq!(message_of(&err), "Resource not found");
    }

    #[test]
    fn test_fallback_messages() {
        assert_eq!(fallback_message(StatusCode::BAD_REQUEST), "Invalid request");
        assert_eq!(fallback_message(StatusCode::UNAUTHORIZED), "Unauthorized access");
        assert_eq!(fallback_message(StatusCode::FORBIDDEN), "Access denied");
        assert_eq!(fallback_message(StatusCode::CONFLICT), "Resource already exists");
        assert_eq!(
            fallback_message(StatusCode::INTERNAL_SERVER_ERROR),
            "Server error"
        );
        assert_eq!(
            fallback_message(StatusCode::BAD_GATEWAY),
            "Request failed with status 502"
        );
    }

    #[test]
    fn test_empty_json_object_falls_back() {
        let err = backend_error(StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert_eq!(message_of(&err), "Server error");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_user_message() {
        let err = ClientError::AuthRequired {
            return_url: "/cart".to_string(),
        };
        assert_eq!(err.user_message(), "Please log in to continue");

        let err = ClientError::MissingSelection("Please select a shipping address".to_string());
        assert_eq!(err.user_message(), "Please select a shipping address");

        let err = backend_error(StatusCode::NOT_FOUND, "");
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Resource not found");
    }
}
