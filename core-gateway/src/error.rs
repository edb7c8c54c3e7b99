//! Error taxonomy for gateway calls

use bridge_traits::error::BridgeError;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Every gateway failure maps into one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// No session, or the gateway rejected the token.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The gateway rejected the request body.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        /// Field name to message, when the gateway reported them.
        field_errors: BTreeMap<String, String>,
    },

    #[error("Server error (HTTP {status})")]
    Server { status: u16, message: String },

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Error body shape shared by gateway services. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "fieldErrors")]
    errors: Option<FieldErrors>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldErrors {
    Map(BTreeMap<String, String>),
    List(Vec<FieldError>),
}

#[derive(Debug, Deserialize)]
struct FieldError {
    field: String,
    #[serde(alias = "defaultMessage")]
    message: String,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn field_errors(self) -> BTreeMap<String, String> {
        match self.errors {
            Some(FieldErrors::Map(map)) => map,
            Some(FieldErrors::List(list)) => list
                .into_iter()
                .map(|e| (e.field, e.message))
                .collect(),
            None => BTreeMap::new(),
        }
    }
}

impl ApiError {
    /// Map a non-2xx response.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed = ErrorBody::parse(body);
        match status {
            400 | 422 => {
                let message = parsed.message_or("Request was rejected");
                ApiError::Validation {
                    message,
                    field_errors: parsed.field_errors(),
                }
            }
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(parsed.message_or("Access denied")),
            404 => ApiError::NotFound(parsed.message_or("Resource not found")),
            408 | 504 => ApiError::Timeout(format!("gateway returned HTTP {}", status)),
            500..=599 => ApiError::Server {
                status,
                message: parsed.message_or("Internal server error"),
            },
            _ => ApiError::Unknown(format!(
                "unexpected HTTP {}: {}",
                status,
                parsed.message_or("no message")
            )),
        }
    }

    /// Map a failure from the HTTP bridge.
    pub fn from_bridge(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(msg) => ApiError::Timeout(msg),
            BridgeError::Connection(msg) | BridgeError::OperationFailed(msg) => {
                ApiError::Network(msg)
            }
            BridgeError::Io(e) => ApiError::Network(e.to_string()),
            other => ApiError::Unknown(other.to_string()),
        }
    }

    /// Text suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Timeout(_) => "The server took too long to respond. Please try again.".to_string(),
            ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            ApiError::Forbidden(_) => "You do not have permission to do this.".to_string(),
            ApiError::NotFound(_) => "The requested item could not be found.".to_string(),
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::Server { .. } => {
                "Something went wrong on the server. Please try again later.".to_string()
            }
            ApiError::Unknown(_) => "An unexpected error occurred.".to_string(),
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::Server { .. }
        )
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        ApiError::from_bridge(error)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
