use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Secure random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("Could not open the sign-in page: {0}")]
    LaunchFailed(String),

    #[error("No sign-in is in progress")]
    NoLoginInProgress,

    #[error("Sign-in attempt expired after {age_secs}s")]
    AuthorizationExpired { age_secs: i64 },

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirectUrl(String),

    #[error("Redirect does not match {expected}: got {actual}")]
    RedirectMismatch { expected: String, actual: String },

    #[error("Authorization denied: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("Redirect is missing the '{0}' parameter")]
    MissingParameter(&'static str),

    #[error("State parameter mismatch")]
    StateMismatch,

    #[error("Token exchange failed with HTTP {status}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("Token response has no access_token")]
    MissingAccessToken,

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Secure storage error: {0}")]
    SecureStorage(String),

    #[error("Stored token is corrupted: {0}")]
    TokenCorrupted(String),
}

impl AuthError {
    /// Map a failure from the HTTP bridge.
    pub(crate) fn from_transport(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(msg) => AuthError::Timeout(msg),
            other => AuthError::Network(other.to_string()),
        }
    }

    /// Map a failure from the secure store bridge.
    pub(crate) fn from_storage(error: BridgeError) -> Self {
        AuthError::SecureStorage(error.to_string())
    }

    /// Whether starting a fresh sign-in is likely to succeed.
    ///
    /// False for misconfiguration and missing platform capabilities, which a
    /// retry cannot fix.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AuthError::InvalidConfiguration(_)
                | AuthError::RandomUnavailable(_)
                | AuthError::LaunchFailed(_)
                | AuthError::SecureStorage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
