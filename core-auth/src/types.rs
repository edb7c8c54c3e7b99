use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential issued by the authorization server.
///
/// This is the record persisted in the secure store and attached to every
/// gateway call. `Debug` never prints the token value.
///
/// # Examples
///
/// ```
/// use core_auth::AccessToken;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let token = AccessToken::new("eyJhbGciOi...", "Bearer", Some(now + Duration::hours(1)));
///
/// assert!(!token.is_expired_at(now));
/// assert_eq!(token.authorization_header(), "Bearer eyJhbGciOi...");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    token: String,
    token_type: String,
    /// `None` when the server did not report `expires_in`.
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(
        token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            token: token.into(),
            token_type: token_type.into(),
            expires_at,
        }
    }

    /// Raw token value. Do not log.
    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// `Authorization` header value. The scheme is normalised to `Bearer`
    /// when the server reports it in another case.
    pub fn authorization_header(&self) -> String {
        let scheme = if self.token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", scheme, self.token)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_with_buffer(now, Duration::zero())
    }

    /// True once `now` is within `buffer` of the expiry. Tokens without an
    /// expiry never expire locally; the gateway's 401 is authoritative.
    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at - buffer,
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Everything the token endpoint returned for a successful exchange.
///
/// Only [`TokenGrant::access_token`] is persisted; the optional extras are
/// handed to the caller.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: AccessToken,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Session as seen by the rest of the app.
///
/// ```text
/// Unauthenticated ──login──> Authenticated(token)
///        ^                          │
///        └──── logout / 401 ────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(AccessToken),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        match self {
            SessionState::Authenticated(token) => Some(token),
            SessionState::Unauthenticated => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "Unauthenticated"),
            SessionState::Authenticated(_) => write!(f, "Authenticated"),
        }
    }
}

/// Result of a logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// The server acknowledged the logout call with a 2xx.
    pub remote_revoked: bool,
}
