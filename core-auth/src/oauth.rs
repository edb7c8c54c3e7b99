//! OAuth 2.0 Authorization Code flow with PKCE
//!
//! The pure halves of the flow: building the authorization URL for a fresh
//! attempt, checking the redirect that comes back, and the two HTTP calls
//! made against the authorization server (token exchange and logout).
//! Attempt bookkeeping and session side effects live in
//! [`AuthManager`](crate::manager::AuthManager).
//!
//! ## Flow
//!
//! 1. [`AuthorizationRequest::new`] generates the PKCE pair and `state`
//! 2. The user signs in on the page from [`AuthorizationRequest::authorization_url`]
//! 3. [`verify_redirect`] checks the callback and yields the `code`
//! 4. [`OAuthClient::exchange_code`] trades it for a [`TokenGrant`]
//!
//! ## Security Notes
//!
//! - The code verifier and the `code` never reach logs
//! - `state` is compared before any network traffic
//! - An attempt is redeemable once; the manager drops it before verifying

use bridge_traits::http::{HttpClient, HttpRequest};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use core_runtime::config::AuthServerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::pkce::{generate_state, PkcePair};
use crate::types::{AccessToken, TokenGrant};

/// One launched sign-in attempt.
///
/// Holds the secret half of the PKCE pair plus the `state` expected back on
/// the redirect. Lives only in memory.
#[derive(Clone)]
pub struct AuthorizationRequest {
    attempt_id: Uuid,
    pkce: PkcePair,
    state: String,
    created_at: DateTime<Utc>,
    client_id: String,
    redirect_uri: Url,
    scopes: Vec<String>,
}

impl AuthorizationRequest {
    /// Start a new attempt against `config`.
    pub fn new(config: &AuthServerConfig, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            attempt_id: Uuid::new_v4(),
            pkce: PkcePair::with_length(config.verifier_bytes)?,
            state: generate_state()?,
            created_at: now,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        })
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn pkce(&self) -> &PkcePair {
        &self.pkce
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Authorize endpoint URL carrying this attempt's parameters.
    pub fn authorization_url(&self, config: &AuthServerConfig) -> Url {
        let mut url = config.authorize_url();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("code_challenge", self.pkce.challenge())
            .append_pair("code_challenge_method", self.pkce.method())
            .append_pair("state", &self.state)
            .append_pair("scope", &self.scopes.join(" "));
        url
    }

    pub fn age(&self, now: DateTime<Utc>) -> ChronoDuration {
        now - self.created_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match ChronoDuration::from_std(timeout) {
            Ok(limit) => self.age(now) > limit,
            Err(_) => false,
        }
    }
}

impl fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("attempt_id", &self.attempt_id)
            .field("pkce", &self.pkce)
            .field("state", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri.as_str())
            .finish()
    }
}

/// Whether `url` targets the redirect URI of `request` (scheme, host, port
/// and path). Query and fragment are ignored.
pub fn matches_redirect_uri(expected: &Url, actual: &Url) -> bool {
    fn normalized_path(url: &Url) -> &str {
        match url.path() {
            "" => "/",
            path => path,
        }
    }

    expected.scheme() == actual.scheme()
        && expected.host_str() == actual.host_str()
        && expected.port_or_known_default() == actual.port_or_known_default()
        && normalized_path(expected) == normalized_path(actual)
}

/// Check a redirect against its attempt and return the authorization code.
///
/// Checks, in order: the URL parses and targets the configured redirect URI,
/// the server did not report an `error`, `code` and `state` are present and
/// `state` equals the attempt's.
pub fn verify_redirect(request: &AuthorizationRequest, redirect_url: &str) -> Result<String> {
    let url = Url::parse(redirect_url).map_err(|e| AuthError::InvalidRedirectUrl(e.to_string()))?;

    if !matches_redirect_uri(request.redirect_uri(), &url) {
        return Err(AuthError::RedirectMismatch {
            expected: request.redirect_uri().to_string(),
            actual: format!(
                "{}://{}{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                url.path()
            ),
        });
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(AuthError::AuthorizationDenied {
            error,
            description: error_description,
        });
    }

    let code = code
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingParameter("code"))?;
    let state = state
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingParameter("state"))?;

    if state != request.state() {
        return Err(AuthError::StateMismatch);
    }

    Ok(code)
}

/// Token endpoint request body.
#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
    client_id: &'a str,
    code_verifier: &'a str,
}

/// Token endpoint response. Every field is optional so a missing
/// `access_token` is reported as such rather than as a decode error.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// HTTP calls against the authorization server.
pub struct OAuthClient {
    config: AuthServerConfig,
    http_client: Arc<dyn HttpClient>,
    read_timeout: Duration,
}

impl OAuthClient {
    pub fn new(
        config: AuthServerConfig,
        http_client: Arc<dyn HttpClient>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            config,
            http_client,
            read_timeout,
        }
    }

    pub fn config(&self) -> &AuthServerConfig {
        &self.config
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Sends exactly one form-encoded POST to the token endpoint. `now` is
    /// used to turn `expires_in` into an absolute expiry.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExchangeFailed`] for a non-2xx status
    /// - [`AuthError::InvalidTokenResponse`] when the body is not JSON
    /// - [`AuthError::MissingAccessToken`] when `access_token` is absent or empty
    /// - [`AuthError::Network`] / [`AuthError::Timeout`] for transport failures
    #[instrument(skip(self, request, code), fields(attempt_id = %request.attempt_id()))]
    pub async fn exchange_code(
        &self,
        request: &AuthorizationRequest,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenGrant> {
        let body = TokenRequest {
            grant_type: "authorization_code",
            code,
            redirect_uri: request.redirect_uri().as_str(),
            client_id: &self.config.client_id,
            code_verifier: request.pkce().verifier(),
        };

        let http_request = HttpRequest::post(self.config.token_url().as_str())
            .header("Accept", "application/json")
            .form(&body)
            .map_err(|e| AuthError::InvalidConfiguration(e.to_string()))?
            .timeout(self.read_timeout);

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http_client
            .execute(http_request)
            .await
            .map_err(AuthError::from_transport)?;

        if !response.is_success() {
            let status = response.status;
            let body = response.text_lossy();
            warn!(status, "Token endpoint rejected the authorization code");
            return Err(AuthError::TokenExchangeFailed { status, body });
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;
        let token_type = parsed
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string());
        let expires_at = parsed
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(|secs| {
                let expires_at = ChronoDuration::try_seconds(secs)
                    .and_then(|lifetime| now.checked_add_signed(lifetime));
                if expires_at.is_none() {
                    warn!(expires_in = secs, "Token lifetime out of range, treating as no expiry");
                }
                expires_at
            });

        info!(
            token_type = %token_type,
            expires_in = ?parsed.expires_in,
            "Authorization code exchanged"
        );

        Ok(TokenGrant {
            access_token: AccessToken::new(access_token, token_type, expires_at),
            refresh_token: parsed.refresh_token,
            id_token: parsed.id_token,
            scope: parsed.scope,
        })
    }

    /// Tell the server the token is no longer in use.
    ///
    /// Returns whether the server acknowledged with a 2xx. Transport failures
    /// are errors; callers treat both as "not revoked".
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &AccessToken) -> Result<bool> {
        let request = HttpRequest::post(self.config.logout_url().as_str())
            .bearer_token(token.secret())
            .timeout(self.read_timeout);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(AuthError::from_transport)?;

        if response.is_success() {
            debug!(status = response.status, "Logout acknowledged");
            Ok(true)
        } else {
            warn!(status = response.status, "Logout endpoint returned an error");
            Ok(false)
        }
    }
}
