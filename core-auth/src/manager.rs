//! # Authentication Manager
//!
//! Orchestrates the sign-in lifecycle on top of [`OAuthClient`] and
//! [`SessionManager`]:
//!
//! - [`AuthManager::begin_login`] builds a fresh attempt and opens the
//!   authorization page on the first browser surface that accepts it
//! - [`AuthManager::handle_redirect`] redeems the attempt exactly once
//! - [`AuthManager::logout`] always ends with a cleared local session
//!
//! Every transition is mirrored on the [`EventBus`] as an [`AuthEvent`].
//!
//! ## Attempts
//!
//! At most one attempt is pending. Starting another supersedes it, so a
//! redirect for the older attempt fails the `state` check. The attempt is
//! removed before its redirect is inspected, whatever the outcome.

use bridge_traits::browser::{BrowserLauncher, BrowserSurface};
use bridge_traits::time::Clock;
use core_runtime::config::{CoreConfig, NetworkTimeouts};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::oauth::{matches_redirect_uri, verify_redirect, AuthorizationRequest, OAuthClient};
use crate::session::SessionManager;
use crate::types::{LogoutOutcome, TokenGrant};

/// A launched sign-in attempt.
#[derive(Debug, Clone)]
pub struct LoginLaunch {
    pub attempt_id: Uuid,
    /// Authorization URL that was opened. Contains no secrets.
    pub url: Url,
    pub surface: BrowserSurface,
}

pub struct AuthManager {
    oauth: OAuthClient,
    session: Arc<SessionManager>,
    launchers: Vec<Arc<dyn BrowserLauncher>>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    /// Upper bound on a whole token or logout call, on top of the
    /// per-request read timeout.
    call_timeout: Duration,
    pending: Mutex<Option<AuthorizationRequest>>,
}

impl AuthManager {
    pub fn new(
        oauth: OAuthClient,
        session: Arc<SessionManager>,
        launchers: Vec<Arc<dyn BrowserLauncher>>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        timeouts: NetworkTimeouts,
    ) -> Self {
        Self {
            oauth,
            session,
            launchers,
            event_bus,
            clock,
            call_timeout: timeouts.connect + timeouts.read,
            pending: Mutex::new(None),
        }
    }

    /// Wire a manager from a validated [`CoreConfig`].
    pub fn from_config(config: &CoreConfig, session: Arc<SessionManager>, event_bus: EventBus) -> Self {
        let oauth = OAuthClient::new(
            config.auth.clone(),
            config.http_client.clone(),
            config.timeouts.read,
        );
        Self::new(
            oauth,
            session,
            config.browser_launchers.clone(),
            event_bus,
            config.clock.clone(),
            config.timeouts,
        )
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Start a sign-in attempt and open its authorization page.
    ///
    /// Launchers are tried in configuration order; the first that succeeds
    /// wins. A previously pending attempt is discarded.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RandomUnavailable`] when no secure randomness is available
    /// - [`AuthError::LaunchFailed`] when every launcher refused the URL; no
    ///   attempt is left pending
    #[instrument(skip(self))]
    pub async fn begin_login(&self) -> Result<LoginLaunch> {
        let config = self.oauth.config();
        let request = match AuthorizationRequest::new(config, self.clock.now()) {
            Ok(request) => request,
            Err(e) => return Err(self.report_failure(None, e)),
        };
        let attempt_id = request.attempt_id();
        let url = request.authorization_url(config);

        {
            let mut pending = self.pending.lock().await;
            if let Some(previous) = pending.replace(request) {
                warn!(
                    superseded = %previous.attempt_id(),
                    attempt_id = %attempt_id,
                    "Superseding pending sign-in attempt"
                );
            }
        }

        let mut failures = Vec::new();
        for launcher in &self.launchers {
            let surface = launcher.surface();
            match launcher.open_url(url.as_str()).await {
                Ok(()) => {
                    info!(attempt_id = %attempt_id, %surface, "Authorization page opened");
                    let _ = self
                        .event_bus
                        .emit(CoreEvent::Auth(AuthEvent::SigningIn {
                            attempt_id: attempt_id.to_string(),
                            surface: surface.to_string(),
                        }));
                    return Ok(LoginLaunch {
                        attempt_id,
                        url,
                        surface,
                    });
                }
                Err(e) => {
                    warn!(%surface, error = %e, "Browser surface failed, trying next");
                    failures.push(format!("{}: {}", surface, e));
                }
            }
        }

        {
            let mut pending = self.pending.lock().await;
            if pending.as_ref().map(|p| p.attempt_id()) == Some(attempt_id) {
                pending.take();
            }
        }

        let message = if failures.is_empty() {
            "no browser surface configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(self.report_failure(Some(attempt_id), AuthError::LaunchFailed(message)))
    }

    /// Discard the pending attempt. Returns whether one existed.
    pub async fn cancel_login(&self) -> bool {
        let cancelled = self.pending.lock().await.take();
        if let Some(request) = &cancelled {
            info!(attempt_id = %request.attempt_id(), "Sign-in attempt cancelled");
        }
        cancelled.is_some()
    }

    pub async fn is_login_pending(&self) -> bool {
        self.pending.lock().await.is_some()
    }

    /// Whether `url` targets the configured redirect URI. Hosts use this to
    /// route deep links without consuming the attempt.
    pub fn is_redirect(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| matches_redirect_uri(&self.oauth.config().redirect_uri, &parsed))
            .unwrap_or(false)
    }

    /// Complete the pending attempt from its redirect URL.
    ///
    /// The attempt is consumed before anything is checked, so a second call
    /// for the same attempt fails with [`AuthError::NoLoginInProgress`]. No
    /// HTTP request is made unless the redirect passes every check. On
    /// success the token is persisted and the session becomes
    /// `Authenticated`; on failure it is left untouched.
    #[instrument(skip(self, redirect_url))]
    pub async fn handle_redirect(&self, redirect_url: &str) -> Result<TokenGrant> {
        let request = self
            .pending
            .lock()
            .await
            .take()
            .ok_or(AuthError::NoLoginInProgress)
            .map_err(|e| self.report_failure(None, e))?;
        let attempt_id = request.attempt_id();

        match self.redeem(&request, redirect_url).await {
            Ok(grant) => {
                let token = &grant.access_token;
                info!(
                    attempt_id = %attempt_id,
                    token_type = token.token_type(),
                    "Sign-in completed"
                );
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
                    token_type: token.token_type().to_string(),
                    expires_at: token.expires_at().map(|at| at.timestamp()),
                }));
                Ok(grant)
            }
            Err(e) => Err(self.report_failure(Some(attempt_id), e)),
        }
    }

    async fn redeem(&self, request: &AuthorizationRequest, redirect_url: &str) -> Result<TokenGrant> {
        let now = self.clock.now();
        let authorization_timeout = self.oauth.config().authorization_timeout;
        if request.is_expired(now, authorization_timeout) {
            return Err(AuthError::AuthorizationExpired {
                age_secs: request.age(now).num_seconds(),
            });
        }

        let code = verify_redirect(request, redirect_url)?;
        debug!(attempt_id = %request.attempt_id(), "Redirect verified");

        let grant = match timeout(
            self.call_timeout,
            self.oauth.exchange_code(request, &code, self.clock.now()),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(AuthError::Timeout(format!(
                    "token exchange exceeded {:?}",
                    self.call_timeout
                )))
            }
        };

        self.session
            .set_authenticated(grant.access_token.clone())
            .await?;
        Ok(grant)
    }

    /// Sign out.
    ///
    /// The logout endpoint is called when a token is present, but its outcome
    /// never prevents local clearing: the session is `Unauthenticated` when
    /// this returns, even on error.
    ///
    /// # Errors
    ///
    /// [`AuthError::SecureStorage`] when the persisted token could not be
    /// deleted. The session has already transitioned by then.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<LogoutOutcome> {
        self.pending.lock().await.take();

        let token = self.session.current().access_token().cloned();
        let remote_revoked = match token {
            Some(token) => match timeout(self.call_timeout, self.oauth.logout(&token)).await {
                Ok(Ok(acknowledged)) => acknowledged,
                Ok(Err(e)) => {
                    warn!(error = %e, "Remote logout failed, clearing local session anyway");
                    false
                }
                Err(_) => {
                    warn!("Remote logout timed out, clearing local session anyway");
                    false
                }
            },
            None => {
                debug!("No active session, skipping remote logout");
                false
            }
        };

        let cleared = self.session.clear().await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedOut { remote_revoked }));

        if let Err(e) = cleared {
            error!(error = %e, "Failed to delete persisted token during logout");
            return Err(e);
        }

        info!(remote_revoked, "Signed out");
        Ok(LogoutOutcome { remote_revoked })
    }

    fn report_failure(&self, attempt_id: Option<Uuid>, error: AuthError) -> AuthError {
        warn!(attempt_id = ?attempt_id, error = %error, "Sign-in failed");
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
            attempt_id: attempt_id.map(|id| id.to_string()),
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        }));
        error
    }
}
