//! Session state
//!
//! [`SessionManager`] owns the single process-wide [`SessionState`] and keeps
//! it in step with the persisted token. Observers subscribe through a
//! `tokio::sync::watch` channel and only ever see complete states: a token is
//! published after it is persisted, and cleared before it is deleted.

use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{AccessToken, SessionState};

pub struct SessionManager {
    state: watch::Sender<SessionState>,
    token_store: TokenStore,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    /// Serializes persist/publish pairs so the store and the published state
    /// cannot interleave.
    write_lock: Mutex<()>,
}

impl SessionManager {
    /// Create a manager in the `Unauthenticated` state. Call
    /// [`restore`](Self::restore) to pick up a persisted token.
    pub fn new(token_store: TokenStore, event_bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            state,
            token_store,
            event_bus,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Derive the startup state from the token store.
    ///
    /// An expired token is deleted and a corrupted one has already been
    /// deleted by the store; both yield `Unauthenticated`. A secure store
    /// read failure is returned with the state left `Unauthenticated`.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<SessionState> {
        let _guard = self.write_lock.lock().await;

        let restored = match self.token_store.load().await {
            Ok(Some(token)) if token.is_expired_at(self.clock.now()) => {
                info!(expires_at = ?token.expires_at(), "Persisted token expired, discarding");
                self.token_store.clear().await?;
                SessionState::Unauthenticated
            }
            Ok(Some(token)) => {
                info!(token_type = token.token_type(), "Session restored");
                SessionState::Authenticated(token)
            }
            Ok(None) => SessionState::Unauthenticated,
            Err(AuthError::TokenCorrupted(reason)) => {
                warn!(%reason, "Discarded corrupted session token");
                SessionState::Unauthenticated
            }
            Err(e) => {
                self.state.send_replace(SessionState::Unauthenticated);
                return Err(e);
            }
        };

        self.state.send_replace(restored.clone());
        Ok(restored)
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Token to attach to a gateway call. `None` when signed out or when the
    /// token has passed its expiry.
    pub fn access_token(&self) -> Option<AccessToken> {
        let state = self.state.borrow();
        state
            .access_token()
            .filter(|token| !token.is_expired_at(self.clock.now()))
            .cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that observes every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Persist `token`, then publish `Authenticated`.
    ///
    /// Nothing is published if persisting fails.
    #[instrument(skip(self, token))]
    pub async fn set_authenticated(&self, token: AccessToken) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.token_store.store(&token).await?;
        self.state.send_replace(SessionState::Authenticated(token));
        debug!("Session authenticated");
        Ok(())
    }

    /// Token for an outgoing call.
    ///
    /// A session whose token has passed its expiry is expired in place, so
    /// observers see `Unauthenticated` and `SessionExpired` is emitted.
    pub async fn active_token(&self) -> Result<Option<AccessToken>> {
        let current = self.state.borrow().access_token().cloned();
        match current {
            Some(token) if token.is_expired_at(self.clock.now()) => {
                self.expire_token(&token, "access token expired").await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Publish `Unauthenticated`, then delete the persisted token.
    ///
    /// Returns whether a session was active. A delete failure is returned
    /// after the state has already transitioned.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        self.clear_locked().await
    }

    /// The gateway rejected the token: clear the session and emit
    /// `SessionExpired`.
    #[instrument(skip(self))]
    pub async fn expire(&self, reason: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.expire_locked(reason).await?;
        Ok(())
    }

    /// Like [`expire`](Self::expire), but only while the session still holds
    /// `rejected`. A token published by a later sign-in is left alone.
    ///
    /// Returns whether the session was expired.
    #[instrument(skip(self, rejected))]
    pub async fn expire_token(&self, rejected: &AccessToken, reason: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let still_current = self.state.borrow().access_token() == Some(rejected);
        if !still_current {
            debug!(reason, "Rejected token already replaced, keeping session");
            return Ok(false);
        }
        self.expire_locked(reason).await
    }

    async fn clear_locked(&self) -> Result<bool> {
        let previous = self.state.send_replace(SessionState::Unauthenticated);
        self.token_store.clear().await?;
        Ok(previous.is_authenticated())
    }

    async fn expire_locked(&self, reason: &str) -> Result<bool> {
        let was_authenticated = self.clear_locked().await?;
        if was_authenticated {
            warn!(reason, "Session expired");
            let _ = self
                .event_bus
                .emit(CoreEvent::Auth(AuthEvent::SessionExpired {
                    reason: reason.to_string(),
                }));
        }
        Ok(was_authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySecureStore;
    use crate::token_store::ACCESS_TOKEN_KEY;
    use bridge_traits::storage::SecureStore;
    use bridge_traits::time::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        secure_store: Arc<MemorySecureStore>,
        clock: Arc<FixedClock>,
        event_bus: EventBus,
        session: SessionManager,
    }

    fn fixture() -> Fixture {
        let secure_store = Arc::new(MemorySecureStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let event_bus = EventBus::new(16);
        let session = SessionManager::new(
            TokenStore::new(secure_store.clone()),
            event_bus.clone(),
            clock.clone(),
        );
        Fixture {
            secure_store,
            clock,
            event_bus,
            session,
        }
    }

    fn token_valid_for(clock: &FixedClock, minutes: i64) -> AccessToken {
        AccessToken::new(
            "at-1",
            "Bearer",
            Some(clock.now() + Duration::minutes(minutes)),
        )
    }

    #[tokio::test]
    async fn test_starts_unauthenticated() {
        let f = fixture();
        assert_eq!(f.session.current(), SessionState::Unauthenticated);
        assert!(f.session.access_token().is_none());
    }

    #[tokio::test]
    async fn test_restore_valid_token() {
        let f = fixture();
        let token = token_valid_for(&f.clock, 30);
        TokenStore::new(f.secure_store.clone())
            .store(&token)
            .await
            .unwrap();

        let state = f.session.restore().await.unwrap();
        assert_eq!(state, SessionState::Authenticated(token.clone()));
        assert_eq!(f.session.access_token(), Some(token));
    }

    #[tokio::test]
    async fn test_restore_deletes_expired_token() {
        let f = fixture();
        let token = AccessToken::new("old", "Bearer", Some(f.clock.now() - Duration::seconds(1)));
        TokenStore::new(f.secure_store.clone())
            .store(&token)
            .await
            .unwrap();

        let state = f.session.restore().await.unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
        assert!(!f.secure_store.has_secret(ACCESS_TOKEN_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_corrupted_token() {
        let f = fixture();
        f.secure_store
            .set_secret(ACCESS_TOKEN_KEY, b"garbage")
            .await
            .unwrap();

        let state = f.session.restore().await.unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_set_authenticated_publishes_after_persist() {
        let f = fixture();
        let mut rx = f.session.subscribe();
        let token = token_valid_for(&f.clock, 60);

        f.session.set_authenticated(token.clone()).await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Authenticated(token));
        assert!(f.secure_store.has_secret(ACCESS_TOKEN_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_authenticated_failure_publishes_nothing() {
        let f = fixture();
        f.secure_store.fail_writes(true);
        let rx = f.session.subscribe();

        let result = f.session.set_authenticated(token_valid_for(&f.clock, 60)).await;
        assert!(matches!(result, Err(AuthError::SecureStorage(_))));
        assert!(!rx.has_changed().unwrap());
        assert!(!f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_access_token_hidden_once_expired() {
        let f = fixture();
        f.session
            .set_authenticated(token_valid_for(&f.clock, 5))
            .await
            .unwrap();
        assert!(f.session.access_token().is_some());

        f.clock.advance(Duration::minutes(6));
        assert!(f.session.access_token().is_none());
    }

    #[tokio::test]
    async fn test_clear_transitions_before_delete_error() {
        let f = fixture();
        f.session
            .set_authenticated(token_valid_for(&f.clock, 60))
            .await
            .unwrap();
        f.secure_store.fail_deletes(true);

        let result = f.session.clear().await;
        assert!(matches!(result, Err(AuthError::SecureStorage(_))));
        assert_eq!(f.session.current(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_expire_emits_event() {
        let f = fixture();
        let mut events = f.event_bus.subscribe();
        f.session
            .set_authenticated(token_valid_for(&f.clock, 60))
            .await
            .unwrap();

        f.session.expire("gateway returned 401").await.unwrap();

        assert!(!f.session.is_authenticated());
        match events.recv().await.unwrap() {
            CoreEvent::Auth(AuthEvent::SessionExpired { reason }) => {
                assert_eq!(reason, "gateway returned 401");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_active_token_expires_stale_session() {
        let f = fixture();
        let mut events = f.event_bus.subscribe();
        f.session
            .set_authenticated(token_valid_for(&f.clock, 5))
            .await
            .unwrap();

        f.clock.advance(Duration::minutes(10));

        assert!(f.session.active_token().await.unwrap().is_none());
        assert!(!f.session.is_authenticated());
        assert_eq!(f.session.current(), SessionState::Unauthenticated);
        assert!(!f.secure_store.has_secret(ACCESS_TOKEN_KEY).await.unwrap());
        match events.recv().await.unwrap() {
            CoreEvent::Auth(AuthEvent::SessionExpired { reason }) => {
                assert_eq!(reason, "access token expired");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_active_token_returns_valid_token() {
        let f = fixture();
        let token = token_valid_for(&f.clock, 30);
        f.session.set_authenticated(token.clone()).await.unwrap();

        assert_eq!(f.session.active_token().await.unwrap(), Some(token));
        assert!(f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_expire_token_keeps_newer_session() {
        let f = fixture();
        let mut events = f.event_bus.subscribe();
        let old = token_valid_for(&f.clock, 30);
        let newer = AccessToken::new("at-2", "Bearer", Some(f.clock.now() + Duration::hours(1)));
        f.session.set_authenticated(old.clone()).await.unwrap();
        f.session.set_authenticated(newer.clone()).await.unwrap();

        let expired = f
            .session
            .expire_token(&old, "gateway returned 401")
            .await
            .unwrap();

        assert!(!expired);
        assert_eq!(f.session.current(), SessionState::Authenticated(newer));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_expire_token_clears_matching_session() {
        let f = fixture();
        let token = token_valid_for(&f.clock, 30);
        f.session.set_authenticated(token.clone()).await.unwrap();

        assert!(f
            .session
            .expire_token(&token, "gateway returned 401")
            .await
            .unwrap());
        assert!(!f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_expire_when_signed_out_is_silent() {
        let f = fixture();
        let mut events = f.event_bus.subscribe();

        f.session.expire("stale request").await.unwrap();
        assert!(events.try_recv().is_err());
    }
}
