//! Secure Token Storage
//!
//! Persists the session's [`AccessToken`] in the host [`SecureStore`]
//! (Keystore-backed preferences on Android, the OS keyring on desktop).
//!
//! - The token is serialized to JSON under a single fixed key
//! - Token values never reach logs or error messages
//! - A payload that fails to decode is deleted on read
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{AccessToken, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! token_store
//!     .store(&AccessToken::new("access_token_value", "Bearer", None))
//!     .await?;
//! let restored = token_store.load().await?;
//! assert!(restored.is_some());
//!
//! token_store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::AccessToken;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure store key holding the serialized access token.
pub const ACCESS_TOKEN_KEY: &str = "everp.session.access_token";

/// Secure storage for the session access token.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    /// Persist `token`, replacing any previous one.
    pub async fn store(&self, token: &AccessToken) -> Result<()> {
        let payload = serde_json::to_vec(token)
            .map_err(|e| AuthError::SecureStorage(format!("Failed to serialize token: {}", e)))?;

        self.secure_store
            .set_secret(ACCESS_TOKEN_KEY, &payload)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist access token");
                AuthError::from_storage(e)
            })?;

        debug!(
            token_type = token.token_type(),
            expires_at = ?token.expires_at(),
            "Access token persisted"
        );
        Ok(())
    }

    /// Read the persisted token, if any.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenCorrupted`] when the stored payload cannot be
    /// decoded. The payload has already been deleted when this is returned.
    pub async fn load(&self) -> Result<Option<AccessToken>> {
        let payload = self
            .secure_store
            .get_secret(ACCESS_TOKEN_KEY)
            .await
            .map_err(AuthError::from_storage)?;

        let Some(payload) = payload else {
            debug!("No persisted access token");
            return Ok(None);
        };

        match serde_json::from_slice::<AccessToken>(&payload) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(error = %e, "Persisted access token is corrupted, deleting it");
                if let Err(delete_error) = self.secure_store.delete_secret(ACCESS_TOKEN_KEY).await {
                    warn!(error = %delete_error, "Failed to delete corrupted access token");
                }
                Err(AuthError::TokenCorrupted(e.to_string()))
            }
        }
    }

    /// Delete the persisted token. Deleting a missing token succeeds.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(ACCESS_TOKEN_KEY)
            .await
            .map_err(AuthError::from_storage)?;
        info!("Access token deleted");
        Ok(())
    }

    pub async fn exists(&self) -> Result<bool> {
        self.secure_store
            .has_secret(ACCESS_TOKEN_KEY)
            .await
            .map_err(AuthError::from_storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySecureStore;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_store_and_load() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::new()));
        let expires_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let token = AccessToken::new("at-1", "Bearer", Some(expires_at));

        store.store(&token).await.unwrap();
        assert!(store.exists().await.unwrap());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, token);
    }

    #[tokio::test]
    async fn test_store_replaces_previous_token() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::new()));
        store
            .store(&AccessToken::new("old", "Bearer", None))
            .await
            .unwrap();
        store
            .store(&AccessToken::new(
                "new",
                "Bearer",
                Some(Utc::now() + Duration::hours(1)),
            ))
            .await
            .unwrap();

        assert_eq!(store.load().await.unwrap().unwrap().secret(), "new");
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::new()));
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_payload_is_deleted() {
        let backing = Arc::new(MemorySecureStore::new());
        backing
            .set_secret(ACCESS_TOKEN_KEY, b"{not json")
            .await
            .unwrap();

        let store = TokenStore::new(backing.clone());
        assert!(matches!(
            store.load().await,
            Err(AuthError::TokenCorrupted(_))
        ));
        assert!(!store.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::new()));
        store
            .store(&AccessToken::new("at-1", "Bearer", None))
            .await
            .unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_secure_storage() {
        let backing = Arc::new(MemorySecureStore::new());
        backing.fail_writes(true);

        let store = TokenStore::new(backing);
        let result = store.store(&AccessToken::new("at-1", "Bearer", None)).await;
        assert!(matches!(result, Err(AuthError::SecureStorage(_))));
    }
}
