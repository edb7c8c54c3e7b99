//! Persistence Abstractions
//!
//! Two stores back the client: an encrypted store for credentials and a plain
//! key-value store for preferences and cached responses.

use async_trait::async_trait;

use crate::error::Result;

/// Encrypted credential storage.
///
/// Host implementations map onto the platform keystore:
/// - Android: EncryptedSharedPreferences backed by the Android Keystore
/// - Desktop: OS keychain / Secret Service
///
/// Implementations must encrypt values at rest and must never log them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn remember(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("everp.session.access_token", token.as_bytes()).await
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret, replacing any previous value under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }

    /// List all secret keys (without values)
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Delete every secret owned by the application.
    async fn clear_all(&self) -> Result<()>;
}

/// Plain key-value settings storage.
///
/// Android hosts back this with SharedPreferences / DataStore; the desktop
/// implementation uses SQLite. Values are not encrypted, so nothing
/// credential-like belongs here.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn has_key(&self, key: &str) -> Result<bool>;

    async fn list_keys(&self) -> Result<Vec<String>>;

    async fn clear_all(&self) -> Result<()>;
}
