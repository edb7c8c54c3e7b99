//! Secure Credential Storage using OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Default keychain service name.
pub const DEFAULT_SERVICE_NAME: &str = "everp-mobile";

/// Entry holding the JSON list of keys written through this store.
const KEY_INDEX_ENTRY: &str = "__everp_key_index";

/// Keyring-based secure storage implementation
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// The OS keychains cannot enumerate entries per service, so the store keeps
/// its own key index in a dedicated entry. `list_keys` and `clear_all` work
/// from that index.
pub struct KeyringSecureStore {
    service_name: String,
    index_lock: Mutex<()>,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            index_lock: Mutex::new(()),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn get_entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(Self::map_keyring_error)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        match e {
            keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
                BridgeError::NotAvailable(format!("Keyring unavailable: {}", e))
            }
            other => BridgeError::OperationFailed(format!("Keyring error: {}", other)),
        }
    }

    fn read_index(&self) -> Result<BTreeSet<String>> {
        match self.get_entry(KEY_INDEX_ENTRY)?.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, "Keyring key index unreadable, starting fresh");
                BTreeSet::new()
            })),
            Err(keyring::Error::NoEntry) => Ok(BTreeSet::new()),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    fn write_index(&self, index: &BTreeSet<String>) -> Result<()> {
        let entry = self.get_entry(KEY_INDEX_ENTRY)?;
        if index.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(Self::map_keyring_error(e)),
            };
        }

        let json = serde_json::to_string(index).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode key index: {}", e))
        })?;
        entry.set_password(&json).map_err(Self::map_keyring_error)
    }

    fn delete_entry(&self, key: &str) -> Result<()> {
        match self.get_entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(key = key, "Deleted secret from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key = key, "Secret not found (already deleted)");
                Ok(())
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        if key == KEY_INDEX_ENTRY {
            return Err(BridgeError::OperationFailed(format!(
                "Key '{}' is reserved",
                key
            )));
        }

        // Keyring stores strings only
        let encoded = STANDARD.encode(value);
        self.get_entry(key)?
            .set_password(&encoded)
            .map_err(Self::map_keyring_error)?;

        let _guard = self.index_lock.lock().await;
        let mut index = self.read_index()?;
        if index.insert(key.to_string()) {
            self.write_index(&index)?;
        }

        debug!(key = key, "Stored secret in keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.get_entry(key)?.get_password() {
            Ok(encoded) => {
                let decoded = STANDARD.decode(&encoded).map_err(|e| {
                    error!(key = key, error = %e, "Failed to decode secret");
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;

                debug!(key = key, "Retrieved secret from keyring");
                Ok(Some(decoded))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.delete_entry(key)?;

        let _guard = self.index_lock.lock().await;
        let mut index = self.read_index()?;
        if index.remove(key) {
            self.write_index(&index)?;
        }
        Ok(())
    }

    async fn has_secret(&self, key: &str) -> Result<bool> {
        match self.get_entry(key)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let _guard = self.index_lock.lock().await;
        Ok(self.read_index()?.into_iter().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let index = self.read_index()?;
        for key in &index {
            self.delete_entry(key)?;
        }
        self.write_index(&BTreeSet::new())?;

        debug!(count = index.len(), "Cleared keyring secrets");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let store = KeyringSecureStore::new();
        assert_eq!(store.service_name(), "everp-mobile");

        let store = KeyringSecureStore::with_service_name("everp-test");
        assert_eq!(store.service_name(), "everp-test");
    }

    #[tokio::test]
    async fn test_index_key_is_reserved() {
        let store = KeyringSecureStore::with_service_name("everp-test-reserved");
        let result = store.set_secret(KEY_INDEX_ENTRY, b"x").await;
        assert!(matches!(result, Err(BridgeError::OperationFailed(_))));
    }

    #[tokio::test]
    async fn test_set_get_and_clear() {
        // Headless hosts may have no usable keyring; skip unless writes read back.
        let store = KeyringSecureStore::with_service_name("everp-test-roundtrip");
        let key = "everp.test.secret";

        if let Err(e) = store.set_secret(key, b"s3cr3t").await {
            println!("Keyring not available ({}), skipping test", e);
            return;
        }

        match store.get_secret(key).await {
            Ok(Some(value)) if value == b"s3cr3t".to_vec() => {}
            other => {
                println!("Keyring does not persist on this host ({:?}), skipping test", other);
                let _ = store.clear_all().await;
                return;
            }
        }

        let keys = store.list_keys().await.unwrap();
        assert!(keys.contains(&key.to_string()));

        store.clear_all().await.unwrap();
        assert_eq!(store.get_secret(key).await.unwrap(), None);
    }
}
