//! In-memory bridge fakes shared by the unit tests.

use async_trait::async_trait;
use bridge_traits::browser::{BrowserLauncher, BrowserSurface};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::SecureStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MemorySecureStore {
    storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("keystore locked".into()));
        }
        self.storage
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.storage.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("keystore locked".into()));
        }
        self.storage.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.storage.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.storage.lock().await.clear();
        Ok(())
    }
}

/// Records opened URLs; optionally refuses to open anything.
pub struct RecordingLauncher {
    surface: BrowserSurface,
    fail: bool,
    pub opened: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn new(surface: BrowserSurface) -> Self {
        Self {
            surface,
            fail: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(surface: BrowserSurface) -> Self {
        Self {
            fail: true,
            ..Self::new(surface)
        }
    }

    pub async fn opened(&self) -> Vec<String> {
        self.opened.lock().await.clone()
    }
}

#[async_trait]
impl BrowserLauncher for RecordingLauncher {
    fn surface(&self) -> BrowserSurface {
        self.surface
    }

    async fn open_url(&self, url: &str) -> BridgeResult<()> {
        if self.fail {
            return Err(BridgeError::NotAvailable(format!("{} unavailable", self.surface)));
        }
        self.opened.lock().await.push(url.to_string());
        Ok(())
    }
}
