//! Browser launcher backed by the desktop's default browser

use async_trait::async_trait;
use bridge_traits::{
    browser::{BrowserLauncher, BrowserSurface},
    error::{BridgeError, Result},
};
use tracing::{debug, warn};

/// Opens authorization pages in the user's default browser.
#[derive(Debug, Default, Clone)]
pub struct SystemBrowserLauncher;

impl SystemBrowserLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserLauncher for SystemBrowserLauncher {
    fn surface(&self) -> BrowserSurface {
        BrowserSurface::SystemBrowser
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        let owned = url.to_string();
        // webbrowser may block while spawning the browser process
        let result = tokio::task::spawn_blocking(move || webbrowser::open(&owned))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Browser task failed: {}", e)))?;

        match result {
            Ok(()) => {
                debug!("Opened system browser");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(error = %e, "No system browser available");
                Err(BridgeError::NotAvailable(format!(
                    "No system browser available: {}",
                    e
                )))
            }
            Err(e) => {
                warn!(error = %e, "Failed to open system browser");
                Err(BridgeError::OperationFailed(format!(
                    "Failed to open browser: {}",
                    e
                )))
            }
        }
    }
}
