//! Browser Surface Abstraction
//!
//! The authorization step of the login flow happens in a browser owned by the
//! host: a Custom Tab / system browser where available, an embedded web view
//! otherwise. The core only asks for a URL to be shown; the redirect comes back
//! to the core through the host's deep-link handling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Kind of surface a launcher presents the authorization page on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserSurface {
    /// System browser or Custom Tab. Shares cookies with the user's browser.
    SystemBrowser,
    /// In-app web view; used when no browser can handle the intent.
    EmbeddedWebView,
}

impl fmt::Display for BrowserSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserSurface::SystemBrowser => write!(f, "system-browser"),
            BrowserSurface::EmbeddedWebView => write!(f, "embedded-webview"),
        }
    }
}

/// Opens an authorization URL on a host browser surface.
///
/// `open_url` returns once the surface has been launched; it does not wait for
/// the user to finish signing in.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::browser::BrowserLauncher;
///
/// async fn show(launcher: &dyn BrowserLauncher, url: &str) -> Result<()> {
///     launcher.open_url(url).await
/// }
/// ```
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Surface this launcher presents on.
    fn surface(&self) -> BrowserSurface;

    /// Launch the surface pointed at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotAvailable`](crate::error::BridgeError::NotAvailable)
    /// when no application can handle the URL, or
    /// [`BridgeError::OperationFailed`](crate::error::BridgeError::OperationFailed)
    /// when launching fails.
    async fn open_url(&self, url: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_display() {
        assert_eq!(BrowserSurface::SystemBrowser.to_string(), "system-browser");
        assert_eq!(
            BrowserSurface::EmbeddedWebView.to_string(),
            "embedded-webview"
        );
    }
}
