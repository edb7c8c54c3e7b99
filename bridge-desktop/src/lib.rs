//! # Desktop Bridge Implementations
//!
//! Default implementations of the EvERP bridge traits for desktop builds
//! (macOS, Windows, Linux) and local development:
//! - `HttpClient` using `reqwest` (10 s connect, 15 s read, no retry)
//! - `SecureStore` using the `keyring` crate
//! - `SettingsStore` using an SQLite-backed key-value table
//! - `BrowserLauncher` using the default system browser
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore, SystemBrowserLauncher};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http = ReqwestHttpClient::new()?;
//!     let settings = SqliteSettingsStore::open_default().await?;
//!     let browser = SystemBrowserLauncher::new();
//!     // hand to CoreConfig::builder()
//!     Ok(())
//! }
//! ```

mod browser;
mod http;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use browser::SystemBrowserLauncher;
pub use http::{ReqwestHttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use settings::SqliteSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
