//! # Core Configuration Module
//!
//! Builder-based configuration for the EvERP core: where the authorization
//! server and the gateway live, how the client identifies itself, network
//! timeouts, and the host bridges every component runs on.
//!
//! ## Required values
//!
//! - auth server base URL, client id, redirect URI
//! - gateway base URL
//!
//! ## Bridges
//!
//! `HttpClient`, `SecureStore`, `SettingsStore` and at least one
//! `BrowserLauncher` are required. With the `desktop-shims` feature the desktop
//! implementations are injected for any that are missing; without it `build()`
//! fails with [`Error::CapabilityMissing`] naming what to provide.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .auth_base_url("https://auth.everp.example")
//!     .client_id("everp-mobile")
//!     .redirect_uri("everp://callback")
//!     .gateway_base_url("https://gateway.everp.example")
//!     .build()?;
//! ```
//!
//! Values can be seeded from the environment with
//! [`CoreConfigBuilder::from_env`] (`EVERP_AUTH_URL`, `EVERP_CLIENT_ID`,
//! `EVERP_REDIRECT_URI`, `EVERP_SCOPES`, `EVERP_GATEWAY_URL`).

use crate::error::{Error, Result};
use bridge_traits::{
    BrowserLauncher, Clock, HttpClient, LoggerSink, SecureStore, SettingsStore, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_AUTHORIZE_PATH: &str = "/oauth2/authorize";
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";
pub const DEFAULT_LOGOUT_PATH: &str = "/logout";
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile"];

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Random bytes behind a PKCE verifier; 64 bytes encode to 86 characters.
pub const DEFAULT_VERIFIER_BYTES: usize = 64;
/// Smallest byte length whose encoding reaches the 43-character minimum.
pub const MIN_VERIFIER_BYTES: usize = 32;
/// Largest byte length whose encoding stays within 128 characters.
pub const MAX_VERIFIER_BYTES: usize = 96;

/// How long a launched authorization attempt stays redeemable.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(600);

/// OAuth2 client settings for the authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthServerConfig {
    pub base_url: Url,
    pub authorize_path: String,
    pub token_path: String,
    pub logout_path: String,
    pub client_id: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub verifier_bytes: usize,
    pub authorization_timeout: Duration,
}

impl AuthServerConfig {
    pub fn authorize_url(&self) -> Url {
        join_endpoint(&self.base_url, &self.authorize_path)
    }

    pub fn token_url(&self) -> Url {
        join_endpoint(&self.base_url, &self.token_path)
    }

    pub fn logout_url(&self) -> Url {
        join_endpoint(&self.base_url, &self.logout_path)
    }

    /// Scopes joined with single spaces, as sent in the `scope` parameter.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Fixed per-call network timeouts. There is no retry layer on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Default for NetworkTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            read: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Joins `path` onto `base`, keeping any path prefix `base` already has.
pub fn join_endpoint(base: &Url, path: &str) -> Url {
    let mut joined = base.clone();
    let prefix = base.path().trim_end_matches('/');
    let suffix = path.trim_start_matches('/');
    joined.set_path(&format!("{}/{}", prefix, suffix));
    joined.set_query(None);
    joined.set_fragment(None);
    joined
}

/// Core configuration.
///
/// Built with [`CoreConfigBuilder`]; every instance has passed
/// [`CoreConfig::validate`].
#[derive(Clone)]
pub struct CoreConfig {
    pub auth: AuthServerConfig,
    pub gateway_base_url: Url,
    pub timeouts: NetworkTimeouts,

    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
    pub settings_store: Arc<dyn SettingsStore>,
    /// Tried in order when launching the authorization page.
    pub browser_launchers: Vec<Arc<dyn BrowserLauncher>>,
    pub clock: Arc<dyn Clock>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("auth", &self.auth)
            .field("gateway_base_url", &self.gateway_base_url.as_str())
            .field("timeouts", &self.timeouts)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "browser_launchers",
                &self
                    .browser_launchers
                    .iter()
                    .map(|launcher| launcher.surface())
                    .collect::<Vec<_>>(),
            )
            .field("logger_sink", &self.logger_sink.is_some())
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks value ranges and URL shapes.
    pub fn validate(&self) -> Result<()> {
        require_http_url("Auth server base URL", &self.auth.base_url)?;
        require_http_url("Gateway base URL", &self.gateway_base_url)?;

        if self.auth.client_id.trim().is_empty() {
            return Err(Error::Config("Client id cannot be empty".to_string()));
        }

        if self.auth.redirect_uri.host_str().map_or(true, str::is_empty) {
            return Err(Error::Config(format!(
                "Redirect URI '{}' must have a host (e.g. everp://callback)",
                self.auth.redirect_uri
            )));
        }

        if self.auth.scopes.is_empty() {
            return Err(Error::Config("At least one scope is required".to_string()));
        }

        if let Some(scope) = self
            .auth
            .scopes
            .iter()
            .find(|s| s.is_empty() || s.contains(char::is_whitespace))
        {
            return Err(Error::Config(format!(
                "Scope '{}' must be a single non-empty token",
                scope
            )));
        }

        if !(MIN_VERIFIER_BYTES..=MAX_VERIFIER_BYTES).contains(&self.auth.verifier_bytes) {
            return Err(Error::Config(format!(
                "PKCE verifier length must be between {} and {} bytes, got {}",
                MIN_VERIFIER_BYTES, MAX_VERIFIER_BYTES, self.auth.verifier_bytes
            )));
        }

        if self.auth.authorization_timeout.is_zero() {
            return Err(Error::Config(
                "Authorization timeout must be greater than zero".to_string(),
            ));
        }

        if self.timeouts.connect.is_zero() || self.timeouts.read.is_zero() {
            return Err(Error::Config(
                "Network timeouts must be greater than zero".to_string(),
            ));
        }

        if self.browser_launchers.is_empty() {
            return Err(browser_missing_error());
        }

        Ok(())
    }
}

fn require_http_url(name: &str, url: &Url) -> Result<()> {
    match url.scheme() {
        "https" | "http" if url.host_str().is_some() => Ok(()),
        _ => Err(Error::Config(format!(
            "{} '{}' must be an http(s) URL",
            name, url
        ))),
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| Error::Config(format!("{} '{}' is invalid: {}", name, raw, e)))
}

// ============================================================================
// Capability defaults
// ============================================================================

fn browser_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "BrowserLauncher".to_string(),
        message: "At least one BrowserLauncher is required to show the authorization page. \
                 Android: inject a Custom Tabs launcher and a WebView fallback. \
                 Desktop: enable the 'desktop-shims' feature for the system browser launcher."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Android: inject an OkHttp-backed adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for token persistence. \
                 Desktop: enable the 'desktop-shims' feature to use KeyringSecureStore. \
                 Android: inject a Keystore-backed store."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for cached profile data. \
                 Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore. \
                 Android: inject a SharedPreferences/DataStore adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeouts: NetworkTimeouts) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeouts(timeouts.connect, timeouts.read)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeouts: NetworkTimeouts) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    Ok(Arc::new(KeyringSecureStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let path = SqliteSettingsStore::default_path()
        .map_err(|e| Error::Internal(format!("No location for default SettingsStore: {}", e)))?;

    // build() is synchronous; open the pool on a private runtime
    let open = move || -> Result<SqliteSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create runtime for default SettingsStore: {}",
                    e
                ))
            })?;

        runtime.block_on(SqliteSettingsStore::new(path)).map_err(|e| {
            Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
        })
    };

    let store = match Handle::try_current() {
        // block_on inside a runtime panics; hop to a plain thread
        Ok(_) => thread::spawn(open).join().map_err(|_| {
            Error::Internal("Thread panicked while creating default SettingsStore".to_string())
        })??,
        Err(_) => open()?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_browser_launchers() -> Vec<Arc<dyn BrowserLauncher>> {
    vec![Arc::new(bridge_desktop::SystemBrowserLauncher::new())]
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_browser_launchers() -> Vec<Arc<dyn BrowserLauncher>> {
    Vec::new()
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    auth_base_url: Option<String>,
    authorize_path: Option<String>,
    token_path: Option<String>,
    logout_path: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    scopes: Option<Vec<String>>,
    verifier_bytes: Option<usize>,
    authorization_timeout: Option<Duration>,
    gateway_base_url: Option<String>,
    timeouts: Option<NetworkTimeouts>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    browser_launchers: Vec<Arc<dyn BrowserLauncher>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl CoreConfigBuilder {
    /// Seed values from `EVERP_*` environment variables.
    ///
    /// Unset variables leave the corresponding value untouched. `EVERP_SCOPES`
    /// is space- or comma-separated.
    pub fn from_env(self) -> Self {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("EVERP_AUTH_URL") {
            self.auth_base_url = Some(value);
        }
        if let Some(value) = lookup("EVERP_CLIENT_ID") {
            self.client_id = Some(value);
        }
        if let Some(value) = lookup("EVERP_REDIRECT_URI") {
            self.redirect_uri = Some(value);
        }
        if let Some(value) = lookup("EVERP_SCOPES") {
            self.scopes = Some(
                value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(value) = lookup("EVERP_GATEWAY_URL") {
            self.gateway_base_url = Some(value);
        }
        self
    }

    /// Base URL of the authorization server, e.g. `https://auth.everp.example`.
    pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = Some(url.into());
        self
    }

    /// Overrides `/oauth2/authorize`, `/oauth2/token` and `/logout`.
    pub fn auth_endpoints(
        mut self,
        authorize: impl Into<String>,
        token: impl Into<String>,
        logout: impl Into<String>,
    ) -> Self {
        self.authorize_path = Some(authorize.into());
        self.token_path = Some(token.into());
        self.logout_path = Some(logout.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Random bytes per PKCE verifier. Default 64; allowed 32..=96.
    pub fn verifier_bytes(mut self, bytes: usize) -> Self {
        self.verifier_bytes = Some(bytes);
        self
    }

    /// Maximum age of a login attempt when its redirect arrives. Default 10 minutes.
    pub fn authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = Some(timeout);
        self
    }

    pub fn gateway_base_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_base_url = Some(url.into());
        self
    }

    pub fn timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.timeouts = Some(NetworkTimeouts { connect, read });
        self
    }

    /// If not provided, the desktop default (reqwest) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Appends a launcher. Launchers are tried in the order they are added, so
    /// add the system browser / Custom Tab first and the web view last.
    pub fn browser_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.browser_launchers.push(launcher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for missing or malformed values
    /// - [`Error::CapabilityMissing`] for bridges that have no default
    pub fn build(self) -> Result<CoreConfig> {
        let auth_base_url = self.auth_base_url.ok_or_else(|| {
            Error::Config(
                "Auth server base URL is required. Use .auth_base_url() or EVERP_AUTH_URL."
                    .to_string(),
            )
        })?;
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config("Client id is required. Use .client_id() or EVERP_CLIENT_ID.".to_string())
        })?;
        let redirect_uri = self.redirect_uri.ok_or_else(|| {
            Error::Config(
                "Redirect URI is required. Use .redirect_uri() or EVERP_REDIRECT_URI.".to_string(),
            )
        })?;
        let gateway_base_url = self.gateway_base_url.ok_or_else(|| {
            Error::Config(
                "Gateway base URL is required. Use .gateway_base_url() or EVERP_GATEWAY_URL."
                    .to_string(),
            )
        })?;

        let auth = AuthServerConfig {
            base_url: parse_url("Auth server base URL", &auth_base_url)?,
            authorize_path: self
                .authorize_path
                .unwrap_or_else(|| DEFAULT_AUTHORIZE_PATH.to_string()),
            token_path: self
                .token_path
                .unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string()),
            logout_path: self
                .logout_path
                .unwrap_or_else(|| DEFAULT_LOGOUT_PATH.to_string()),
            client_id,
            redirect_uri: parse_url("Redirect URI", &redirect_uri)?,
            scopes: self
                .scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
            verifier_bytes: self.verifier_bytes.unwrap_or(DEFAULT_VERIFIER_BYTES),
            authorization_timeout: self
                .authorization_timeout
                .unwrap_or(DEFAULT_AUTHORIZATION_TIMEOUT),
        };
        let timeouts = self.timeouts.unwrap_or_default();

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(timeouts)?,
        };
        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store()?,
        };
        let browser_launchers = if self.browser_launchers.is_empty() {
            provide_default_browser_launchers()
        } else {
            self.browser_launchers
        };

        let config = CoreConfig {
            auth,
            gateway_base_url: parse_url("Gateway base URL", &gateway_base_url)?,
            timeouts,
            http_client,
            secure_store,
            settings_store,
            browser_launchers,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
        };

        config.validate()?;
        Ok(config)
    }
}
