//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] (bridge handles included) into
//! the auth and gateway layers and hands the host a single cloneable
//! [`CoreService`]. Desktop builds typically enable the `desktop-shims`
//! feature, which lets [`CoreConfigBuilder`](core_runtime::config::CoreConfigBuilder)
//! fill in the adapters from `bridge-desktop`; mobile hosts inject their own.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder().from_env().build()?;
//! let core = CoreService::bootstrap(config).await?;
//!
//! if !core.session().is_authenticated() {
//!     core.auth().begin_login().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_auth::{AuthManager, LogoutOutcome, SessionManager, SessionState, TokenStore};
use core_gateway::GatewayClient;
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::panic::install_panic_hook;
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<Inner>,
}

struct Inner {
    events: EventBus,
    session: Arc<SessionManager>,
    auth: AuthManager,
    gateway: GatewayClient,
}

impl CoreService {
    /// Wire every component from `config` and restore the persisted session.
    ///
    /// A secure store that cannot be read does not fail startup; the session
    /// simply starts `Unauthenticated`.
    #[instrument(skip(config), fields(gateway = %config.gateway_base_url))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        Self::bootstrap_with_events(config, EventBus::default()).await
    }

    /// Like [`bootstrap`](Self::bootstrap), publishing on an existing bus.
    pub async fn bootstrap_with_events(config: CoreConfig, events: EventBus) -> Result<Self> {
        config.validate()?;

        let session = Arc::new(SessionManager::new(
            TokenStore::new(config.secure_store.clone()),
            events.clone(),
            config.clock.clone(),
        ));
        match session.restore().await {
            Ok(state) => info!(session = %state, "Session restored"),
            Err(e) => warn!(error = %e, "Could not read persisted session, starting signed out"),
        }

        let auth = AuthManager::from_config(&config, session.clone(), events.clone());
        let gateway = GatewayClient::from_config(&config, session.clone());

        info!("Core service ready");
        Ok(Self {
            inner: Arc::new(Inner {
                events,
                session,
                auth,
                gateway,
            }),
        })
    }

    pub fn auth(&self) -> &AuthManager {
        &self.inner.auth
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.inner.session
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.current()
    }

    /// Route panics to this service's event bus.
    pub fn install_panic_hook(&self) {
        install_panic_hook(self.inner.events.clone());
    }

    /// Sign out and drop cached gateway data.
    ///
    /// The session is `Unauthenticated` and the cache cleared even when an
    /// error is returned.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<LogoutOutcome> {
        let outcome = self.inner.auth.logout().await;
        if let Err(e) = self.inner.gateway.clear_cache().await {
            warn!(error = %e, "Failed to clear gateway cache on logout");
        }
        Ok(outcome?)
    }
}

/// Initialize logging, forwarding to the host sink from `config` when
/// `logging` does not name one already.
pub fn init_logging_for(config: &CoreConfig, logging: LoggingConfig) -> Result<()> {
    let logging = match &config.logger_sink {
        Some(sink) if logging.logger_sink.is_none() => logging.with_logger_sink(sink.clone()),
        _ => logging,
    };
    init_logging(logging)?;
    Ok(())
}
