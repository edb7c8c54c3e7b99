//! # Authentication Module
//!
//! OAuth 2.0 Authorization Code + PKCE sign-in against the EvERP
//! authorization server, and the session that results from it.
//!
//! ## Overview
//!
//! - [`pkce`]: verifier/challenge and `state` generation
//! - [`oauth`]: authorization URL, redirect verification, token and logout calls
//! - [`manager`]: attempt lifecycle and auth events
//! - [`token_store`]: the access token in the host secure store
//! - [`session`]: the observable session state
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{AuthManager, SessionManager, TokenStore};
//! use core_runtime::config::CoreConfig;
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//!
//! # async fn example(config: CoreConfig, deep_link: String) -> core_auth::Result<()> {
//! let events = EventBus::default();
//! let session = Arc::new(SessionManager::new(
//!     TokenStore::new(config.secure_store.clone()),
//!     events.clone(),
//!     config.clock.clone(),
//! ));
//! session.restore().await?;
//!
//! let auth = AuthManager::from_config(&config, session.clone(), events);
//! auth.begin_login().await?;
//! // ...later, when the host receives the deep link:
//! auth.handle_redirect(&deep_link).await?;
//! assert!(session.is_authenticated());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod manager;
pub mod oauth;
pub mod pkce;
pub mod session;
pub mod token_store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{AuthError, Result};
pub use manager::{AuthManager, LoginLaunch};
pub use oauth::{verify_redirect, AuthorizationRequest, OAuthClient};
pub use pkce::{generate_state, PkcePair};
pub use session::SessionManager;
pub use token_store::{TokenStore, ACCESS_TOKEN_KEY};
pub use types::{AccessToken, LogoutOutcome, SessionState, TokenGrant};
