//! # Gateway Module
//!
//! Typed, authenticated access to the EvERP gateway API and the closed error
//! taxonomy every data call reports through.
//!
//! - [`GatewayClient`]: `get_json` / `post_json` / `delete` plus the user profile
//! - [`ApiError`]: `Network | Timeout | Unauthorized | Forbidden | NotFound |
//!   Validation | Server | Unknown`, each with a user-facing message and a
//!   retryability flag
//!
//! A 401 from any endpoint expires the session held by `core-auth`.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GatewayClient, USER_INFO_CACHE_KEY, USER_INFO_PATH};
pub use error::{ApiError, Result};
pub use types::UserInfo;
