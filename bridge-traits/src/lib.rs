//! # Host Bridge Traits
//!
//! Capability traits the EvERP core needs from its host platform.
//!
//! The Android app implements these over Custom Tabs, the Android Keystore,
//! SharedPreferences and OkHttp; `bridge-desktop` provides implementations for
//! desktop builds and local development.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-shot HTTP with connect/read timeouts
//! - [`SecureStore`](storage::SecureStore) - Encrypted credential persistence
//! - [`SettingsStore`](storage::SettingsStore) - Plain key-value persistence
//! - [`BrowserLauncher`](browser::BrowserLauncher) - Presents the authorization page
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and report transport timeouts and
//! connection failures through their dedicated variants so the core can
//! classify them.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the core shares them as
//! `Arc<dyn Trait>` across tasks.

pub mod browser;
pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use browser::{BrowserLauncher, BrowserSurface};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{SecureStore, SettingsStore};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
