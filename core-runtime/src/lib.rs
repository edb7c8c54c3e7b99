//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the EvERP core crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Panic hook routing fatal errors to the host

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod panic;

pub use error::{Error, Result};
