//! Workspace placeholder crate.
//!
//! Re-exports the EvERP core façade behind the workspace feature flags so a
//! host application can depend on `everp-workspace` alone and enable
//! `desktop-shims` without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{init_logging_for, CoreError, CoreService, Result};
