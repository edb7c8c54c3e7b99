//! Process-wide panic hook.
//!
//! A panic anywhere in the core is logged through `tracing` and published as
//! [`AppEvent::FatalError`] so the host can show its error screen before the
//! process goes down. The previously installed hook still runs afterwards.

use crate::events::{AppEvent, CoreEvent, EventBus};
use std::any::Any;
use std::panic;
use tracing::error;

/// Install the hook. Call once at startup, after logging is initialized.
pub fn install_panic_hook(event_bus: EventBus) {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let report = PanicReport {
            message: payload_message(info.payload()),
            location: info
                .location()
                .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column())),
        };

        error!(
            panic.message = %report.message,
            panic.location = report.location.as_deref().unwrap_or("unknown"),
            thread = std::thread::current().name().unwrap_or("unnamed"),
            "Unhandled panic"
        );

        // No subscriber means no host screen to route to; nothing else to do.
        let _ = event_bus.emit(CoreEvent::App(AppEvent::FatalError {
            message: report.message,
            location: report.location,
        }));

        original_hook(info);
    }));
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PanicReport {
    message: String,
    location: Option<String>,
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
