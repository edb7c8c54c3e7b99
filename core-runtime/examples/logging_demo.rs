//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_auth=trace"
//! ```

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, instrument, span, warn, Level};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };

    let filter = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "logging_demo=trace,core_runtime=debug".to_string());

    let config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_filter(filter)
        .with_redaction(true)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    if let Err(e) = init_logging(config) {
        eprintln!("logging init failed: {}", e);
        return;
    }

    info!(format = ?format, "Logging initialized");
    demo_login_flow().await;
    demo_redaction();
}

#[instrument]
async fn demo_login_flow() {
    let attempt_id = "3f1c2a4e-0000-4000-8000-000000000001";
    info!(attempt_id, surface = "system-browser", "Authorization page opened");

    {
        let exchange = span!(Level::DEBUG, "token_exchange", attempt_id);
        let _enter = exchange.enter();
        debug!("Exchanging authorization code for tokens");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        info!(token_type = "Bearer", expires_in = 3600, "Authorization code exchanged");
    }

    warn!(status = 401, "Gateway rejected the access token, expiring session");
}

fn demo_redaction() {
    // The sink layer redacts these field names on its own; the helper covers
    // values formatted into other fields.
    info!(
        access_token = "eyJhbGciOiJSUzI1NiJ9.demo",
        code = "SplxlOBeZQQYbYS6WxSbIA",
        "Fields redacted before reaching the sink"
    );
    info!(
        user = %redact_if_sensitive("user", "minji@everp.example"),
        "Email masked by the helper"
    );
}
