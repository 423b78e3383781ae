use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber and routes `log` records into it.
///
/// `level` is an `EnvFilter` directive; an unparsable one falls back to
/// `info`. Calling this more than once is harmless.
pub fn init_logging(level: &str, format: LogFormat) {
    if LOGGING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true))
            .try_init()
            .is_ok(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init()
            .is_ok(),
    };
    // No-op if `try_init` already bridged `log`.
    if installed {
        let _ = tracing_log::LogTracer::init();
    }

    let _ = LOGGING_INIT.set(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging("debug", LogFormat::Text);
        init_logging("not a directive ===", LogFormat::Json);
        log::info!("log records reach the subscriber");
        tracing::info!("so do tracing events");
    }
}
