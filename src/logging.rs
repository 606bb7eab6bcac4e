use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize tracing with a compact stdout layer.
///
/// - Default level: INFO (DEBUG for this crate), override via RUST_LOG env
/// - `json = true` switches to one JSON object per line for log shipping
/// - Safe to call more than once; only the first call installs the subscriber
pub fn init(json: bool) {
    INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,postprocess_settings=debug"));

        let registry = tracing_subscriber::registry().with(env_filter);

        let result = if json {
            registry
                .with(fmt::layer().json().with_target(true).with_current_span(false))
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(true)
                        .with_line_number(true)
                        .compact(),
                )
                .try_init()
        };

        // Another subscriber (e.g. a host application's) already owns the global slot.
        if let Err(e) = result {
            eprintln!("tracing subscriber not installed: {e}");
            return;
        }

        tracing::debug!("Tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(false);
        init(true);
        assert!(INIT.get().is_some());
        tracing::info!("still logging after repeated init");
    }
}
