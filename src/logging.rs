// 📝 Logging - tracing subscriber for the binary
// Logs go to stderr so command output on stdout stays machine-readable

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "contact_cleaner=info";

/// Install the global subscriber. `RUST_LOG` overrides the default level.
/// Calling it twice is harmless (the second call is ignored).
pub fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}
