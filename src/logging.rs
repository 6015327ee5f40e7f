//! Logging setup
//!
//! All diagnostics go to stderr; stdout belongs to curl.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

/// Default filter directive for the given flags
///
/// `--debug` shows every step of the resolution and the tunnel lifecycle;
/// a pass-through `-v/--verbose` only raises our own narrative to `info`.
pub fn default_directive(debug: bool, verbose: bool) -> &'static str {
    if debug {
        "warn,kubectl_curl=debug"
    } else if verbose {
        "warn,kubectl_curl=info"
    } else {
        "warn"
    }
}

/// Initialize logging with tracing-subscriber
///
/// `RUST_LOG` wins over the computed default. Safe to call more than once;
/// later calls are ignored.
pub fn init(debug: bool, verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug, verbose)));
    let registry = tracing_subscriber::registry().with(filter);

    let _ = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
}
