//! Diagnostic output setup

use std::io;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostic filter
pub const LOG_ENV: &str = "PROBA_LOG";

/// Send diagnostics to stderr, filtered by `PROBA_LOG` (default `warn`)
///
/// `verbose` forces the `debug` level. A subscriber that is already set is
/// left in place.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}
