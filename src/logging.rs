//! Logging init: stderr only, so stdout stays free for reports.

use tracing_subscriber::EnvFilter;

/// Initialize structured logging to stderr. `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "info,relinker=debug"
    } else {
        "warn,relinker=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
