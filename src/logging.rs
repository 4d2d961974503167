//! Diagnostic logging to stderr.
//!
//! Filter directives come from `SESSION_LOG_LOG`; without it only warnings
//! are shown, or everything at debug level with `--verbose`.
//!
//! ```bash
//! SESSION_LOG_LOG=session_log=debug session-log hook stop
//! ```

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_FILTER: &str = "SESSION_LOG_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(ENV_FILTER)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
