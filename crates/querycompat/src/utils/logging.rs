use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "QUERYCOMPAT_LOG";
const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// Installs the global stderr subscriber. Safe to call more than once.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .try_init();
    });
}
