//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level; `RUST_LOG` still wins when set.
///
/// Safe to call more than once (later calls are ignored), which keeps test
/// binaries and the app from fighting over the global logger.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialised, keeping existing configuration");
    }
}
