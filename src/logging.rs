//! Logging setup

use std::io;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Initialize logging to stderr.
///
/// `RUST_LOG` wins over `log_level`; an unparsable level falls back to info.
/// Returns false if a global subscriber was already installed.
pub fn init_logging(log_level: &str) -> bool {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info")),
        Err(_) => {
            let level = LevelFilter::from_str(log_level).unwrap_or(LevelFilter::INFO);
            EnvFilter::new(level.to_string())
        }
    };

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_thread_names(true);
    let subscriber = Registry::default().with(env_filter).with(stderr_layer);

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
