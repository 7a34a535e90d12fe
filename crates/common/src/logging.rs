//! Tracing setup for the shotdedup tools.
//!
//! Everything is written to stderr; stdout carries deduplicated records.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter from `RUST_LOG`, else from `level`, else plain `info`.
fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(&config.level);

    let installed = if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };

    if !installed {
        tracing::debug!("tracing subscriber already installed");
    }
    installed
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() -> bool {
    init_logging(&LoggingConfig::default())
}
