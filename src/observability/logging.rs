//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Map configured level names onto tracing filter directives
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `warning` is accepted as an alias of `warn`
//! - Log level configurable via config and environment

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Canonical tracing level for a configured name, `None` if unknown.
pub fn normalize_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        "off" | "none" => Some("off"),
        _ => None,
    }
}

/// Install the global subscriber. RUST_LOG wins over `level` when set.
///
/// Calling this twice is harmless; the second call leaves the first subscriber in place.
pub fn init(level: &str) {
    let directive = normalize_level(level).unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("scgi_gateway={directive},{directive}").into());

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(normalize_level("warning"), Some("warn"));
        assert_eq!(normalize_level("WARN"), Some("warn"));
        assert_eq!(normalize_level(" debug "), Some("debug"));
        assert_eq!(normalize_level("loud"), None);
    }
}
