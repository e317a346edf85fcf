//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::RequestLimits;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening socket.
    pub listener: ListenerConfig,

    /// Route matching settings.
    pub routing: RoutingConfig,

    /// Worker isolation and request limits.
    pub worker: WorkerConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Free-form application settings, read by handlers through the request context.
    pub app: toml::Table,
}

impl ServerConfig {
    /// Size limits handed to the request reader.
    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_header_bytes: self.worker.max_header_bytes,
            max_body_bytes: self.worker.max_body_bytes,
        }
    }

    /// Look up an application setting by dotted name, e.g. `"db.pool.size"`.
    pub fn app_value(&self, name: &str) -> Option<&toml::Value> {
        let mut segments = name.split('.');
        let mut value = self.app.get(segments.next()?)?;
        for segment in segments {
            value = value.as_table()?.get(segment)?;
        }
        Some(value)
    }

    /// String application setting, or `default` when absent or not a string.
    pub fn app_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.app_value(name)
            .and_then(toml::Value::as_str)
            .unwrap_or(default)
    }

    /// Integer application setting, or `default` when absent or not an integer.
    pub fn app_int(&self, name: &str, default: i64) -> i64 {
        self.app_value(name)
            .and_then(toml::Value::as_integer)
            .unwrap_or(default)
    }
}

/// Listening socket configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address or host name to bind.
    pub address: String,

    /// TCP port. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 4900,
        }
    }
}

/// Route matching configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Mount point stripped from every request path before matching (e.g. "/app").
    pub base_path: String,
}

/// How each accepted connection is isolated.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    /// One forked process per connection.
    #[default]
    Process,
    /// One OS thread per connection.
    Thread,
}

/// Worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Isolation strategy.
    pub mode: WorkerMode,

    /// Give up reading a request after this many seconds. No timeout when unset.
    pub read_timeout_secs: Option<u64>,

    /// Largest accepted SCGI header block.
    pub max_header_bytes: usize,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl WorkerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let limits = RequestLimits::default();
        Self {
            mode: WorkerMode::default(),
            read_timeout_secs: None,
            max_header_bytes: limits.max_header_bytes,
            max_body_bytes: limits.max_body_bytes,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warning, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warning".to_string(),
        }
    }
}
