//! Per-request context handed to every filter and handler.
//!
//! Replaces process-wide globals: a worker builds one `Context` after reading
//! its request, holding the configuration snapshot taken at startup and the
//! application data produced by the initializer in that worker.

use std::any::Any;
use std::sync::Arc;

use crate::config::ServerConfig;

/// Application data produced once per worker.
pub type AppData = Box<dyn Any + Send>;

/// Builds the application data for a worker.
pub type AppInitializer = fn() -> AppData;

pub struct Context {
    config: Arc<ServerConfig>,
    app_data: Option<AppData>,
}

impl Context {
    pub fn new(config: Arc<ServerConfig>, app_data: Option<AppData>) -> Self {
        Self { config, app_data }
    }

    /// Context with default configuration and no application data.
    pub fn detached() -> Self {
        Self::new(Arc::new(ServerConfig::default()), None)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Application data, if an initializer was registered and produced a `T`.
    pub fn app_data<T: Any>(&self) -> Option<&T> {
        self.app_data.as_ref()?.downcast_ref::<T>()
    }

    /// `[app]` string setting with a default.
    pub fn config_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.config.app_str(name, default)
    }

    /// `[app]` integer setting with a default.
    pub fn config_int(&self, name: &str, default: i64) -> i64 {
        self.config.app_int(name, default)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("app_data", &self.app_data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pool {
        size: usize,
    }

    #[test]
    fn test_app_data_downcast() {
        let ctx = Context::new(
            Arc::new(ServerConfig::default()),
            Some(Box::new(Pool { size: 4 })),
        );

        assert_eq!(ctx.app_data::<Pool>().map(|p| p.size), Some(4));
        assert!(ctx.app_data::<String>().is_none());
        assert!(Context::detached().app_data::<Pool>().is_none());
    }

    #[test]
    fn test_config_lookups() {
        let mut config = ServerConfig::default();
        config.app.insert("name".into(), toml::Value::String("gateway".into()));
        let ctx = Context::new(Arc::new(config), None);

        assert_eq!(ctx.config_str("name", "x"), "gateway");
        assert_eq!(ctx.config_int("port", 80), 80);
        assert_eq!(ctx.config().listener.port, 4900);
    }
}
