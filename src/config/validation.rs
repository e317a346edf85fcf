//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the mount point shape
//! - Validate log level names and size limits
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::ServerConfig;
use crate::observability::logging;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.address must not be empty")]
    EmptyAddress,

    #[error("routing.base_path {0:?} must start with '/' and must not end with '/'")]
    InvalidBasePath(String),

    #[error("observability.log_level {0:?} is not a known level")]
    UnknownLogLevel(String),

    #[error("worker.{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }

    let base = &config.routing.base_path;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
        errors.push(ValidationError::InvalidBasePath(base.clone()));
    }

    if logging::normalize_level(&config.observability.log_level).is_none() {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.worker.max_header_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_header_bytes"));
    }
    if config.worker.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_body_bytes"));
    }
    if config.worker.read_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroLimit("read_timeout_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.address = " ".into();
        config.routing.base_path = "app/".into();
        config.observability.log_level = "verbose".into();
        config.worker.max_body_bytes = 0;
        config.worker.read_timeout_secs = Some(0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyAddress,
                ValidationError::InvalidBasePath("app/".into()),
                ValidationError::UnknownLogLevel("verbose".into()),
                ValidationError::ZeroLimit("max_body_bytes"),
                ValidationError::ZeroLimit("read_timeout_secs"),
            ]
        );
    }

    #[test]
    fn test_base_path_shapes() {
        let mut config = ServerConfig::default();
        for ok in ["", "/app", "/a/b"] {
            config.routing.base_path = ok.into();
            assert!(validate_config(&config).is_ok(), "{ok:?} should be accepted");
        }
        for bad in ["/", "app", "/app/"] {
            config.routing.base_path = bad.into();
            assert!(validate_config(&config).is_err(), "{bad:?} should be rejected");
        }
    }
}
