//! Semantic validation of configuration.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::EngineConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must start with '/': {value:?}")]
    RelativePath { field: &'static str, value: String },
    #[error("{field} is not a socket address: {value:?}")]
    BadAddress { field: &'static str, value: String },
    #[error("metrics_path and profiling_path are both {0:?}")]
    PathClash(String),
}

fn check_path(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if !value.is_empty() && !value.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            field,
            value: value.to_string(),
        });
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if !value.is_empty() && value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Collect every problem instead of stopping at the first.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("bind_address", &config.bind_address, &mut errors);
    check_path("metrics_path", &config.metrics_path, &mut errors);
    check_path("profiling_path", &config.profiling_path, &mut errors);
    check_address("diagnostics_address", &config.diagnostics_address, &mut errors);
    for path in &config.skip_log_paths {
        check_path("skip_log_paths", path, &mut errors);
    }

    if config.metrics
        && config.profiling
        && !config.metrics_path.is_empty()
        && config.metrics_path == config.profiling_path
    {
        errors.push(ValidationError::PathClash(config.metrics_path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
