//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer limit, timeouts and message cap above zero)
//! - Check the logging level parses as a level filter
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, on load and on update

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::ClientConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.filters.buffer_limit_bytes == 0 {
        errors.push(ValidationError::new(
            "filters.buffer_limit_bytes",
            "must be greater than zero",
        ));
    }

    if config.grpc.default_timeout_ms == Some(0) {
        errors.push(ValidationError::new(
            "grpc.default_timeout_ms",
            "must be greater than zero when set",
        ));
    }

    if config.grpc.max_message_bytes == Some(0) {
        errors.push(ValidationError::new(
            "grpc.max_message_bytes",
            "must be greater than zero when set",
        ));
    }

    if config.logging.level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level {:?}", config.logging.level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
