//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, endpoint is an http(s) URL)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ProxyConfig;

/// One semantic configuration problem.
#[derive(Debug)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.lambda.endpoint.starts_with("http://") && !config.lambda.endpoint.starts_with("https://") {
        errors.push(ValidationError {
            field: "lambda.endpoint",
            message: format!("must be an http(s) URL, got {:?}", config.lambda.endpoint),
        });
    }
    if config.lambda.invoke_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "lambda.invoke_timeout_secs",
            message: "must be greater than zero".to_string(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs",
            message: "must be greater than zero".to_string(),
        });
    }
    if config.origin.address.is_empty() {
        errors.push(ValidationError {
            field: "origin.address",
            message: "must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
