//! Configuration validation.
//!
//! Rejects settings that would make the pipeline stall or divide by zero
//! before the service starts.

use thiserror::Error;

use crate::config::{CacheConfig, Config, ObservabilityConfig, ProviderConfig, ScreenerConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ValidationError::InvalidPort {
                port: 0,
                field: "server.port".into(),
            });
        }

        let sections: [&dyn Validate; 4] = [
            &self.observability,
            &self.provider,
            &self.cache,
            &self.screener,
        ];
        for section in sections {
            if let Err(e) = section.validate() {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        match self.log_format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("expected 'json' or 'pretty', got '{other}'"),
            }),
        }
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "provider.base_url".into(),
            });
        }
        if self.calls_per_minute == 0 {
            return Err(ValidationError::InvalidValue {
                field: "provider.calls_per_minute".into(),
                reason: "call budget must be at least 1".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "provider.request_timeout_secs".into(),
                reason: "timeout must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cache.ttl_secs".into(),
                reason: "ttl must be positive".into(),
            });
        }
        if self.max_entries == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cache.max_entries".into(),
                reason: "capacity must be positive".into(),
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cache.sweep_interval_secs".into(),
                reason: "sweep interval must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ScreenerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidValue {
                field: "screener.batch_size".into(),
                reason: "batch size must be at least 1".into(),
            });
        }
        Ok(())
    }
}
