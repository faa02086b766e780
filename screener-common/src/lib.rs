//! Screener Common - Shared configuration, errors and logging for the stock screener.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - The service-boundary error type
//! - Logging setup
//! - Small numeric and log-sanitizing helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    CacheConfig, Config, MovingAverageMode, ObservabilityConfig, ProviderConfig, ScreenerConfig,
    SecretsConfig, ServerConfig,
};
pub use error::Error;
pub use validation::{Validate, ValidationError, ValidationResult};
