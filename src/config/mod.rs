//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and loading
//! - [`defaults`]: serde default functions
//! - [`validation`]: checks run before connecting

mod defaults;
mod types;
mod validation;

pub use types::{
    BehaviorConfig, Config, ConfigError, IdentityConfig, LogConfig, LogFormat, LogSink,
    ServerConfig,
};
pub use validation::{ValidationError, validate};
