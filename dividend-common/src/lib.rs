//! Dividend Common - shared plumbing for the dividend calculator.
//!
//! This crate provides:
//! - Configuration types, file loading, and environment overrides
//! - Configuration errors
//! - Logging setup and request trace ids

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    CacheConfig, Config, ObservabilityConfig, ProviderConfig, ScreenerConfig, ServerConfig,
};
pub use error::{Error, Result};
pub use logging::LogFormat;
