//! Shared utilities for the web search agent
//!
//! This crate provides common functionality used across the workspace:
//! logging setup and environment-driven configuration helpers.

pub mod config;
pub mod logging;

pub use config::{ConfigError, first_env, require_env};
pub use logging::{init_tracing, init_tracing_with};
