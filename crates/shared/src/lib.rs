//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for tenants, users, accounts and journal entries
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - Tracing subscriber bootstrap

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, LedgerConfig, LogFormat, LoggingConfig};
pub use error::{AppError, AppResult};
