//! Ragsync Common Library
//!
//! Shared code for the ragsync services including:
//! - Error types and handling
//! - Configuration management
//! - Secret resolution and credential material
//! - Retry policy for transient failures
//! - Database connection management

pub mod config;
pub mod db;
pub mod errors;
pub mod retry;
pub mod secrets;

// Re-export commonly used types
pub use config::Settings;
pub use db::{ConnectionManager, ConnectionProvider};
pub use errors::{AppError, ErrorKind, Result};
pub use retry::RetryPolicy;
pub use secrets::{SecretMaterial, SecretResolver, SecretSource};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
