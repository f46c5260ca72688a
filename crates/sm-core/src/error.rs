//! # AppError
//!
//! Centralized error handling for the Story Market crates.

use thiserror::Error;

/// The primary error type for all sm-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., a story id that was never issued)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., a required form field left empty)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Infrastructure failure (e.g., QR rendering, CSV serialization)
    #[error("internal service error: {0}")]
    Internal(String),

    /// The store refused a write because another one got there first
    #[error("conflict: {0}")]
    Conflict(String),
}

/// A specialized Result type for Story Market logic.
pub type Result<T> = std::result::Result<T, AppError>;
