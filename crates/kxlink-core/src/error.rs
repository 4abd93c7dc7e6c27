//! Error types for KxLink core.

use thiserror::Error;

/// Core error type for parameter handling.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid EQ band: {0} (must be 0-14)")]
    InvalidBand(u8),

    #[error("Value {value} does not match parameter {parameter}")]
    ValueMismatch { parameter: String, value: String },
}

/// Result type alias for KxLink core operations.
pub type Result<T> = std::result::Result<T, Error>;
