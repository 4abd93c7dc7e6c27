//! HID error types.

use thiserror::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("KX-180 mixer not found")]
    DeviceNotFound,

    #[error("Not connected")]
    NotConnected,

    #[error("Handshake already in progress")]
    HandshakeInProgress,

    #[error("Handshake aborted before the lock was established")]
    HandshakeAborted,

    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    #[error("Invalid device path: {0}")]
    InvalidPath(String),

    #[error("Handshake script error: {0}")]
    Script(String),

    #[error("Parameter error: {0}")]
    Parameter(#[from] kxlink_core::Error),

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;
