//! # Error Types
//!
//! Error handling for the gateway protocol stack.
//!
//! This module defines the error variants that can occur during gateway
//! operations, from low-level I/O failures to upgrade-handshake violations.
//!
//! Malformed *wire input* is deliberately not represented here: decoded
//! packets carry a `valid` flag instead, so a hostile or broken peer can
//! never terminate the process through the decode path. Errors are reserved
//! for transport, configuration, and session-state failures.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Event-bus lock errors
    pub const ERR_BUS_WRITE_LOCK: &str = "Failed to acquire write lock on event bus";
    pub const ERR_BUS_READ_LOCK: &str = "Failed to acquire read lock on event bus";

    /// Connection registry errors
    pub const ERR_REGISTRY_LOCK: &str = "Failed to acquire lock on connection registry";

    /// Upgrade handshake errors
    pub const ERR_MISSING_UPGRADE: &str = "Request is missing the Upgrade header";
    pub const ERR_MISSING_KEY: &str = "Upgrade request is missing the client key header";
}

/// ProtocolError is the primary error type for all gateway operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upgrade handshake failed: {0}")]
    HandshakeError(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid peripheral key: {0}")]
    InvalidKey(String),

    #[error("Secure session not established")]
    SessionNotEstablished,

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
