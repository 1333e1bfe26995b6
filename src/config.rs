//! # Configuration Management
//!
//! Centralized configuration for the gateway.
//!
//! This module provides structured configuration for the gateway process:
//! the listening endpoint, the peripheral's shared symmetric key and access
//! level, and logging verbosity.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Current router protocol generation written into every envelope
pub const PROTOCOL_VERSION: u8 = 1;

/// Envelope header size: version + type + 16-bit length
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Default listening port for the gateway
pub const DEFAULT_PORT: u16 = 14500;

/// Peripheral key width (AES-128)
pub const PERIPHERAL_KEY_SIZE: usize = 16;

/// Main gateway configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GatewayConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Wireless peripheral configuration
    #[serde(default)]
    pub peripheral: PeripheralConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(addr) = std::env::var("GATEWAY_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(port) = std::env::var("GATEWAY_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                config.server.port = val;
            }
        }

        if let Ok(key) = std::env::var("GATEWAY_PERIPHERAL_KEY") {
            config.peripheral.key = key;
        }

        if let Ok(level) = std::env::var("GATEWAY_ACCESS_LEVEL") {
            if let Ok(val) = level.parse::<u8>() {
                config.peripheral.access_level = val;
            }
        }

        if let Ok(level) = std::env::var("GATEWAY_LOG") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server.address.is_empty() {
            errors.push("server.address must not be empty".to_string());
        }

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }

        if !self.peripheral.key.is_empty() && self.peripheral.key_bytes().is_err() {
            errors.push(format!(
                "peripheral.key must be {} hex characters",
                PERIPHERAL_KEY_SIZE * 2
            ));
        }

        errors
    }
}

/// Server listening endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface address to bind
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Shared-key configuration for the encrypted peripheral channel
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PeripheralConfig {
    /// Shared symmetric key, hex encoded (32 characters for AES-128)
    #[serde(default)]
    pub key: String,

    /// Access level written into the secure command header
    #[serde(default)]
    pub access_level: u8,
}

impl PeripheralConfig {
    /// Decode the configured hex key into raw bytes.
    pub fn key_bytes(&self) -> Result<[u8; PERIPHERAL_KEY_SIZE]> {
        let raw = self.key.trim();
        if raw.len() != PERIPHERAL_KEY_SIZE * 2 {
            return Err(ProtocolError::InvalidKey(format!(
                "expected {} hex characters, got {}",
                PERIPHERAL_KEY_SIZE * 2,
                raw.len()
            )));
        }

        let mut key = [0u8; PERIPHERAL_KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            let pair = &raw[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ProtocolError::InvalidKey(format!("invalid hex pair '{pair}'")))?;
        }

        Ok(key)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
