//! # Connection Registry
//!
//! Tracks the remote address of every live transport connection.
//!
//! Invariant: no two registered connections share a remote address at any
//! instant. A second connection attempt from an already-registered address
//! is refused before the upgrade completes; releasing the first makes the
//! address available again.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{constants, ProtocolError, Result};

/// Registry of currently-connected remote addresses.
///
/// Guarded by a mutex: connection tasks on a multi-threaded runtime
/// register and release concurrently.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connected: Mutex<HashSet<IpAddr>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to register a connection's remote address.
    ///
    /// Returns false (refusal) when the address is already registered;
    /// the caller closes the socket without adding it.
    pub fn accept(&self, remote_addr: IpAddr) -> Result<bool> {
        let mut connected = self
            .connected
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_REGISTRY_LOCK.to_string()))?;

        let accepted = connected.insert(remote_addr);
        if accepted {
            debug!(%remote_addr, "Connection registered");
        }
        Ok(accepted)
    }

    /// Deregister a connection's remote address on teardown.
    pub fn release(&self, remote_addr: IpAddr) -> Result<()> {
        let mut connected = self
            .connected
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_REGISTRY_LOCK.to_string()))?;

        if connected.remove(&remote_addr) {
            debug!(%remote_addr, "Connection released");
        }
        Ok(())
    }

    /// Number of currently registered connections.
    pub fn len(&self) -> usize {
        self.connected.lock().map(|set| set.len()).unwrap_or(0)
    }

    /// True when no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
