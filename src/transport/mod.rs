//! # Transport Layer
//!
//! Socket listener, HTTP-style upgrade exchange and connection tracking.
//!
//! ## Components
//! - **Handshake**: upgrade request parsing and accept-token computation
//! - **Registry**: one live connection per distinct remote address
//! - **Ws**: the listening server and per-connection frame pump

pub mod handshake;
pub mod registry;
pub mod ws;

pub use registry::ConnectionRegistry;
pub use ws::GatewayServer;
