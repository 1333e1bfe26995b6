//! # Router Gateway
//!
//! Protocol gateway core that accepts a streaming socket connection,
//! upgrades it to a framed message transport, and runs a layered binary
//! control protocol routing commands between a cloud-side controller, a
//! wired sensor/actuator bridge, and a wireless peripheral behind an
//! encrypted command channel.
//!
//! ## Layers
//! - **core**: WebSocket frame codec, router envelope and typed sub-packets
//! - **peripheral**: block-cipher session handshake + counter-mode commands
//! - **protocol**: envelope-to-topic dispatch
//! - **transport**: upgrade exchange, connection registry, server loop
//! - **bus**: synchronous topic-addressed event dispatcher
//!
//! ## Design
//! This crate interoperates with one fixed external firmware family,
//! including its non-standard conventions: router-layer fields are
//! little-endian while the frame layer is big-endian, and the peripheral
//! layer uses its own widths. Malformed wire input never raises an error;
//! decoded packets carry a `valid` flag and the subscriber decides.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use router_gateway::bus::{BusEvent, EventBus, Topic};
//! use router_gateway::config::GatewayConfig;
//! use router_gateway::transport::GatewayServer;
//!
//! #[tokio::main]
//! async fn main() -> router_gateway::error::Result<()> {
//!     let config = GatewayConfig::default();
//!     let bus = Arc::new(EventBus::new());
//!
//!     bus.subscribe(Topic::DataPacket, |event, _conn| {
//!         if let BusEvent::Data(packet) = event {
//!             println!("data from instance {}", packet.source_id);
//!         }
//!     })?;
//!
//!     GatewayServer::bind(&config, bus).await?.run().await
//! }
//! ```

pub mod bus;
pub mod config;
pub mod core;
pub mod error;
pub mod peripheral;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use bus::{BusEvent, ConnectionHandle, EventBus, Topic};
pub use config::GatewayConfig;
pub use core::envelope::{Envelope, PayloadType};
pub use core::router::{CommandType, ControlPacket, DataPacket, InstanceId, ResultPacket};
pub use error::{ProtocolError, Result};
pub use peripheral::{PeripheralSession, SecureCommand, SessionData, SessionState};
pub use transport::{ConnectionRegistry, GatewayServer};
