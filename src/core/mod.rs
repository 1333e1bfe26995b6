//! # Core Protocol Components
//!
//! Low-level frame handling and binary packet codecs.
//!
//! This module provides the foundation for the gateway: WebSocket frame
//! parsing/building and the router binary envelope with its typed
//! sub-packets.
//!
//! ## Components
//! - **Frame**: RFC 6455 subset frame codec (text/binary/close, masking)
//! - **Envelope**: outer router envelope with version, type and length
//! - **Router**: control, data and result sub-packet codecs
//!
//! ## Wire Format
//! ```text
//! [Version(1)] [Type(1)] [Length(2, LE)] [Payload(N)]
//! ```
//!
//! Router-layer fields are little-endian to match the router firmware;
//! the frame layer above follows network byte order per RFC 6455. The
//! mismatch is a firmware-compatibility constraint, not a free choice.

pub mod envelope;
pub mod frame;
pub mod router;
