//! # Peripheral Secure Channel
//!
//! The wireless peripheral's sub-protocol: a one-shot block-cipher session
//! handshake plus counter-mode protected commands.
//!
//! ## Components
//! - **Session**: handshake-reply decode and the session state machine
//! - **Command**: secure command frame, inner command and result codecs
//!
//! ## Security model
//! The channel obscures and informally authenticates commands; it is not
//! an AEAD. A wrong key produces garbage plaintext with no signal from the
//! cipher itself; only the validation-tag convention and field validity
//! checks one layer up expose the problem. This matches the fixed external
//! firmware and must not be "improved" unilaterally.

pub mod command;
pub mod session;

pub use command::{InnerCommand, PeripheralResult, SecureCommand};
pub use session::{PeripheralSession, SessionData, SessionState};
