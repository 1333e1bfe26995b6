//! # Session Handshake
//!
//! Decodes the peripheral's session handshake reply and drives the
//! session-scoped state machine that owns correlation.
//!
//! The handshake reply is exactly one 16-byte block encrypted with the
//! shared key in an unchained block mode (every block decrypted
//! independently, no inter-block state). Its plaintext layout:
//!
//! ```text
//! [Validation(4)] [Protocol(1)] [SessionNonce(5)] [ValidationKey(4)]
//! ```
//!
//! The reply arrives wrapped in a router result packet whose `result_id`
//! must echo the `request_id` of the handshake request. That correlation
//! check lives here, in [`PeripheralSession`], never in the codec.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes128;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::PERIPHERAL_KEY_SIZE;
use crate::core::router::ResultPacket;
use crate::error::{ProtocolError, Result};
use crate::peripheral::command::{
    SecureCommand, BLOCK_SIZE, PACKET_NONCE_SIZE, SESSION_NONCE_SIZE, VALIDATION_TAG_SIZE,
};

/// Decoded session handshake reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// Fixed validation bytes at the head of the plaintext
    pub validation: [u8; 4],
    /// Peripheral protocol generation
    pub protocol: u8,
    /// Session nonce folded into every counter block for this session
    pub nonce: [u8; SESSION_NONCE_SIZE],
    /// Per-session validation tag expected in subsequent commands
    pub validation_key: [u8; VALIDATION_TAG_SIZE],
    /// False when fewer than 16 plaintext bytes were recovered
    pub valid: bool,
}

impl SessionData {
    /// Decrypt and decode the one-block handshake reply.
    pub fn decode(data: &[u8], key: &[u8; PERIPHERAL_KEY_SIZE]) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(key));

        // unchained mode: each complete block decrypted independently
        let mut plaintext = Vec::with_capacity(data.len());
        for chunk in data.chunks_exact(BLOCK_SIZE) {
            let mut block = GenericArray::clone_from_slice(chunk);
            cipher.decrypt_block(&mut block);
            plaintext.extend_from_slice(&block);
        }

        if plaintext.len() < BLOCK_SIZE {
            return Self {
                validation: [0; 4],
                protocol: 0,
                nonce: [0; SESSION_NONCE_SIZE],
                validation_key: [0; VALIDATION_TAG_SIZE],
                valid: false,
            };
        }

        let mut validation = [0u8; 4];
        validation.copy_from_slice(&plaintext[0..4]);
        let protocol = plaintext[4];
        let mut nonce = [0u8; SESSION_NONCE_SIZE];
        nonce.copy_from_slice(&plaintext[5..10]);
        let mut validation_key = [0u8; VALIDATION_TAG_SIZE];
        validation_key.copy_from_slice(&plaintext[10..14]);

        Self {
            validation,
            protocol,
            nonce,
            validation_key,
            valid: true,
        }
    }
}

/// Session-scoped protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No handshake in flight
    Init,
    /// A handshake request was sent; its result is outstanding
    AwaitingHandshakeReply,
    /// The handshake reply decoded; nonce and validation key are live
    SessionEstablished,
    /// One secure command was sent; the next trigger restarts the cycle
    CommandSent,
}

/// Mutable session context owned by the application layer.
///
/// All process-lifetime secure-channel state lives here: the outstanding
/// correlation identifier, the session nonce and the validation key. It is
/// an explicit value passed around rather than module state, so several
/// independent peripheral sessions can coexist.
#[derive(Debug)]
pub struct PeripheralSession {
    state: SessionState,
    key: [u8; PERIPHERAL_KEY_SIZE],
    user_level: u8,
    request_id: Option<u16>,
    session_nonce: Option<[u8; SESSION_NONCE_SIZE]>,
    validation_key: Option<[u8; VALIDATION_TAG_SIZE]>,
}

impl PeripheralSession {
    /// Create a fresh session for one peripheral.
    pub fn new(key: [u8; PERIPHERAL_KEY_SIZE], user_level: u8) -> Self {
        Self {
            state: SessionState::Init,
            key,
            user_level,
            request_id: None,
            session_nonce: None,
            validation_key: None,
        }
    }

    /// Current state, for the application's triggering logic.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Draw a correlation identifier, guaranteed distinct from the
    /// previous draw for this session.
    pub fn next_request_id(&mut self) -> u16 {
        let mut rng = rand::rng();
        loop {
            let id: u16 = rng.random();
            if self.request_id != Some(id) {
                self.request_id = Some(id);
                return id;
            }
        }
    }

    /// Start a handshake exchange: draws the request id the caller must
    /// put into the outbound control command.
    pub fn begin_handshake(&mut self) -> u16 {
        let id = self.next_request_id();
        self.state = SessionState::AwaitingHandshakeReply;
        debug!(request_id = id, "Session handshake requested");
        id
    }

    /// Feed a result packet back into the session.
    ///
    /// Returns the decoded session data when the result correlates with
    /// the outstanding request and decodes to a valid handshake reply.
    /// Any mismatch or invalid decode resets the session to `Init`; it is
    /// never fatal.
    pub fn handle_result(&mut self, result: &ResultPacket) -> Option<SessionData> {
        if self.state != SessionState::AwaitingHandshakeReply {
            warn!(state = ?self.state, "Unexpected result packet, resetting session");
            self.reset();
            return None;
        }

        if self.request_id != Some(result.result_id) {
            warn!(
                result_id = result.result_id,
                "Result does not correlate with the outstanding request, resetting session"
            );
            self.reset();
            return None;
        }

        let session_data = SessionData::decode(&result.payload, &self.key);
        if !session_data.valid {
            warn!("Invalid session data in handshake reply, resetting session");
            self.reset();
            return None;
        }

        self.session_nonce = Some(session_data.nonce);
        self.validation_key = Some(session_data.validation_key);
        self.state = SessionState::SessionEstablished;
        debug!("Session established");

        Some(session_data)
    }

    /// Encrypt one inner command for the established session.
    ///
    /// Draws a fresh 3-byte packet nonce, stamps the session's validation
    /// key as the tag, and moves the session to `CommandSent`.
    pub fn encode_command(&mut self, inner_payload: &[u8]) -> Result<Vec<u8>> {
        let (session_nonce, validation_key) = match (
            self.state,
            self.session_nonce.as_ref(),
            self.validation_key.as_ref(),
        ) {
            (SessionState::SessionEstablished, Some(nonce), Some(key)) => (*nonce, *key),
            _ => return Err(ProtocolError::SessionNotEstablished),
        };

        let mut packet_nonce = [0u8; PACKET_NONCE_SIZE];
        rand::rng().fill(&mut packet_nonce[..]);

        let packet = SecureCommand::encode(
            &self.key,
            &packet_nonce,
            &session_nonce,
            self.user_level,
            &validation_key,
            inner_payload,
        );

        self.state = SessionState::CommandSent;
        Ok(packet)
    }

    /// Decrypt a secure frame received within the established session.
    pub fn decode_command(&self, data: &[u8]) -> Result<SecureCommand> {
        let session_nonce = self
            .session_nonce
            .as_ref()
            .ok_or(ProtocolError::SessionNotEstablished)?;
        Ok(SecureCommand::decode(&self.key, data, session_nonce))
    }

    /// Expected validation tag for inbound frames on this session.
    pub fn validation_key(&self) -> Option<[u8; VALIDATION_TAG_SIZE]> {
        self.validation_key
    }

    fn reset(&mut self) {
        self.state = SessionState::Init;
        self.session_nonce = None;
        self.validation_key = None;
    }
}
