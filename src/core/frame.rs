//! # Frame Codec
//!
//! Parses and builds the WebSocket frames that carry router envelopes.
//!
//! Only the subset the router firmware speaks is implemented: single
//! unfragmented text/binary frames plus the close opcode. Control frames
//! such as ping/pong are dropped without error, and no continuation
//! handling exists. Inbound frames may be masked (clients must mask per
//! RFC 6455) or unmasked; outbound server frames are never masked.

use tracing::debug;

/// Text frame opcode (low 4 bits of the first byte)
pub const OPCODE_TEXT: u8 = 0x1;

/// Binary frame opcode
pub const OPCODE_BINARY: u8 = 0x2;

/// Close frame opcode
pub const OPCODE_CLOSE: u8 = 0x8;

/// Literal 7-bit lengths stop here; 126 and 127 select extended fields
const MAX_INLINE_LEN: usize = 125;

/// Marker selecting a 16-bit big-endian extended length
const LEN_U16_MARKER: u8 = 126;

/// Marker selecting a 64-bit big-endian extended length
const LEN_U64_MARKER: u8 = 127;

/// Result of parsing one inbound frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A text or binary data frame, unmasked if a mask key was present.
    Payload(Vec<u8>),
    /// The peer sent a close frame; stop processing this buffer.
    Close,
    /// Any other opcode, or a buffer too short for its own header.
    Ignored,
}

/// Parse one frame from an inbound byte buffer.
///
/// The opcode lives in the low 4 bits of byte 0 and the mask bit is bit 7
/// of byte 1. The declared payload length fixes where the payload starts;
/// the payload itself is the remainder of the buffer (extended lengths are
/// parsed but not bounds-checked against a maximum).
pub fn parse_frame(buffer: &[u8]) -> FrameEvent {
    if buffer.len() < 2 {
        return FrameEvent::Ignored;
    }

    let opcode = buffer[0] & 0x0F;

    if opcode == OPCODE_CLOSE {
        return FrameEvent::Close;
    }
    if opcode != OPCODE_TEXT && opcode != OPCODE_BINARY {
        debug!(opcode, "Dropping frame with unhandled opcode");
        return FrameEvent::Ignored;
    }

    let mut offset = 2usize;

    // payload length: low 7 bits of byte 1, with 126/127 selecting
    // 16-bit / 64-bit big-endian extended fields
    let payload_length = buffer[1] & 0x7F;
    if payload_length == LEN_U16_MARKER {
        offset += 2;
    } else if payload_length == LEN_U64_MARKER {
        offset += 8;
    }

    let masked = (buffer[1] >> 7) & 0x1 == 1;

    if masked {
        if buffer.len() < offset + 4 {
            return FrameEvent::Ignored;
        }
        let mut key = [0u8; 4];
        key.copy_from_slice(&buffer[offset..offset + 4]);
        offset += 4;

        if buffer.len() < offset {
            return FrameEvent::Ignored;
        }
        return FrameEvent::Payload(unmask(&buffer[offset..], key));
    }

    if buffer.len() < offset {
        return FrameEvent::Ignored;
    }
    FrameEvent::Payload(buffer[offset..].to_vec())
}

/// Build an outbound frame around a payload.
///
/// Always FIN=1 with the text opcode; server-to-client frames are
/// conventionally unmasked. The 125/126/127 length classification matches
/// the parse side, with both extended classes written big-endian.
pub fn build_frame(payload: &[u8]) -> Vec<u8> {
    let payload_length = payload.len();

    let mut buffer = Vec::with_capacity(payload_length + 10);

    // [FIN(1), RSV1(0), RSV2(0), RSV3(0), opcode text]
    buffer.push(0x80 | OPCODE_TEXT);

    if payload_length > u16::MAX as usize {
        buffer.push(LEN_U64_MARKER);
        buffer.extend_from_slice(&(payload_length as u64).to_be_bytes());
    } else if payload_length > MAX_INLINE_LEN {
        buffer.push(LEN_U16_MARKER);
        buffer.extend_from_slice(&(payload_length as u16).to_be_bytes());
    } else {
        buffer.push(payload_length as u8);
    }

    buffer.extend_from_slice(payload);
    buffer
}

/// XOR each payload byte against the mask-key byte at `index % 4`,
/// with the key bytes taken in network order off the wire.
fn unmask(payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    payload
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ key[i % 4])
        .collect()
}
