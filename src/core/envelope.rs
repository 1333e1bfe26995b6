//! # Envelope Codec
//!
//! The outer binary envelope common to every router-protocol message.
//!
//! ## Wire Format
//! ```text
//! [Version(1)] [PayloadType(1)] [Length(2, LE)] [Payload(N)]
//! ```
//!
//! A declared length larger than the remaining buffer marks the envelope
//! invalid; the payload is clamped to what is actually available so a
//! truncated envelope never reads out of bounds. A protocol-version
//! mismatch is surfaced as a diagnostic by the dispatcher, never a
//! rejection.

use crate::config::{ENVELOPE_HEADER_SIZE, PROTOCOL_VERSION};

/// Payload-type discriminant values carried in the envelope.
///
/// Unknown values are ignored by the dispatcher so newer firmware can add
/// types without breaking older gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadType {
    /// Outbound control command addressed to an instance
    Control = 0x00,
    /// Inbound sensor/data payload
    Data = 0x01,
    /// Inbound result completing a prior request
    Result = 0x02,
}

impl PayloadType {
    /// Parse a raw discriminant byte, or `None` for unknown values.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Control),
            0x01 => Some(Self::Data),
            0x02 => Some(Self::Result),
            _ => None,
        }
    }

    /// Return the wire byte for this payload type.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Decoded outer envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Protocol generation claimed by the sender
    pub protocol_version: u8,
    /// Raw payload-type discriminant
    pub payload_type: u8,
    /// Declared payload length
    pub payload_length: u16,
    /// Payload bytes, clamped to the available buffer
    pub payload: Vec<u8>,
    /// False when the declared length exceeds the available bytes
    pub valid: bool,
}

impl Envelope {
    /// Decode an envelope from an inbound buffer.
    pub fn decode(data: &[u8]) -> Self {
        if data.len() < ENVELOPE_HEADER_SIZE {
            return Self {
                protocol_version: 0,
                payload_type: 0,
                payload_length: 0,
                payload: Vec::new(),
                valid: false,
            };
        }

        let protocol_version = data[0];
        let payload_type = data[1];
        // length arrives little-endian, matching the router firmware
        let payload_length = u16::from_le_bytes([data[2], data[3]]);

        let declared_end = ENVELOPE_HEADER_SIZE + payload_length as usize;
        let valid = data.len() >= declared_end;
        let end = declared_end.min(data.len());

        Self {
            protocol_version,
            payload_type,
            payload_length,
            payload: data[ENVELOPE_HEADER_SIZE..end].to_vec(),
            valid,
        }
    }

    /// Encode an outbound envelope around a payload.
    ///
    /// Writes the canonical version constant and allocates exactly
    /// `4 + payload.len()` bytes.
    pub fn encode(payload_type: PayloadType, payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());

        data.push(PROTOCOL_VERSION);
        data.push(payload_type.as_u8());
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(payload);

        data
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        for payload_type in [PayloadType::Control, PayloadType::Data, PayloadType::Result] {
            let payload = vec![1, 2, 3, 4, 5];
            let encoded = Envelope::encode(payload_type, &payload);
            assert_eq!(encoded.len(), 4 + payload.len());

            let decoded = Envelope::decode(&encoded);
            assert!(decoded.valid);
            assert_eq!(decoded.protocol_version, PROTOCOL_VERSION);
            assert_eq!(decoded.payload_type, payload_type.as_u8());
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn test_length_field_is_little_endian() {
        let encoded = Envelope::encode(PayloadType::Data, &[0u8; 0x0102]);
        assert_eq!(encoded[2], 0x02);
        assert_eq!(encoded[3], 0x01);
    }

    #[test]
    fn test_truncated_envelope_flagged_not_crashed() {
        // declares 10 payload bytes but only 5 are available
        let mut data = vec![PROTOCOL_VERSION, 0x01, 10, 0];
        data.extend_from_slice(&[9, 9, 9, 9, 9]);

        let decoded = Envelope::decode(&data);
        assert!(!decoded.valid);
        assert_eq!(decoded.payload_length, 10);
        assert_eq!(decoded.payload.len(), 5);
    }

    #[test]
    fn test_short_header_is_invalid() {
        assert!(!Envelope::decode(&[]).valid);
        assert!(!Envelope::decode(&[1, 2, 3]).valid);
    }

    #[test]
    fn test_unknown_discriminant_round_trips_raw() {
        let mut encoded = Envelope::encode(PayloadType::Data, b"x");
        encoded[1] = 0x7F;
        let decoded = Envelope::decode(&encoded);
        assert!(decoded.valid);
        assert_eq!(decoded.payload_type, 0x7F);
        assert!(PayloadType::from_u8(decoded.payload_type).is_none());
    }
}
