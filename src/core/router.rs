//! # Router Sub-Packet Codecs
//!
//! Typed sub-packets carried inside the envelope payload: outbound control
//! commands plus inbound data and result packets.
//!
//! All multi-byte fields at this layer are little-endian in the current
//! protocol generation. Earlier firmware revisions used big-endian for the
//! same fields; the layouts here must be reproduced exactly and not
//! unified with other layers.
//!
//! Correlation is cooperative: the codec copies `request_id`/`result_id`
//! bytes but never matches a result to its request. That check belongs to
//! whoever issued the request.

/// Instance identifiers addressing the logical endpoints commands route
/// between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstanceId {
    /// Cloud-side controller
    Cloud = 0x00,
    /// Wired sensor/actuator bridge
    UartBridge = 0x01,
    /// Wireless peripheral behind the secure channel
    BlePeripheral = 0x02,
}

impl InstanceId {
    /// Parse a raw instance byte, or `None` for unknown endpoints.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Cloud),
            0x01 => Some(Self::UartBridge),
            0x02 => Some(Self::BlePeripheral),
            _ => None,
        }
    }

    /// Return the wire byte for this instance.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Command types understood by the router firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Flip an actuator on or off
    Switch = 0x00,
    /// Request a secure-channel session handshake from a peripheral
    SessionRequest = 0x01,
}

impl CommandType {
    /// Return the wire byte for this command type.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Result code signalling success in a [`ResultPacket`].
pub const RESULT_CODE_SUCCESS: u8 = 0x00;

/// Control packet header size before the payload
pub const CONTROL_HEADER_SIZE: usize = 7;

/// Data packet header size before the payload
pub const DATA_HEADER_SIZE: usize = 3;

/// Result packet header size before the payload
pub const RESULT_HEADER_SIZE: usize = 6;

/// Outbound control command addressed by source/destination instance.
///
/// `request_id` is caller-assigned and used solely for correlation; the
/// codec does not enforce uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    pub command_type: u8,
    pub source_id: u8,
    pub dest_id: u8,
    pub request_id: u16,
    pub payload_length: u16,
    pub payload: Vec<u8>,
    pub valid: bool,
}

impl ControlPacket {
    /// Decode a control packet from an envelope payload.
    pub fn decode(data: &[u8]) -> Self {
        if data.len() < CONTROL_HEADER_SIZE {
            return Self {
                command_type: 0,
                source_id: 0,
                dest_id: 0,
                request_id: 0,
                payload_length: 0,
                payload: Vec::new(),
                valid: false,
            };
        }

        let command_type = data[0];
        let source_id = data[1];
        let dest_id = data[2];
        let request_id = u16::from_le_bytes([data[3], data[4]]);
        let payload_length = u16::from_le_bytes([data[5], data[6]]);

        let declared_end = CONTROL_HEADER_SIZE + payload_length as usize;
        let valid = data.len() >= declared_end;
        let end = declared_end.min(data.len());

        Self {
            command_type,
            source_id,
            dest_id,
            request_id,
            payload_length,
            payload: data[CONTROL_HEADER_SIZE..end].to_vec(),
            valid,
        }
    }

    /// Encode an outbound control command.
    ///
    /// Allocates exactly `7 + payload.len()` bytes; inputs are not
    /// validated beyond that.
    pub fn encode(
        command_type: CommandType,
        source_id: InstanceId,
        dest_id: InstanceId,
        request_id: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut data = Vec::with_capacity(CONTROL_HEADER_SIZE + payload.len());

        data.push(command_type.as_u8());
        data.push(source_id.as_u8());
        data.push(dest_id.as_u8());
        data.extend_from_slice(&request_id.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(payload);

        data
    }
}

/// Inbound sensor/data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub source_id: u8,
    pub payload_length: u16,
    pub payload: Vec<u8>,
    pub valid: bool,
}

impl DataPacket {
    /// Decode a data packet from an envelope payload.
    pub fn decode(data: &[u8]) -> Self {
        if data.len() < DATA_HEADER_SIZE {
            return Self {
                source_id: 0,
                payload_length: 0,
                payload: Vec::new(),
                valid: false,
            };
        }

        let source_id = data[0];
        let payload_length = u16::from_le_bytes([data[1], data[2]]);

        let declared_end = DATA_HEADER_SIZE + payload_length as usize;
        let valid = data.len() >= declared_end;
        let end = declared_end.min(data.len());

        Self {
            source_id,
            payload_length,
            payload: data[DATA_HEADER_SIZE..end].to_vec(),
            valid,
        }
    }
}

/// Inbound result packet completing a prior control command.
///
/// `result_id` echoes the `request_id` of the operation it completes; the
/// consumer compares the two, not this codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPacket {
    pub command_type: u8,
    pub result_code: u8,
    pub result_id: u16,
    pub payload_length: u16,
    pub payload: Vec<u8>,
    pub valid: bool,
}

impl ResultPacket {
    /// Decode a result packet from an envelope payload.
    pub fn decode(data: &[u8]) -> Self {
        if data.len() < RESULT_HEADER_SIZE {
            return Self {
                command_type: 0,
                result_code: 0,
                result_id: 0,
                payload_length: 0,
                payload: Vec::new(),
                valid: false,
            };
        }

        let command_type = data[0];
        let result_code = data[1];
        let result_id = u16::from_le_bytes([data[2], data[3]]);
        let payload_length = u16::from_le_bytes([data[4], data[5]]);

        let declared_end = RESULT_HEADER_SIZE + payload_length as usize;
        let valid = data.len() >= declared_end;
        let end = declared_end.min(data.len());

        Self {
            command_type,
            result_code,
            result_id,
            payload_length,
            payload: data[RESULT_HEADER_SIZE..end].to_vec(),
            valid,
        }
    }
}
