//! # Packet Dispatcher
//!
//! Decodes inbound envelope payloads and publishes them on the bus.
//!
//! Every envelope produces a generic event, valid or not; the subscriber
//! decides what to do with a flagged packet. Typed events follow only for
//! known discriminants that decode cleanly. Unknown discriminants are
//! ignored on purpose so newer firmware stays compatible with this
//! gateway.

use tracing::{debug, warn};

use crate::bus::{BusEvent, ConnectionHandle, EventBus, Topic};
use crate::config::PROTOCOL_VERSION;
use crate::core::envelope::{Envelope, PayloadType};
use crate::core::router::{DataPacket, ResultPacket};
use crate::error::Result;

/// Decode one frame payload and publish the resulting packets.
pub fn dispatch(data: &[u8], bus: &EventBus, conn: &ConnectionHandle) -> Result<()> {
    let envelope = Envelope::decode(data);

    if envelope.protocol_version != PROTOCOL_VERSION {
        // a mismatch is a diagnostic, not a rejection
        warn!(
            version = envelope.protocol_version,
            "Unsupported protocol version"
        );
    }
    if !envelope.valid {
        warn!(
            declared = envelope.payload_length,
            available = envelope.payload.len(),
            "Invalid envelope size"
        );
    }

    let payload_type = envelope.payload_type;
    let payload = envelope.payload.clone();
    bus.publish(Topic::GenericEnvelope, &BusEvent::Envelope(envelope), conn)?;

    match PayloadType::from_u8(payload_type) {
        Some(PayloadType::Data) => {
            let packet = DataPacket::decode(&payload);
            if packet.valid {
                bus.publish(Topic::DataPacket, &BusEvent::Data(packet), conn)?;
            } else {
                warn!("Invalid data packet size");
            }
        }
        Some(PayloadType::Result) => {
            let packet = ResultPacket::decode(&payload);
            if packet.valid {
                bus.publish(Topic::ResultPacket, &BusEvent::Result(packet), conn)?;
            } else {
                warn!("Invalid result packet size");
            }
        }
        Some(PayloadType::Control) => {
            // control commands are outbound-only in this deployment
            debug!("Ignoring inbound control packet");
        }
        None => {
            debug!(payload_type, "Unknown payload type");
        }
    }

    Ok(())
}
