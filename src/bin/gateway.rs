//! Gateway demo application.
//!
//! Bridges a light-dependent resistor on the wired bridge to an actuator:
//! sensor readings arrive as data packets, and when the value crosses the
//! configured limit a switch control command is routed back to the bridge
//! instance the reading came from.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use router_gateway::bus::{BusEvent, EventBus, Topic};
use router_gateway::config::GatewayConfig;
use router_gateway::core::envelope::{Envelope, PayloadType};
use router_gateway::core::router::{CommandType, ControlPacket, InstanceId};
use router_gateway::error::Result;
use router_gateway::transport::GatewayServer;
use router_gateway::utils::logging;

/// Sensor value below which the actuator switches on
const LDR_LIMIT: i32 = 200;

const LED_ON: u8 = 100;
const LED_OFF: u8 = 0;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::from_env()?,
    };
    logging::init(&config.logging.level);

    for problem in config.validate() {
        warn!(problem, "Configuration issue");
    }

    let bus = Arc::new(EventBus::new());
    let led_state = Arc::new(AtomicU8::new(LED_OFF));

    bus.subscribe(Topic::DataPacket, move |event, conn| {
        let BusEvent::Data(packet) = event else {
            return;
        };
        if packet.source_id != InstanceId::UartBridge.as_u8() {
            return;
        }

        let reading = String::from_utf8_lossy(&packet.payload);
        let Ok(ldr_value) = reading.trim().parse::<i32>() else {
            warn!(%reading, "Unparseable sensor reading");
            return;
        };

        // switch only on a state change, not on every reading
        let current = led_state.load(Ordering::SeqCst);
        let target = if ldr_value < LDR_LIMIT { LED_ON } else { LED_OFF };
        if target == current {
            return;
        }
        led_state.store(target, Ordering::SeqCst);

        info!(ldr_value, target, "Switching actuator");

        let command = ControlPacket::encode(
            CommandType::Switch,
            InstanceId::Cloud,
            InstanceId::UartBridge,
            0,
            &[target],
        );
        conn.write(Envelope::encode(PayloadType::Control, &command));
    })?;

    let server = GatewayServer::bind(&config, bus).await?;
    server.run().await
}
