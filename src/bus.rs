//! # Event Bus
//!
//! Minimal in-process topic-addressed dispatcher moving decoded packets
//! from the transport layer to protocol logic.
//!
//! Subscribers are invoked synchronously, in registration order, on the
//! task that publishes. Outbound writes are deliberately NOT a topic:
//! every decoded event carries the [`ConnectionHandle`] of the connection
//! it arrived on, so replies always reach exactly the originating socket
//! instead of being broadcast to every connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::envelope::Envelope;
use crate::core::router::{DataPacket, ResultPacket};
use crate::error::{constants, ProtocolError, Result};

/// Topics the gateway publishes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every decoded envelope, valid or not
    GenericEnvelope,
    /// Valid inbound sensor/data packets
    DataPacket,
    /// Valid inbound result packets
    ResultPacket,
    /// Headers seen during a successful transport upgrade
    UpgradeHeaders,
    /// A connection was closed and deregistered
    ConnectionClosed,
}

/// Event payloads delivered to subscribers.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Envelope(Envelope),
    Data(DataPacket),
    Result(ResultPacket),
    UpgradeHeaders(Vec<(String, String)>),
    ConnectionClosed(SocketAddr),
}

/// Write-side handle bound to one transport connection.
///
/// Payloads sent here are framed and written by the owning connection
/// task; once that task exits the handle's sends fail quietly.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    remote_addr: SocketAddr,
    writer: mpsc::UnboundedSender<Vec<u8>>,
}

impl ConnectionHandle {
    /// Create a handle for a connection's writer channel.
    pub fn new(remote_addr: SocketAddr, writer: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            remote_addr,
            writer,
        }
    }

    /// Remote address of the connection this handle writes to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Queue an unframed payload for delivery on this connection.
    ///
    /// Returns false when the connection is already gone.
    pub fn write(&self, payload: Vec<u8>) -> bool {
        self.writer.send(payload).is_ok()
    }
}

type Subscriber = Box<dyn Fn(&BusEvent, &ConnectionHandle) + Send + Sync + 'static>;

/// Topic-addressed publish/subscribe bus.
pub struct EventBus {
    subscribers: RwLock<HashMap<Topic, Vec<Subscriber>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscriber for a topic.
    ///
    /// Subscribers on the same topic run in registration order.
    pub fn subscribe<F>(&self, topic: Topic, subscriber: F) -> Result<()>
    where
        F: Fn(&BusEvent, &ConnectionHandle) + Send + Sync + 'static,
    {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_BUS_WRITE_LOCK.to_string()))?;

        subscribers.entry(topic).or_default().push(Box::new(subscriber));
        Ok(())
    }

    /// Publish an event to every subscriber of a topic, synchronously.
    pub fn publish(&self, topic: Topic, event: &BusEvent, conn: &ConnectionHandle) -> Result<()> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_BUS_READ_LOCK.to_string()))?;

        match subscribers.get(&topic) {
            Some(list) => {
                for subscriber in list {
                    subscriber(event, conn);
                }
            }
            None => debug!(?topic, "No subscribers for topic"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn test_handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        (ConnectionHandle::new(addr, tx), rx)
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let order = order.clone();
            bus.subscribe(Topic::GenericEnvelope, move |_, _| {
                order.lock().unwrap().push(tag);
            })
            .unwrap();
        }

        let (handle, _rx) = test_handle();
        bus.publish(
            Topic::GenericEnvelope,
            &BusEvent::ConnectionClosed(handle.remote_addr()),
            &handle,
        )
        .unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counted = hits.clone();
        bus.subscribe(Topic::DataPacket, move |_, _| {
            counted.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let (handle, _rx) = test_handle();
        let event = BusEvent::ConnectionClosed(handle.remote_addr());
        bus.publish(Topic::ResultPacket, &event, &handle).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.publish(Topic::DataPacket, &event, &handle).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_delivers_to_owning_connection_only() {
        let bus = EventBus::new();
        bus.subscribe(Topic::DataPacket, |_, conn| {
            assert!(conn.write(b"reply".to_vec()));
        })
        .unwrap();

        let (handle_a, mut rx_a) = test_handle();
        let (_handle_b, mut rx_b) = test_handle();

        let event = BusEvent::ConnectionClosed(handle_a.remote_addr());
        bus.publish(Topic::DataPacket, &event, &handle_a).unwrap();

        assert_eq!(rx_a.try_recv().unwrap(), b"reply".to_vec());
        assert!(rx_b.try_recv().is_err());
    }
}
