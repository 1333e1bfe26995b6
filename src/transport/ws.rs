//! # Gateway Server
//!
//! TCP listener that upgrades inbound sockets to the framed transport and
//! drives one task per connection.
//!
//! Bytes on a connection are processed strictly in arrival order: each
//! chunk is parsed as one frame and fully dispatched before the next
//! chunk is read. Across connections there is no ordering guarantee. A
//! close frame or socket error tears the connection down immediately and
//! discards any partially-decoded state; retry policy belongs to the
//! application layer.

use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bus::{BusEvent, ConnectionHandle, EventBus, Topic};
use crate::config::GatewayConfig;
use crate::core::frame::{build_frame, parse_frame, FrameEvent};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::dispatcher;
use crate::transport::handshake::{accept_token, UpgradeRequest};
use crate::transport::registry::ConnectionRegistry;

/// Fixed response for plain (non-upgrade) requests
const UPGRADE_REQUIRED_RESPONSE: &str =
    "HTTP/1.1 426 Upgrade Required\r\nContent-Type: text/plain\r\nUpgrade: WebSocket\r\n\r\nUpgrade Required";

/// Terminal response for malformed upgrade attempts
const BAD_REQUEST_RESPONSE: &str = "HTTP/1.1 400 Bad Request\r\n\r\n";

/// Upper bound on the upgrade request head
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// The gateway's listening endpoint.
pub struct GatewayServer {
    listener: TcpListener,
    bus: Arc<EventBus>,
    registry: Arc<ConnectionRegistry>,
}

impl GatewayServer {
    /// Bind the configured listening endpoint.
    pub async fn bind(config: &GatewayConfig, bus: Arc<EventBus>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.address, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(address = %addr, "Gateway listening");

        Ok(Self {
            listener,
            bus,
            registry: Arc::new(ConnectionRegistry::new()),
        })
    }

    /// Actual bound address (useful when the port was 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared registry of live connections.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Accept connections until CTRL+C.
    pub async fn run(self) -> Result<()> {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received CTRL+C signal, shutting down");
                    return Ok(());
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let bus = self.bus.clone();
                            let registry = self.registry.clone();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr, bus, registry).await {
                                    debug!(peer = %addr, error = %e, "Connection ended with error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Error accepting connection");
                        }
                    }
                }
            }
        }
    }
}

/// Read the HTTP request head, up to the blank line.
async fn read_request_head(stream: &mut TcpStream) -> Result<String> {
    let mut buffer = BytesMut::with_capacity(1024);

    loop {
        if stream.read_buf(&mut buffer).await? == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }

        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            return Ok(String::from_utf8_lossy(&buffer[..end]).to_string());
        }

        if buffer.len() > MAX_REQUEST_HEAD {
            return Err(ProtocolError::HandshakeError(
                "request head too large".to_string(),
            ));
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    bus: Arc<EventBus>,
    registry: Arc<ConnectionRegistry>,
) -> Result<()> {
    let head = read_request_head(&mut stream).await?;
    let request = UpgradeRequest::parse(&head);

    // plain requests get the fixed upgrade-required status and body
    if request.upgrade().is_none() {
        stream.write_all(UPGRADE_REQUIRED_RESPONSE.as_bytes()).await?;
        return Ok(());
    }

    if !request.wants_websocket() {
        stream.write_all(BAD_REQUEST_RESPONSE.as_bytes()).await?;
        return Err(ProtocolError::HandshakeError(
            constants::ERR_MISSING_UPGRADE.to_string(),
        ));
    }

    let token = match request.websocket_key() {
        Some(key) => accept_token(key),
        None => {
            stream.write_all(BAD_REQUEST_RESPONSE.as_bytes()).await?;
            return Err(ProtocolError::HandshakeError(
                constants::ERR_MISSING_KEY.to_string(),
            ));
        }
    };

    if !registry.accept(addr.ip())? {
        warn!(peer = %addr, "Refusing connection, address already connected");
        return Err(ProtocolError::ConnectionRefused(addr.to_string()));
    }

    let (writer_tx, writer_rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(addr, writer_tx);

    let result = drive_connection(stream, &request, &token, &bus, &handle, writer_rx).await;

    registry.release(addr.ip())?;
    bus.publish(
        Topic::ConnectionClosed,
        &BusEvent::ConnectionClosed(addr),
        &handle,
    )?;
    info!(peer = %addr, "Connection closed");

    result
}

/// Complete the upgrade, then pump frames until close or error.
async fn drive_connection(
    mut stream: TcpStream,
    request: &UpgradeRequest,
    token: &str,
    bus: &EventBus,
    handle: &ConnectionHandle,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
) -> Result<()> {
    let response = [
        "HTTP/1.1 101 Switching Protocols".to_string(),
        "Upgrade: websocket".to_string(),
        "Connection: Upgrade".to_string(),
        format!("Sec-WebSocket-Accept: {token}"),
        "\r\n".to_string(),
    ]
    .join("\r\n");
    stream.write_all(response.as_bytes()).await?;

    info!(peer = %handle.remote_addr(), "Connection upgraded");
    bus.publish(
        Topic::UpgradeHeaders,
        &BusEvent::UpgradeHeaders(request.headers.clone()),
        handle,
    )?;

    let (mut reader, mut writer) = stream.into_split();
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        tokio::select! {
            read_result = reader.read_buf(&mut buffer) => {
                if read_result? == 0 {
                    return Ok(());
                }

                // one chunk is decoded to completion before the next is read
                match parse_frame(&buffer) {
                    FrameEvent::Payload(payload) => {
                        dispatcher::dispatch(&payload, bus, handle)?;
                    }
                    FrameEvent::Close => {
                        debug!(peer = %handle.remote_addr(), "Close frame received");
                        return Ok(());
                    }
                    FrameEvent::Ignored => {}
                }
                buffer.clear();
            }

            queued = outbound.recv() => {
                match queued {
                    Some(payload) => {
                        writer.write_all(&build_frame(&payload)).await?;
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}
