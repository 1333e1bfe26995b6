//! End-to-end tests against a live gateway listener
//!
//! Each test binds its own server on an ephemeral port and speaks the
//! upgrade exchange and frame protocol over a real TCP socket.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

use router_gateway::bus::{BusEvent, EventBus, Topic};
use router_gateway::config::GatewayConfig;
use router_gateway::core::envelope::{Envelope, PayloadType};
use router_gateway::core::frame::{parse_frame, FrameEvent};
use router_gateway::transport::GatewayServer;

const UPGRADE_REQUEST: &str = "GET / HTTP/1.1\r\n\
    Host: gateway.test\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n";

async fn start_server(bus: Arc<EventBus>) -> SocketAddr {
    let config = GatewayConfig::default_with_overrides(|c| {
        c.server.address = "127.0.0.1".to_string();
        c.server.port = 0;
    });

    let server = GatewayServer::bind(&config, bus)
        .await
        .expect("bind ephemeral port");
    let addr = server.local_addr().expect("bound address");
    tokio::spawn(server.run());
    addr
}

/// Read whatever the server answers until it pauses or closes.
async fn read_response(stream: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match tokio::time::timeout(Duration::from_millis(500), stream.read(&mut chunk)).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(n)) => response.extend_from_slice(&chunk[..n]),
            Ok(Err(_)) => break,
        }
    }
    response
}

async fn upgraded_client(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(UPGRADE_REQUEST.as_bytes())
        .await
        .expect("send upgrade");

    let mut response = vec![0u8; 1024];
    let n = stream.read(&mut response).await.expect("read 101");
    let response = String::from_utf8_lossy(&response[..n]).to_string();
    assert!(response.starts_with("HTTP/1.1 101 Switching Protocols"));
    assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
    stream
}

#[tokio::test]
async fn test_plain_request_gets_upgrade_required() {
    let addr = start_server(Arc::new(EventBus::new())).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"GET /status HTTP/1.1\r\nHost: gateway.test\r\n\r\n")
        .await
        .expect("send request");

    let response = String::from_utf8_lossy(&read_response(&mut stream).await).to_string();
    assert!(response.starts_with("HTTP/1.1 426 Upgrade Required"));
    assert!(response.ends_with("Upgrade Required"));
}

#[tokio::test]
async fn test_upgrade_without_key_is_terminal() {
    let addr = start_server(Arc::new(EventBus::new())).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: gateway.test\r\nUpgrade: websocket\r\n\r\n")
        .await
        .expect("send request");

    let response = String::from_utf8_lossy(&read_response(&mut stream).await).to_string();
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
}

#[tokio::test]
async fn test_envelope_echo_over_upgraded_connection() {
    let bus = Arc::new(EventBus::new());
    // reply on the originating connection with the decoded payload
    bus.subscribe(Topic::GenericEnvelope, |event, conn| {
        if let BusEvent::Envelope(envelope) = event {
            conn.write(Envelope::encode(PayloadType::Data, &envelope.payload));
        }
    })
    .expect("subscribe");

    let addr = start_server(bus).await;
    let mut client = upgraded_client(addr).await;

    // unmasked text frame carrying an envelope (tolerated by the parser)
    let inner = [0x01u8, 2, 0, 0x37, 0x38];
    let envelope = Envelope::encode(PayloadType::Data, &inner);
    let mut frame = vec![0x81, envelope.len() as u8];
    frame.extend_from_slice(&envelope);
    client.write_all(&frame).await.expect("send frame");

    let mut reply = vec![0u8; 1024];
    let n = client.read(&mut reply).await.expect("read reply frame");
    match parse_frame(&reply[..n]) {
        FrameEvent::Payload(payload) => {
            let echoed = Envelope::decode(&payload);
            assert!(echoed.valid);
            assert_eq!(echoed.payload, inner.to_vec());
        }
        other => panic!("expected a payload frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_address_refused_while_first_is_open() {
    let addr = start_server(Arc::new(EventBus::new())).await;

    let _first = upgraded_client(addr).await;

    // same remote address, first connection still open
    let mut second = TcpStream::connect(addr).await.expect("connect");
    second
        .write_all(UPGRADE_REQUEST.as_bytes())
        .await
        .expect("send upgrade");

    let response = read_response(&mut second).await;
    // refused: closed without a 101
    assert!(!String::from_utf8_lossy(&response).contains("101 Switching Protocols"));
}

#[tokio::test]
async fn test_address_is_reusable_after_close_frame() {
    let addr = start_server(Arc::new(EventBus::new())).await;

    let mut first = upgraded_client(addr).await;
    first.write_all(&[0x88, 0x00]).await.expect("send close");

    // deregistration races the reconnect; retry briefly
    for attempt in 0.. {
        let mut retry = TcpStream::connect(addr).await.expect("connect");
        retry
            .write_all(UPGRADE_REQUEST.as_bytes())
            .await
            .expect("send upgrade");

        let mut response = vec![0u8; 1024];
        let n = retry.read(&mut response).await.expect("read");
        if String::from_utf8_lossy(&response[..n]).contains("101 Switching Protocols") {
            return;
        }

        assert!(attempt < 50, "address never released after close frame");
        sleep(Duration::from_millis(100)).await;
    }
}
