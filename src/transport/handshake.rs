//! # Upgrade Handshake
//!
//! Parses the HTTP-style upgrade request and computes the accept token
//! that switches the socket to the framed transport.
//!
//! The accept token is the fixed GUID-suffix-and-digest rule from
//! RFC 6455: base64(sha1(client_key ++ GUID)). Pure functions, no state
//! per request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

/// Fixed GUID appended to the client key before digesting
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the accept token for a client upgrade key.
pub fn accept_token(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// A parsed HTTP request head.
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    /// First line of the request, e.g. `GET / HTTP/1.1`
    pub request_line: String,
    /// Header name/value pairs in arrival order
    pub headers: Vec<(String, String)>,
}

impl UpgradeRequest {
    /// Parse the request head (everything before the blank line).
    pub fn parse(head: &str) -> Self {
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();

        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        Self {
            request_line,
            headers,
        }
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `Upgrade` header value, when present.
    pub fn upgrade(&self) -> Option<&str> {
        self.header("Upgrade")
    }

    /// Whether the request asks for the websocket transport.
    pub fn wants_websocket(&self) -> bool {
        self.upgrade()
            .map(|value| value.eq_ignore_ascii_case("websocket"))
            .unwrap_or(false)
    }

    /// The client's opaque upgrade key, when present.
    pub fn websocket_key(&self) -> Option<&str> {
        self.header("Sec-WebSocket-Key")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_accept_token_reference_vector() {
        // RFC 6455 section 1.3 example
        assert_eq!(
            accept_token("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_parse_upgrade_request() {
        let request = UpgradeRequest::parse(
            "GET / HTTP/1.1\r\n\
             Host: gateway.local\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==",
        );

        assert_eq!(request.request_line, "GET / HTTP/1.1");
        assert!(request.wants_websocket());
        assert_eq!(
            request.websocket_key(),
            Some("dGhlIHNhbXBsZSBub25jZQ==")
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = UpgradeRequest::parse("GET / HTTP/1.1\r\nUPGRADE: WebSocket");
        assert!(request.wants_websocket());
        assert_eq!(request.header("upgrade"), Some("WebSocket"));
    }

    #[test]
    fn test_plain_request_is_not_an_upgrade() {
        let request = UpgradeRequest::parse("GET /status HTTP/1.1\r\nHost: gateway.local");
        assert!(!request.wants_websocket());
        assert!(request.upgrade().is_none());
        assert!(request.websocket_key().is_none());
    }
}
