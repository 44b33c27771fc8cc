#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for `Interlink`
//!
//! These tests run the bridge against an in-process stub backend.

mod connect_test;
mod frontend_test;
mod redirect_test;
mod relay_test;

use interlink_common::{BridgeConfig, ConnectPolicy, Endpoint};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Bridge configuration pointing at `endpoints`, with no delay between
/// connection rounds.
pub fn config_for(endpoints: Vec<Endpoint>) -> BridgeConfig {
    BridgeConfig {
        endpoints,
        connect: ConnectPolicy {
            tries: 2,
            retry_delay_secs: 0,
        },
        ..BridgeConfig::default()
    }
}

/// A CGI response with the given head lines and body.
pub fn cgi_response(head: &[&str], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in head {
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

/// Send a raw HTTP/1.0 request and return the whole response as text.
pub async fn http_exchange(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("response timed out")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Split a raw response into its head and body.
pub fn split_response(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").unwrap_or((response, ""))
}
