//! TCP transport

use super::socket_tuning::configure_socket_silent;
use super::BoxedStream;
use std::io;
use std::net::SocketAddr;
use tokio::net::{lookup_host, TcpStream};
use tracing::trace;

/// Resolve `host` and connect to the first address that accepts.
///
/// IPv4 addresses are tried before IPv6 ones.
pub async fn connect(host: &str, port: u16) -> io::Result<BoxedStream> {
    let mut addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();
    addrs.sort_by_key(SocketAddr::is_ipv6);

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                configure_socket_silent(&stream);
                return Ok(Box::pin(stream));
            }
            Err(e) => {
                trace!(%addr, error = %e, "tcp connect failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}"),
        )
    }))
}
