//! Backend transports: unix-domain and TCP sockets behind one stream type

use interlink_common::{Endpoint, EndpointFamily};
use std::io;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

pub mod socket_tuning;
pub mod tcp;
pub mod unix;

pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

pub type BoxedStream = Pin<Box<dyn AsyncStream>>;

/// Open one socket to `endpoint`. No retries here; see
/// [`ConnectionManager`](crate::ConnectionManager).
pub async fn connect(endpoint: &Endpoint) -> io::Result<BoxedStream> {
    match endpoint.family() {
        EndpointFamily::Unix => unix::connect(endpoint.address()).await,
        EndpointFamily::Inet => {
            let port = endpoint.port().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "inet endpoint without a port")
            })?;
            tcp::connect(endpoint.address(), port).await
        }
    }
}
