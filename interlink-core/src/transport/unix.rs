//! Unix-domain socket transport

use super::BoxedStream;
use std::io;

#[cfg(unix)]
pub async fn connect(path: &str) -> io::Result<BoxedStream> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    Ok(Box::pin(stream))
}

#[cfg(not(unix))]
pub async fn connect(path: &str) -> io::Result<BoxedStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("unix sockets are not available on this platform: {path}"),
    ))
}
