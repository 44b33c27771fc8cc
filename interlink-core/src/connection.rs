//! One backend connection, owned by one request

use crate::transport::BoxedStream;
use interlink_common::Endpoint;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

/// Where a connection is in its single request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Sending,
    AwaitingResponse,
    Streaming,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::Sending => "sending",
            Phase::AwaitingResponse => "awaiting-response",
            Phase::Streaming => "streaming",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A connected backend socket plus the endpoint it reached.
///
/// The socket is released when the value is dropped, whatever path the
/// request took to get there.
pub struct BackendConnection {
    stream: BoxedStream,
    endpoint: Endpoint,
    phase: Phase,
    bytes_received: u64,
}

impl BackendConnection {
    pub fn new(stream: BoxedStream, endpoint: Endpoint) -> Self {
        Self {
            stream,
            endpoint,
            phase: Phase::Connecting,
            bytes_received: 0,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        debug!(endpoint = %self.endpoint, from = %self.phase, to = %phase, "backend phase");
        self.phase = phase;
    }

    /// True once any response byte has been read from the backend.
    pub fn response_started(&self) -> bool {
        self.bytes_received > 0
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

impl fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConnection")
            .field("endpoint", &self.endpoint)
            .field("phase", &self.phase)
            .field("bytes_received", &self.bytes_received)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for BackendConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let result = self.stream.as_mut().poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = result {
            self.bytes_received += (buf.filled().len() - before) as u64;
        }
        result
    }
}

impl AsyncWrite for BackendConnection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.stream.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.stream.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.stream.as_mut().poll_shutdown(cx)
    }
}

impl Drop for BackendConnection {
    fn drop(&mut self) {
        if self.phase != Phase::Closed {
            self.phase = Phase::Closed;
            debug!(
                endpoint = %self.endpoint,
                bytes = self.bytes_received,
                "backend connection released"
            );
        }
    }
}
