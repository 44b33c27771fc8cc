//! Response pump from the backend to the client sink

use crate::buffer::SegmentChain;
use interlink_common::{BridgeError, Result, DEFAULT_SEGMENT_CAPACITY};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Byte counts of one finished relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub segments: usize,
}

enum Event {
    Read(io::Result<usize>),
    Wrote(io::Result<usize>),
}

/// Streams the backend's remaining bytes to the client sink.
///
/// Reading and writing run independently: the backend is polled while
/// `reading` is set, the sink while `writing` is set and the head segment
/// holds unwritten bytes. The relay ends once the backend has closed and
/// every byte read from it has been written.
#[derive(Debug, Clone, Copy)]
pub struct ResponseRelay {
    segment_capacity: usize,
}

impl Default for ResponseRelay {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_CAPACITY)
    }
}

impl ResponseRelay {
    pub fn new(segment_capacity: usize) -> Self {
        Self { segment_capacity }
    }

    pub fn segment_capacity(&self) -> usize {
        self.segment_capacity
    }

    pub async fn run<R, W>(&self, backend: &mut R, sink: &mut W) -> Result<RelayStats>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut chain = SegmentChain::new(self.segment_capacity)?;
        let mut stats = RelayStats::default();
        let mut reading = true;
        let mut writing = true;

        loop {
            if writing && chain.head().is_empty() {
                writing = false;
            }
            if !reading && !writing {
                break;
            }

            let (pending, spare) = chain.split();
            let event = tokio::select! {
                biased;
                res = sink.write(pending), if writing => Event::Wrote(res),
                res = backend.read(spare), if reading => Event::Read(res),
            };

            match event {
                Event::Read(Ok(0)) => reading = false,
                Event::Read(Ok(n)) => {
                    chain.commit_read(n)?;
                    stats.bytes_read += n as u64;
                    writing = true;
                }
                Event::Read(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {}
                Event::Read(Err(e)) => return Err(BridgeError::ProtocolRead(e)),
                Event::Wrote(Ok(0)) => {
                    return Err(BridgeError::ProtocolWrite(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "client sink accepted no bytes",
                    )))
                }
                Event::Wrote(Ok(n)) => {
                    stats.bytes_written += n as u64;
                    chain.commit_write(n);
                }
                Event::Wrote(Err(e))
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Event::Wrote(Err(e)) => return Err(BridgeError::ProtocolWrite(e)),
            }
        }

        sink.flush().await.map_err(BridgeError::ProtocolWrite)?;

        stats.segments = chain.segments_allocated();
        debug!(
            bytes = stats.bytes_written,
            segments = stats.segments,
            "response relayed"
        );
        Ok(stats)
    }
}
