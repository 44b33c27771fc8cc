//! Error types for `Interlink`

use std::io;
use thiserror::Error;

/// Main error type for bridge operations.
///
/// Transient conditions (a failed connect, a single broken pipe while
/// sending) are retried inside the core and never surface here; everything
/// else is reported once to the adapter that owns the request.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Every endpoint failed in every connection round
    #[error("Connection failed: backend unavailable after {attempts} attempts")]
    ConnectionExhausted { attempts: u32 },

    /// I/O failure while framing or sending the request
    #[error("Error writing to backend: {0}")]
    ProtocolWrite(#[source] io::Error),

    /// A path field could not be decoded while framing the request
    #[error("Bad URI entities found in {field}: {reason}")]
    BadUriEntity { field: &'static str, reason: String },

    /// I/O failure while reading the backend's response
    #[error("Error reading from backend: {0}")]
    ProtocolRead(#[source] io::Error),

    /// Malformed response preamble from the backend
    #[error("Malformed header returned by backend: {0}")]
    HeaderParse(String),

    /// Buffer allocation failure
    #[error("Resource error: {0}")]
    Resource(String),

    /// A per-phase hard timeout expired
    #[error("Timeout during {0}")]
    Timeout(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error outside the backend conversation (listeners, stdio)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// True for the one send failure the reconnect controller may retry:
    /// the backend hung up before reading the request.
    pub fn is_retryable_broken_pipe(&self) -> bool {
        matches!(self, BridgeError::ProtocolWrite(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }

    /// True for every failure that happened while sending the request.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            BridgeError::ProtocolWrite(_) | BridgeError::BadUriEntity { .. }
        )
    }

    /// True for failures after the request was sent. A resource failure in
    /// the relay is reported the same way as a read failure.
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            BridgeError::ProtocolRead(_) | BridgeError::Resource(_)
        )
    }

    /// HTTP status an adapter should answer with when nothing has been sent
    /// to the client yet.
    pub fn status_hint(&self) -> u16 {
        match self {
            BridgeError::ConnectionExhausted { .. } => 503,
            BridgeError::Timeout(_) => 504,
            _ => 500,
        }
    }
}
