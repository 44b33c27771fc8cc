//! Per-request orchestration: connect, send, reconnect once, relay

use crate::connect::{ConnectionManager, Connector, SocketConnector};
use crate::connection::{BackendConnection, Phase};
use crate::reconnect::ReconnectController;
use crate::relay::{RelayStats, ResponseRelay};
use bytes::{Bytes, BytesMut};
use interlink_common::{BridgeConfig, BridgeError, PhaseTimeouts, Result};
use interlink_protocol::{LinkCodec, RequestContext};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Run `fut` under a hard time limit, reporting expiry as a timeout of
/// `phase`.
pub async fn with_timeout<T, F>(phase: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| BridgeError::Timeout(phase))?
}

/// The bridging engine shared by both adapters.
///
/// Holds only read-only configuration; every call to [`Bridge::open`] owns
/// its own connection and buffers.
#[derive(Debug, Clone)]
pub struct Bridge<C = SocketConnector> {
    manager: ConnectionManager<C>,
    codec: LinkCodec,
    relay: ResponseRelay,
    timeouts: PhaseTimeouts,
}

impl Bridge<SocketConnector> {
    /// Build a bridge over real sockets. `apply_rewrites` turns on the path,
    /// script-name and redirect rewrites of the request encoder.
    pub fn from_config(config: &BridgeConfig, apply_rewrites: bool) -> Result<Self> {
        Self::with_connector(config, apply_rewrites, SocketConnector)
    }
}

impl<C: Connector> Bridge<C> {
    pub fn with_connector(config: &BridgeConfig, apply_rewrites: bool, connector: C) -> Result<Self> {
        config.validate()?;

        let manager = ConnectionManager::with_connector(
            config.endpoints.clone(),
            config.connect.clone(),
            connector,
        )
        .with_attempt_timeout(config.timeouts.connect_attempt);
        let codec = if apply_rewrites {
            LinkCodec::with_rewrite(config.rewrite.clone())
        } else {
            LinkCodec::new()
        };

        Ok(Self {
            manager,
            codec,
            relay: ResponseRelay::new(config.segment_capacity),
            timeouts: config.timeouts.clone(),
        })
    }

    pub fn timeouts(&self) -> &PhaseTimeouts {
        &self.timeouts
    }

    /// Connect to the backend and deliver the framed request.
    ///
    /// The request is framed before connecting, so a path that fails to
    /// decode never reaches the backend. A broken pipe during the send is
    /// retried once on a fresh connection. On success the connection is
    /// waiting for the response.
    pub async fn open(&self, request: &RequestContext) -> Result<BackendConnection> {
        let mut frame = BytesMut::new();
        self.codec.encode_request(request, &mut frame)?;
        let frame = frame.freeze();

        let mut controller = ReconnectController::new();
        loop {
            let mut conn = self.manager.connect().await?;

            match with_timeout("send", self.timeouts.send, send_frame(&mut conn, &frame)).await {
                Ok(()) => {
                    conn.set_phase(Phase::AwaitingResponse);
                    debug!(endpoint = %conn.endpoint(), bytes = frame.len(), "request sent");
                    return Ok(conn);
                }
                Err(e) if controller.on_send_error(&e, &conn) => {
                    warn!(
                        endpoint = %conn.endpoint(),
                        "backend closed the connection before reading the request, reconnecting"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Stream the rest of the response, including any bytes already
    /// buffered by the head scanner, to `sink`.
    pub async fn relay_to<W>(
        &self,
        backend: &mut BufReader<BackendConnection>,
        sink: &mut W,
    ) -> Result<RelayStats>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        backend.get_mut().set_phase(Phase::Streaming);
        self.relay.run(backend, sink).await
    }
}

async fn send_frame(conn: &mut BackendConnection, frame: &Bytes) -> Result<()> {
    conn.write_all(frame)
        .await
        .map_err(BridgeError::ProtocolWrite)?;
    conn.flush().await.map_err(BridgeError::ProtocolWrite)
}
