//! Connection establishment with bounded retry rounds

use crate::connection::{BackendConnection, Phase};
use crate::transport::{self, BoxedStream};
use interlink_common::{BridgeError, ConnectPolicy, Endpoint, Result};
use std::future::Future;
use std::io;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Opens a single socket to a single endpoint.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> impl Future<Output = io::Result<BoxedStream>> + Send;
}

/// Connector over real unix-domain and TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

impl Connector for SocketConnector {
    fn connect(&self, endpoint: &Endpoint) -> impl Future<Output = io::Result<BoxedStream>> + Send {
        transport::connect(endpoint)
    }
}

/// Produces a connected backend socket from an ordered endpoint list.
///
/// Every round sweeps the whole list in order and the first endpoint that
/// accepts wins, so a backup is tried right after the primary instead of
/// after the primary's whole retry budget. Between rounds the manager
/// sleeps for the policy's retry delay; there is no sleep after the last.
#[derive(Debug, Clone)]
pub struct ConnectionManager<C = SocketConnector> {
    endpoints: Vec<Endpoint>,
    policy: ConnectPolicy,
    attempt_timeout: Option<Duration>,
    connector: C,
}

impl ConnectionManager<SocketConnector> {
    pub fn new(endpoints: Vec<Endpoint>, policy: ConnectPolicy) -> Self {
        Self::with_connector(endpoints, policy, SocketConnector)
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn with_connector(endpoints: Vec<Endpoint>, policy: ConnectPolicy, connector: C) -> Self {
        Self {
            endpoints,
            policy,
            attempt_timeout: None,
            connector,
        }
    }

    /// Bound every single connect attempt. An attempt that runs out of time
    /// counts as a failed attempt.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn policy(&self) -> &ConnectPolicy {
        &self.policy
    }

    pub async fn connect(&self) -> Result<BackendConnection> {
        let mut attempts: u32 = 0;

        for round in 0..self.policy.tries {
            for (index, endpoint) in self.endpoints.iter().enumerate() {
                if index > 0 {
                    warn!(%endpoint, round, "attempting backup endpoint");
                }
                attempts = attempts.saturating_add(1);

                match self.attempt(endpoint).await {
                    Ok(stream) => {
                        debug!(%endpoint, round, attempts, "connected to backend");
                        let mut conn = BackendConnection::new(stream, endpoint.clone());
                        conn.set_phase(Phase::Sending);
                        return Ok(conn);
                    }
                    Err(e) => debug!(%endpoint, round, error = %e, "connect attempt failed"),
                }
            }

            if round + 1 < self.policy.tries && !self.policy.retry_delay().is_zero() {
                tokio::time::sleep(self.policy.retry_delay()).await;
            }
        }

        error!(attempts, "backend unavailable, connect tries exhausted");
        Err(BridgeError::ConnectionExhausted { attempts })
    }

    async fn attempt(&self, endpoint: &Endpoint) -> io::Result<BoxedStream> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connector.connect(endpoint))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect attempt timed out"))?,
            None => self.connector.connect(endpoint).await,
        }
    }
}
