//! Configuration types for `Interlink`
//!
//! Everything here arrives already parsed from the host's directives or the
//! link program's environment; the core only reads it.

use crate::constants::{
    DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_CONNECT_TRIES, DEFAULT_RESPONSE_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_SEGMENT_CAPACITY, DEFAULT_SEND_TIMEOUT_SECS, MAX_ENDPOINTS,
};
use crate::endpoint::Endpoint;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectPolicy {
    /// Number of rounds; every round sweeps the whole endpoint list
    pub tries: u32,
    /// Seconds to sleep after a round in which no endpoint answered
    pub retry_delay_secs: u64,
}

impl ConnectPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            tries: DEFAULT_CONNECT_TRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

/// Field rewrites applied while framing a request for the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    location_prefix: String,
    script_name_override: Option<String>,
}

impl RewriteConfig {
    pub fn new(location_prefix: impl Into<String>, script_name_override: Option<String>) -> Self {
        Self {
            location_prefix: location_prefix.into(),
            script_name_override: script_name_override.filter(|s| !s.is_empty()),
        }
    }

    /// Mount point without leading or trailing slashes (`""` for the root).
    pub fn location_prefix(&self) -> &str {
        self.location_prefix.trim_matches('/')
    }

    pub fn script_name_override(&self) -> Option<&str> {
        self.script_name_override.as_deref()
    }

    /// Value sent for the script-name field.
    pub fn script_name(&self) -> String {
        match self.script_name_override() {
            Some(name) => name.to_string(),
            None => format!("/{}", self.location_prefix()),
        }
    }
}

/// Request admission lists consulted before the core runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Paths starting with one of these are left to the host
    pub ordinary_files: Vec<String>,
    /// Paths containing one of these are answered with "not found"
    pub drop_list: Vec<String>,
}

/// Hard per-phase timeouts enforced by the adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimeouts {
    /// One connect attempt to one endpoint
    pub connect_attempt: Duration,
    /// Writing and flushing the whole framed request
    pub send: Duration,
    /// Waiting for the backend's response head
    pub response_head: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            connect_attempt: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            send: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            response_head: Duration::from_secs(DEFAULT_RESPONSE_TIMEOUT_SECS),
        }
    }
}

/// Combined bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Primary endpoint first, optional backup second
    pub endpoints: Vec<Endpoint>,
    pub connect: ConnectPolicy,
    pub rewrite: RewriteConfig,
    pub admission: AdmissionConfig,
    pub timeouts: PhaseTimeouts,
    /// Capacity of one segment in the response buffer chain
    pub segment_capacity: usize,
}

impl BridgeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(BridgeError::Config("at least one endpoint is required".into()));
        }
        if self.endpoints.len() > MAX_ENDPOINTS {
            return Err(BridgeError::Config(format!(
                "at most {MAX_ENDPOINTS} endpoints (primary and backup) are supported"
            )));
        }
        if self.connect.tries == 0 {
            return Err(BridgeError::Config("connect tries must be at least 1".into()));
        }
        if self.segment_capacity == 0 {
            return Err(BridgeError::Config("segment capacity must be non-zero".into()));
        }
        Ok(())
    }

    pub fn primary(&self) -> Option<&Endpoint> {
        self.endpoints.first()
    }

    pub fn backup(&self) -> Option<&Endpoint> {
        self.endpoints.get(1)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![Endpoint::inet(DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT)],
            connect: ConnectPolicy::default(),
            rewrite: RewriteConfig::default(),
            admission: AdmissionConfig::default(),
            timeouts: PhaseTimeouts::default(),
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
        }
    }
}
