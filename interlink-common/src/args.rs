//! Backend options shared by the `interlink` binaries

use crate::config::{AdmissionConfig, BridgeConfig, ConnectPolicy, PhaseTimeouts, RewriteConfig};
use crate::constants::{
    DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_CONNECT_TRIES, DEFAULT_RESPONSE_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_SEGMENT_CAPACITY, DEFAULT_SEND_TIMEOUT_SECS,
};
use crate::endpoint::Endpoint;
use crate::error::Result;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// UNIX socket of the backend; takes precedence over --host/--port
    #[arg(long, env = "INTERLINK_SOCKET")]
    pub socket: Option<String>,

    /// Backend host
    #[arg(long, default_value = DEFAULT_BACKEND_HOST, env = "INTERLINK_HOST")]
    pub host: String,

    /// Backend TCP port
    #[arg(
        long,
        default_value_t = DEFAULT_BACKEND_PORT,
        env = "INTERLINK_PORT",
        value_parser = clap::value_parser!(u16).range(101..)
    )]
    pub port: u16,

    /// Backup backend (`/path/to/socket` or `host[:port]`)
    #[arg(long, env = "INTERLINK_BACKUP")]
    pub backup: Option<Endpoint>,

    /// Connection rounds before giving up
    #[arg(long, default_value_t = DEFAULT_CONNECT_TRIES, env = "INTERLINK_CONNECT_TRIES")]
    pub connect_tries: u32,

    /// Seconds between connection rounds
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_SECS, env = "INTERLINK_RETRY_DELAY")]
    pub retry_delay: u64,

    /// Mount point stripped from paths sent to the backend
    #[arg(long, default_value = "", env = "INTERLINK_LOCATION")]
    pub location: String,

    /// Script name sent to the backend instead of `/<location>`
    #[arg(long, env = "INTERLINK_SCRIPT_NAME")]
    pub script_name: Option<String>,

    /// Path prefixes the bridge leaves to the host (comma separated)
    #[arg(long, env = "INTERLINK_ORDINARY_FILES", value_delimiter = ',')]
    pub ordinary_files: Vec<String>,

    /// Path substrings answered with "not found" (comma separated)
    #[arg(long, env = "INTERLINK_DROP_LIST", value_delimiter = ',')]
    pub drop_list: Vec<String>,

    /// Seconds allowed for one connect attempt
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, env = "INTERLINK_CONNECT_TIMEOUT")]
    pub connect_timeout: u64,

    /// Seconds allowed for sending the request
    #[arg(long, default_value_t = DEFAULT_SEND_TIMEOUT_SECS, env = "INTERLINK_SEND_TIMEOUT")]
    pub send_timeout: u64,

    /// Seconds allowed for the response head to arrive
    #[arg(long, default_value_t = DEFAULT_RESPONSE_TIMEOUT_SECS, env = "INTERLINK_RESPONSE_TIMEOUT")]
    pub response_timeout: u64,

    /// Capacity of one response buffer segment in bytes
    #[arg(long, default_value_t = DEFAULT_SEGMENT_CAPACITY, env = "INTERLINK_SEGMENT_SIZE")]
    pub segment_size: usize,
}

impl BackendArgs {
    pub fn primary(&self) -> Endpoint {
        match &self.socket {
            Some(path) if !path.is_empty() => Endpoint::unix(path.clone()),
            _ => Endpoint::inet(self.host.clone(), self.port),
        }
    }

    /// Build and validate the bridge configuration.
    pub fn to_config(&self) -> Result<BridgeConfig> {
        let mut endpoints = vec![self.primary()];
        endpoints.extend(self.backup.clone());

        let config = BridgeConfig {
            endpoints,
            connect: ConnectPolicy {
                tries: self.connect_tries,
                retry_delay_secs: self.retry_delay,
            },
            rewrite: RewriteConfig::new(self.location.clone(), self.script_name.clone()),
            admission: AdmissionConfig {
                ordinary_files: non_empty(&self.ordinary_files),
                drop_list: non_empty(&self.drop_list),
            },
            timeouts: PhaseTimeouts {
                connect_attempt: Duration::from_secs(self.connect_timeout),
                send: Duration::from_secs(self.send_timeout),
                response_head: Duration::from_secs(self.response_timeout),
            },
            segment_capacity: self.segment_size,
        };
        config.validate()?;
        Ok(config)
    }
}

fn non_empty(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
