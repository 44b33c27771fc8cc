//! Backend endpoint addressing

use crate::constants::{DEFAULT_BACKEND_PORT, MIN_BACKEND_PORT};
use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Socket family used to reach a backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointFamily {
    Unix,
    Inet,
}

/// One backend instance (primary or backup).
///
/// Immutable once built. Parse from a directive-style string with
/// [`FromStr`]: a value starting with `/` (or `unix:`) names a UNIX socket,
/// anything else is `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    family: EndpointFamily,
    address: String,
    port: Option<u16>,
}

impl Endpoint {
    /// UNIX domain socket endpoint.
    pub fn unix(path: impl Into<String>) -> Self {
        Self {
            family: EndpointFamily::Unix,
            address: path.into(),
            port: None,
        }
    }

    /// TCP endpoint.
    pub fn inet(host: impl Into<String>, port: u16) -> Self {
        Self {
            family: EndpointFamily::Inet,
            address: host.into(),
            port: Some(port),
        }
    }

    pub fn family(&self) -> EndpointFamily {
        self.family
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `host:port` form suitable for resolution. `None` for UNIX sockets.
    pub fn authority(&self) -> Option<String> {
        match self.family {
            EndpointFamily::Unix => None,
            EndpointFamily::Inet => {
                let port = self.port.unwrap_or(DEFAULT_BACKEND_PORT);
                if self.address.contains(':') {
                    Some(format!("[{}]:{port}", self.address))
                } else {
                    Some(format!("{}:{port}", self.address))
                }
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority() {
            Some(authority) => f.write_str(&authority),
            None => write!(f, "unix:{}", self.address),
        }
    }
}

impl FromStr for Endpoint {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BridgeError::Config("empty endpoint specification".into()));
        }

        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(BridgeError::Config("empty UNIX socket path".into()));
            }
            return Ok(Self::unix(path));
        }
        if s.starts_with('/') {
            return Ok(Self::unix(s));
        }

        let (host, port) = split_host_port(s)?;
        if host.is_empty() {
            return Err(BridgeError::Config(format!(
                "invalid hostname specification: {s}"
            )));
        }
        let port = match port {
            Some(p) => parse_port(p)?,
            None => DEFAULT_BACKEND_PORT,
        };
        Ok(Self::inet(host, port))
    }
}

fn split_host_port(s: &str) -> Result<(&str, Option<&str>), BridgeError> {
    if let Some(rest) = s.strip_prefix('[') {
        let Some((host, tail)) = rest.split_once(']') else {
            return Err(BridgeError::Config(format!("unterminated IPv6 address: {s}")));
        };
        return match tail {
            "" => Ok((host, None)),
            _ => match tail.strip_prefix(':') {
                Some(port) => Ok((host, Some(port))),
                None => Err(BridgeError::Config(format!("invalid endpoint: {s}"))),
            },
        };
    }
    Ok(match s.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (s, None),
    })
}

fn parse_port(p: &str) -> Result<u16, BridgeError> {
    match p.parse::<u16>() {
        Ok(port) if port >= MIN_BACKEND_PORT => Ok(port),
        _ => Err(BridgeError::Config(format!(
            "invalid port specification: {p}"
        ))),
    }
}
