//! Common utilities and types for `Interlink`

#[cfg(feature = "cli")]
pub mod args;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;

#[cfg(feature = "cli")]
pub use args::BackendArgs;
pub use config::{AdmissionConfig, BridgeConfig, ConnectPolicy, PhaseTimeouts, RewriteConfig};
pub use constants::{
    DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_CONNECT_TRIES, DEFAULT_HTTP_BIND,
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_SEGMENT_CAPACITY, MAX_ENDPOINTS, MAX_INTERNAL_REDIRECTS,
};
pub use endpoint::{Endpoint, EndpointFamily};
pub use error::{BridgeError, Result};
