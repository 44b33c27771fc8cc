//! Bridging engine for `Interlink`
//!
//! One [`Bridge`] call serves one request: the [`ConnectionManager`] opens a
//! backend connection, the link codec frames the request onto it, and once
//! the caller has looked at the response head the [`ResponseRelay`] pumps
//! the rest of the reply to the client sink.

pub mod bridge;
pub mod buffer;
pub mod connect;
pub mod connection;
pub mod disposition;
pub mod reconnect;
pub mod relay;
pub mod transport;

pub use bridge::{with_timeout, Bridge};
pub use buffer::SegmentChain;
pub use connect::{ConnectionManager, Connector, SocketConnector};
pub use connection::{BackendConnection, Phase};
pub use disposition::{drain, redirect_status, resolve, ResponseDisposition};
pub use reconnect::{ReconnectController, ReconnectState};
pub use relay::{RelayStats, ResponseRelay};
