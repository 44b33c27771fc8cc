//! Default ports, limits and addresses for Interlink.
//!
//! Use these constants instead of magic numbers so defaults stay consistent
//! across the library, the CGI link program and the HTTP front-end.

/// Default TCP port the backend application server listens on.
pub const DEFAULT_BACKEND_PORT: u16 = 7786;

/// Default backend host when no endpoint is configured.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";

/// Lowest TCP port accepted in an inet endpoint specification.
pub const MIN_BACKEND_PORT: u16 = 101;

/// Number of connection rounds before giving up.
pub const DEFAULT_CONNECT_TRIES: u32 = 10;

/// Seconds to sleep between two failed connection rounds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Primary plus one backup.
pub const MAX_ENDPOINTS: usize = 2;

/// Capacity of one segment in the response buffer chain (16KB).
pub const DEFAULT_SEGMENT_CAPACITY: usize = 16 * 1024;

/// Maximum number of internal redirects followed for one client request.
pub const MAX_INTERNAL_REDIRECTS: usize = 10;

/// Default bind address for the HTTP front-end (`0.0.0.0:8080`).
pub const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8080";

/// Per-attempt connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeout for writing the whole framed request, in seconds.
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 60;

/// Timeout for the backend's response head to arrive, in seconds.
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 300;
