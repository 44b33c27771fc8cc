//! Logging for `Interlink`
//!
//! Logs always go to stderr. In the CGI adapter stdout is the client
//! response, so nothing else may ever be written there.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};
