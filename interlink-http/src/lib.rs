//! Host adapter for `Interlink`
//!
//! [`LinkHandler`] is the hook a host web server calls for each request it
//! routes to the backend. [`HttpFrontend`] is a small hyper server acting as
//! that host: it admits requests, follows internal redirects, and streams
//! backend responses to clients.

pub mod admission;
pub mod cgi_env;
pub mod cgi_head;
pub mod frontend;
pub mod hook;
pub mod static_files;

pub use admission::{admit, Admission};
pub use cgi_env::{build_context, CgiEnvironment};
pub use cgi_head::{read_head, ResponseHead};
pub use frontend::{dispatch, error_response, FrontendConfig, HttpFrontend};
pub use hook::{Handler, HostReply, HostRequest, LinkHandler, RedirectOrigin, ResponseBody};
