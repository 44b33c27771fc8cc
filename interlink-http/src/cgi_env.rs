//! CGI environment for a host request

use crate::hook::HostRequest;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::Version;
use interlink_protocol::RequestContext;

/// Server-wide values that go into every request's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiEnvironment {
    pub script_name: String,
    pub server_name: Option<String>,
    pub server_software: String,
}

impl CgiEnvironment {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            server_name: None,
            server_software: concat!("interlink/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Build the request context sent to the backend. The argument block is
/// always empty for a web request.
pub fn build_context(request: &HostRequest, env: &CgiEnvironment) -> RequestContext {
    let path = request.uri.path();
    let query = request.uri.query().unwrap_or("");
    let request_uri = request
        .uri
        .path_and_query()
        .map_or(path, |pq| pq.as_str());

    let mut ctx = RequestContext::new()
        .with_env("GATEWAY_INTERFACE", "CGI/1.1")
        .with_env("SERVER_SOFTWARE", env.server_software.clone())
        .with_env("SERVER_PROTOCOL", protocol_name(request.version))
        .with_env("SERVER_NAME", server_name(request, env))
        .with_env("REQUEST_METHOD", request.method.as_str().to_string())
        .with_env("REQUEST_URI", request_uri.to_string())
        .with_env("SCRIPT_NAME", env.script_name.clone())
        .with_env("PATH_INFO", path.to_string())
        .with_env("QUERY_STRING", query.to_string());

    if let Some(local) = request.local_addr {
        ctx.set_env("SERVER_ADDR", local.ip().to_string());
        ctx.set_env("SERVER_PORT", local.port().to_string());
    }
    if let Some(remote) = request.remote_addr {
        ctx.set_env("REMOTE_ADDR", remote.ip().to_string());
        ctx.set_env("REMOTE_PORT", remote.port().to_string());
    }
    if let Some(content_type) = request.headers.get(CONTENT_TYPE) {
        ctx.set_env("CONTENT_TYPE", Bytes::copy_from_slice(content_type.as_bytes()));
    }
    if !request.body.is_empty() {
        ctx.set_env("CONTENT_LENGTH", request.body.len().to_string());
    }

    for name in request.headers.keys() {
        if name == CONTENT_TYPE || name == CONTENT_LENGTH {
            continue;
        }
        let mut joined = Vec::new();
        for value in request.headers.get_all(name) {
            if !joined.is_empty() {
                joined.extend_from_slice(b", ");
            }
            joined.extend_from_slice(value.as_bytes());
        }
        ctx.set_env(http_variable(name.as_str()), joined);
    }

    if let Some(origin) = &request.redirect {
        ctx.set_env("REDIRECT_URL", origin.url.clone());
        ctx.set_env("REDIRECT_STATUS", origin.status.to_string());
    }

    if !request.body.is_empty() {
        ctx = ctx.with_body(request.body.clone());
    }
    ctx
}

fn http_variable(header: &str) -> String {
    let mut name = String::with_capacity(header.len() + 5);
    name.push_str("HTTP_");
    name.extend(header.chars().map(|c| match c {
        '-' => '_',
        c => c.to_ascii_uppercase(),
    }));
    name
}

fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn server_name(request: &HostRequest, env: &CgiEnvironment) -> String {
    if let Some(name) = &env.server_name {
        return name.clone();
    }
    let host = request
        .headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(|h| match h.rfind(':') {
            Some(colon) if !h.ends_with(']') => &h[..colon],
            _ => h,
        });
    match (host, request.local_addr) {
        (Some(host), _) if !host.is_empty() => host.to_string(),
        (_, Some(local)) => local.ip().to_string(),
        _ => "localhost".to_string(),
    }
}
