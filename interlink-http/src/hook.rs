//! Hook interface between a host web server and the bridge
//!
//! A host turns each request it routes to the bridge into a [`HostRequest`],
//! calls a [`Handler`], and acts on the [`HostReply`]: serve the request
//! itself, answer not-found, redirect, re-dispatch internally, or stream the
//! backend's response.

use crate::admission::{admit, Admission};
use crate::cgi_env::{build_context, CgiEnvironment};
use crate::cgi_head::read_head;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use interlink_common::{AdmissionConfig, BridgeConfig, BridgeError, Result};
use interlink_core::{drain, redirect_status, resolve, with_timeout, Bridge, ResponseDisposition};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{BufReader, DuplexStream};
use tracing::{debug, error, warn};

/// Where an internally re-dispatched request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOrigin {
    pub url: String,
    pub status: u16,
}

/// One request as the host hands it over.
#[derive(Debug, Clone)]
pub struct HostRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    pub redirect: Option<RedirectOrigin>,
}

impl HostRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            local_addr: None,
            redirect: None,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_addrs(mut self, remote: SocketAddr, local: SocketAddr) -> Self {
        self.remote_addr = Some(remote);
        self.local_addr = Some(local);
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The request to run for an internal redirect to `location`: always a
    /// GET without a body, with the body headers removed so nothing tries
    /// to read the original body again.
    pub fn internal_redirect(&self, location: &str) -> Result<Self> {
        let uri: Uri = location.parse().map_err(|_| {
            BridgeError::HeaderParse(format!("invalid internal redirect target: {location}"))
        })?;

        let mut headers = self.headers.clone();
        headers.remove(CONTENT_LENGTH);
        headers.remove(CONTENT_TYPE);
        headers.remove(TRANSFER_ENCODING);

        Ok(Self {
            method: Method::GET,
            uri,
            version: self.version,
            headers,
            body: Bytes::new(),
            remote_addr: self.remote_addr,
            local_addr: self.local_addr,
            redirect: Some(RedirectOrigin {
                url: self.uri.path().to_string(),
                status: StatusCode::OK.as_u16(),
            }),
        })
    }
}

/// Body of a streamed backend response.
#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    Stream(DuplexStream),
}

/// What the host should do with the request.
#[derive(Debug)]
pub enum HostReply {
    /// Not for the bridge; the host handles it. `allow` lists methods to
    /// advertise when answering `OPTIONS`.
    Declined { allow: Vec<Method> },
    NotFound,
    Redirect {
        status: StatusCode,
        location: String,
        headers: HeaderMap,
    },
    InternalRedirect { location: String },
    Response {
        status: StatusCode,
        headers: HeaderMap,
        body: ResponseBody,
    },
    Failed(BridgeError),
}

/// Request hook called by the host for every request routed to it.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: HostRequest) -> impl Future<Output = HostReply> + Send;
}

/// Handler that serves requests through the bridge.
#[derive(Debug, Clone)]
pub struct LinkHandler {
    bridge: Arc<Bridge>,
    admission: AdmissionConfig,
    env: CgiEnvironment,
    segment_capacity: usize,
}

impl LinkHandler {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        Ok(Self {
            bridge: Arc::new(Bridge::from_config(config, true)?),
            admission: config.admission.clone(),
            env: CgiEnvironment::new(config.rewrite.script_name()),
            segment_capacity: config.segment_capacity,
        })
    }

    #[must_use]
    pub fn with_environment(mut self, env: CgiEnvironment) -> Self {
        self.env = env;
        self
    }

    pub fn environment(&self) -> &CgiEnvironment {
        &self.env
    }

    async fn serve(&self, request: &HostRequest) -> Result<HostReply> {
        let context = build_context(request, &self.env);
        let conn = self.bridge.open(&context).await?;
        let mut backend = BufReader::new(conn);

        let limit = self.bridge.timeouts().response_head;
        let head = with_timeout("response head", limit, read_head(&mut backend)).await?;

        match resolve(head.status, &head.headers)? {
            ResponseDisposition::InternalRedirect(location) => {
                let discarded =
                    with_timeout("response drain", limit, drain(&mut backend)).await?;
                debug!(%location, discarded, "internal redirect");
                Ok(HostReply::InternalRedirect { location })
            }
            ResponseDisposition::ExternalRedirect(location) => {
                let mut headers = head.headers;
                headers.remove(http::header::LOCATION);
                Ok(HostReply::Redirect {
                    status: redirect_status(head.status),
                    location,
                    headers,
                })
            }
            ResponseDisposition::PassThrough if request.method == Method::HEAD => {
                Ok(HostReply::Response {
                    status: head.status,
                    headers: head.headers,
                    body: ResponseBody::Empty,
                })
            }
            ResponseDisposition::PassThrough => {
                let (mut writer, reader) = tokio::io::duplex(self.segment_capacity);
                let bridge = Arc::clone(&self.bridge);
                tokio::spawn(async move {
                    if let Err(e) = bridge.relay_to(&mut backend, &mut writer).await {
                        warn!(error = %e, "response relay aborted, client body truncated");
                    }
                });
                Ok(HostReply::Response {
                    status: head.status,
                    headers: head.headers,
                    body: ResponseBody::Stream(reader),
                })
            }
        }
    }
}

impl Handler for LinkHandler {
    async fn handle(&self, request: HostRequest) -> HostReply {
        if request.method == Method::OPTIONS {
            return HostReply::Declined {
                allow: vec![Method::GET, Method::PUT, Method::POST],
            };
        }

        match admit(&self.admission, request.path()) {
            Admission::Proceed => {}
            Admission::Declined => return HostReply::Declined { allow: Vec::new() },
            Admission::NotFound => return HostReply::NotFound,
        }

        match self.serve(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(path = request.path(), error = %e, "bridge request failed");
                HostReply::Failed(e)
            }
        }
    }
}
