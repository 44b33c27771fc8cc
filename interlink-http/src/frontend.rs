//! HTTP/1 front-end that serves requests through a [`Handler`]

use crate::hook::{Handler, HostReply, HostRequest, ResponseBody};
use crate::static_files;
use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{
    HeaderValue, ALLOW, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, TRANSFER_ENCODING,
};
use http_body_util::{BodyExt, Full, Limited, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use interlink_common::{BridgeError, Result, DEFAULT_HTTP_BIND, MAX_INTERNAL_REDIRECTS};
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, io::Error>;

/// Front-end limits and document root
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub bind: SocketAddr,
    /// Maximum concurrent client connections (default: 1024)
    pub max_connections: usize,
    /// Maximum request body size in bytes (default: 16MB)
    pub max_request_body: usize,
    /// Serves requests the handler declines; without it they get 404
    pub document_root: Option<PathBuf>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_HTTP_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
            max_connections: 1024,
            max_request_body: 16 * 1024 * 1024,
            document_root: None,
        }
    }
}

pub struct HttpFrontend<H> {
    config: Arc<FrontendConfig>,
    handler: Arc<H>,
    connection_semaphore: Arc<Semaphore>,
}

impl<H: Handler> HttpFrontend<H> {
    pub fn new(config: FrontendConfig, handler: H) -> Self {
        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));
        Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
            connection_semaphore,
        }
    }

    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until it fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("HTTP front-end listening on {}", local_addr);

        loop {
            let (stream, peer_addr) = listener.accept().await?;

            let Ok(permit) = self.connection_semaphore.clone().try_acquire_owned() else {
                warn!(
                    "Max connections reached, rejecting connection from {}",
                    peer_addr
                );
                drop(stream);
                continue;
            };

            let io = TokioIo::new(stream);
            let handler = Arc::clone(&self.handler);
            let config = Arc::clone(&self.config);

            tokio::spawn(async move {
                let _permit = permit;

                if let Err(err) = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(move |req| {
                            handle_request(
                                req,
                                Arc::clone(&handler),
                                Arc::clone(&config),
                                peer_addr,
                                local_addr,
                            )
                        }),
                    )
                    .await
                {
                    debug!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

async fn handle_request<H: Handler>(
    req: Request<Incoming>,
    handler: Arc<H>,
    config: Arc<FrontendConfig>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
) -> std::result::Result<Response<BoxBody>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, config.max_request_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "could not read request body");
            return Ok(text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large or unreadable",
            ));
        }
    };

    let mut request = HostRequest::new(parts.method, parts.uri)
        .with_headers(parts.headers)
        .with_body(body)
        .with_addrs(peer_addr, local_addr);
    request.version = parts.version;

    Ok(dispatch(handler.as_ref(), request, &config).await)
}

/// Run `request` through `handler`, following internal redirects.
pub async fn dispatch<H: Handler>(
    handler: &H,
    mut request: HostRequest,
    config: &FrontendConfig,
) -> Response<BoxBody> {
    for _ in 0..=MAX_INTERNAL_REDIRECTS {
        match handler.handle(request.clone()).await {
            HostReply::InternalRedirect { location } => match request.internal_redirect(&location) {
                Ok(next) => request = next,
                Err(e) => return error_response(&e),
            },
            reply => return into_response(reply, &request, config).await,
        }
    }

    let err = BridgeError::Config(format!(
        "too many internal redirects (limit {MAX_INTERNAL_REDIRECTS})"
    ));
    error!(path = request.path(), "{}", err);
    error_response(&err)
}

async fn into_response(
    reply: HostReply,
    request: &HostRequest,
    config: &FrontendConfig,
) -> Response<BoxBody> {
    match reply {
        HostReply::Declined { allow } if request.method == Method::OPTIONS => {
            let mut res = Response::new(empty_body());
            let methods: Vec<&str> = allow.iter().map(Method::as_str).collect();
            if let Ok(value) = HeaderValue::from_str(&methods.join(", ")) {
                res.headers_mut().insert(ALLOW, value);
            }
            res
        }
        HostReply::Declined { .. } => serve_declined(request, config).await,
        HostReply::NotFound => text_response(StatusCode::NOT_FOUND, "Not Found"),
        HostReply::Redirect {
            status,
            location,
            mut headers,
        } => {
            // Backend body is replaced, drop its framing.
            for name in [CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION, CONTENT_TYPE] {
                headers.remove(name);
            }
            let mut res = text_response(status, "Redirecting");
            res.headers_mut().extend(headers);
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    res.headers_mut().insert(LOCATION, value);
                    res
                }
                Err(_) => error_response(&BridgeError::HeaderParse(format!(
                    "unusable redirect location: {location}"
                ))),
            }
        }
        HostReply::Response {
            status,
            mut headers,
            body,
        } => {
            headers.remove(CONNECTION);
            headers.remove(TRANSFER_ENCODING);
            let body = match body {
                ResponseBody::Empty => empty_body(),
                ResponseBody::Stream(reader) => stream_body(reader),
            };
            let mut res = Response::new(body);
            *res.status_mut() = status;
            *res.headers_mut() = headers;
            res
        }
        HostReply::InternalRedirect { location } => error_response(&BridgeError::Config(
            format!("internal redirect to {location} was not followed"),
        )),
        HostReply::Failed(e) => error_response(&e),
    }
}

async fn serve_declined(request: &HostRequest, config: &FrontendConfig) -> Response<BoxBody> {
    let Some(root) = &config.document_root else {
        return text_response(StatusCode::NOT_FOUND, "Not Found");
    };
    match static_files::load(root, request.path()).await {
        Some(file) => {
            let mut res = Response::new(full_body(file.content));
            if let Ok(value) = HeaderValue::from_str(&file.content_type) {
                res.headers_mut().insert(CONTENT_TYPE, value);
            }
            res
        }
        None => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Response for a failure that happened before anything was sent.
pub fn error_response(err: &BridgeError) -> Response<BoxBody> {
    let status = StatusCode::from_u16(err.status_hint()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match status {
        StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable",
        StatusCode::GATEWAY_TIMEOUT => "Backend did not answer in time",
        _ => "Internal Server Error",
    };
    text_response(status, message)
}

fn text_response(status: StatusCode, body: &str) -> Response<BoxBody> {
    let mut res = Response::new(full_body(Bytes::copy_from_slice(body.as_bytes())));
    *res.status_mut() = status;
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}

fn full_body(bytes: Bytes) -> BoxBody {
    Full::new(bytes).map_err(|never| match never {}).boxed()
}

fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

fn stream_body(reader: DuplexStream) -> BoxBody {
    StreamBody::new(ReaderStream::new(reader).map_ok(Frame::data)).boxed()
}
