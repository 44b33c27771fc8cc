//! In-process stub backend for `Interlink` integration tests
//!
//! A [`StubBackend`] accepts link connections, decodes one request per
//! connection with [`LinkCodec`], records it, and answers with whatever the
//! reply function returns before closing the connection.

use futures_util::StreamExt;
use interlink_common::Endpoint;
use interlink_protocol::{LinkCodec, RequestContext};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::debug;

type ReplyFn = dyn Fn(&RequestContext) -> Vec<u8> + Send + Sync;

#[derive(Default)]
struct Seen {
    requests: Mutex<Vec<RequestContext>>,
    connections: AtomicUsize,
}

pub struct StubBackend {
    endpoint: Endpoint,
    seen: Arc<Seen>,
    socket_path: Option<PathBuf>,
    task: JoinHandle<()>,
}

impl StubBackend {
    /// Listen on an ephemeral loopback TCP port.
    pub async fn tcp<F>(reply: F) -> io::Result<Self>
    where
        F: Fn(&RequestContext) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let seen = Arc::new(Seen::default());
        let reply: Arc<ReplyFn> = Arc::new(reply);

        let task = {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    spawn_connection(stream, Arc::clone(&reply), Arc::clone(&seen));
                }
            })
        };

        Ok(Self {
            endpoint: Endpoint::inet("127.0.0.1", port),
            seen,
            socket_path: None,
            task,
        })
    }

    /// Listen on a fresh UNIX socket in the temp directory.
    #[cfg(unix)]
    pub async fn unix<F>(reply: F) -> io::Result<Self>
    where
        F: Fn(&RequestContext) -> Vec<u8> + Send + Sync + 'static,
    {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        let path = std::env::temp_dir().join(format!(
            "interlink-stub-{}-{}.sock",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_file(&path);
        let listener = tokio::net::UnixListener::bind(&path)?;
        let seen = Arc::new(Seen::default());
        let reply: Arc<ReplyFn> = Arc::new(reply);

        let task = {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    spawn_connection(stream, Arc::clone(&reply), Arc::clone(&seen));
                }
            })
        };

        Ok(Self {
            endpoint: Endpoint::unix(path.to_string_lossy().into_owned()),
            seen,
            socket_path: Some(path),
            task,
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    /// Requests decoded so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestContext> {
        self.seen
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Connections accepted so far, including ones that sent nothing.
    pub fn connections(&self) -> usize {
        self.seen.connections.load(Ordering::SeqCst)
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(path) = &self.socket_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn spawn_connection<S>(stream: S, reply: Arc<ReplyFn>, seen: Arc<Seen>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    seen.connections.fetch_add(1, Ordering::SeqCst);
    tokio::spawn(async move {
        if let Err(e) = serve_connection(stream, reply, seen).await {
            debug!(error = %e, "stub connection failed");
        }
    });
}

async fn serve_connection<S>(mut stream: S, reply: Arc<ReplyFn>, seen: Arc<Seen>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = {
        let mut framed = FramedRead::new(&mut stream, LinkCodec::new());
        match framed.next().await {
            Some(request) => request?,
            None => return Ok(()),
        }
    };

    let response = reply(&request);
    seen.requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);

    stream.write_all(&response).await?;
    stream.shutdown().await
}

/// A loopback endpoint nothing listens on.
pub async fn refused_endpoint() -> io::Result<Endpoint> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(Endpoint::inet("127.0.0.1", port))
}

/// Environment value of `request` as text, if present.
pub fn env_str(request: &RequestContext, key: &str) -> Option<String> {
    request
        .env_value(key)
        .map(|v| String::from_utf8_lossy(v).into_owned())
}
