//! Turning the process invocation into a link request

use bytes::Bytes;
use interlink_protocol::RequestContext;
use std::ffi::OsString;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

#[cfg(unix)]
fn os_bytes(value: OsString) -> Bytes {
    use std::os::unix::ffi::OsStringExt;
    Bytes::from(value.into_vec())
}

#[cfg(not(unix))]
fn os_bytes(value: OsString) -> Bytes {
    Bytes::from(value.to_string_lossy().into_owned())
}

/// Arguments and environment, forwarded verbatim in their original order.
pub fn from_process<A, E>(args: A, vars: E) -> RequestContext
where
    A: IntoIterator<Item = OsString>,
    E: IntoIterator<Item = (OsString, OsString)>,
{
    let mut context = RequestContext::new().with_args(args.into_iter().map(os_bytes));
    for (key, value) in vars {
        context.set_env(os_bytes(key), os_bytes(value));
    }
    context
}

/// Declared body length, if the web server passed one.
pub fn content_length(context: &RequestContext) -> Option<u64> {
    let raw = context.env_value("CONTENT_LENGTH")?;
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

/// Read up to `length` bytes of request body from `input`.
///
/// A short read is not fatal: whatever arrived is forwarded.
pub async fn read_body<R>(input: &mut R, length: u64) -> std::io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::with_capacity(usize::try_from(length.min(64 * 1024)).unwrap_or(0));
    input.take(length).read_to_end(&mut body).await?;
    if (body.len() as u64) < length {
        warn!(
            expected = length,
            received = body.len(),
            "request body ended early, forwarding what was read"
        );
    }
    Ok(Bytes::from(body))
}
