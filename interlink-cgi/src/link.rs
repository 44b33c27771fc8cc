//! One request through the bridge, from process input to process output

use crate::{error_page, request};
use anyhow::{Context, Result};
use interlink_core::{Bridge, Connector};
use std::ffi::OsString;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error};

/// Forward `argv`, `vars` and up to `CONTENT_LENGTH` bytes of `input` to the
/// backend, then copy its reply to `output`.
///
/// A request that never reaches the backend is answered with an error page
/// and counts as handled.
pub async fn run_with<C, A, E, I, O>(
    bridge: &Bridge<C>,
    argv: A,
    vars: E,
    input: &mut I,
    output: &mut O,
) -> Result<()>
where
    C: Connector,
    A: IntoIterator<Item = OsString>,
    E: IntoIterator<Item = (OsString, OsString)>,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut context = request::from_process(argv, vars);
    if let Some(length) = request::content_length(&context).filter(|&n| n > 0) {
        let body = request::read_body(input, length)
            .await
            .context("failed to read request body from stdin")?;
        context = context.with_body(body);
    }

    let conn = match bridge.open(&context).await {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "request not delivered to the backend");
            output.write_all(error_page::render(&e).as_bytes()).await?;
            output.flush().await?;
            return Ok(());
        }
    };

    let mut backend = BufReader::new(conn);
    let stats = bridge
        .relay_to(&mut backend, output)
        .await
        .context("response relay aborted")?;
    debug!(
        bytes = stats.bytes_written,
        segments = stats.segments,
        "response relayed"
    );
    Ok(())
}
