//! Scanner for the CGI-style response head sent by the backend
//!
//! The backend answers with `Name: value` lines ended by a blank line. A
//! `Status:` line sets the response status and is not passed on as a
//! header. Lines may end in `\n` or `\r\n`. Without a `Status:` line the
//! status is `200`, even when a `Location` header is present, so that the
//! disposition step can tell internal from external redirects.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use interlink_common::{BridgeError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest response head accepted (64KB)
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Read the response head, leaving `reader` positioned at the first body
/// byte.
pub async fn read_head<R>(reader: &mut R) -> Result<ResponseHead>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut status = None;
    let mut headers = HeaderMap::new();
    let mut line = Vec::with_capacity(256);
    let mut remaining = MAX_HEAD_SIZE;

    loop {
        line.clear();
        let n = (&mut *reader)
            .take(remaining as u64)
            .read_until(b'\n', &mut line)
            .await
            .map_err(BridgeError::ProtocolRead)?;
        remaining -= n;

        if line.pop() != Some(b'\n') {
            return Err(BridgeError::HeaderParse(if remaining == 0 {
                "response head too large".into()
            } else {
                "premature end of script headers".into()
            }));
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            break;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(BridgeError::HeaderParse(format!(
                "malformed header line: {}",
                String::from_utf8_lossy(&line)
            )));
        };
        let name = line[..colon].trim_ascii();
        let value = line[colon + 1..].trim_ascii();

        if name.eq_ignore_ascii_case(b"status") {
            status = Some(parse_status(value)?);
            continue;
        }

        let name = HeaderName::from_bytes(name).map_err(|_| {
            BridgeError::HeaderParse(format!(
                "invalid header name: {}",
                String::from_utf8_lossy(name)
            ))
        })?;
        let value = HeaderValue::from_bytes(value)
            .map_err(|_| BridgeError::HeaderParse(format!("invalid value for header {name}")))?;
        headers.append(name, value);
    }

    Ok(ResponseHead {
        status: status.unwrap_or(StatusCode::OK),
        headers,
    })
}

fn parse_status(value: &[u8]) -> Result<StatusCode> {
    let code = value.split(|b| b.is_ascii_whitespace()).next().unwrap_or_default();
    StatusCode::from_bytes(code).map_err(|_| {
        BridgeError::HeaderParse(format!(
            "invalid status line: {}",
            String::from_utf8_lossy(value)
        ))
    })
}
