//! Classification of a backend response by its status and headers

use http::header::LOCATION;
use http::{HeaderMap, StatusCode};
use interlink_common::{BridgeError, Result};
use tokio::io::AsyncRead;
use tracing::debug;

/// What the caller does with a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// Relay the body to the client.
    PassThrough,
    /// Answer the client with a redirect; the backend body is not read.
    ExternalRedirect(String),
    /// Discard the backend body and re-dispatch the request at the given
    /// local path as a body-less GET.
    InternalRedirect(String),
}

/// Decide what to do with a response whose head has already been parsed.
///
/// A `200` with a `Location` starting with `/` is an internal redirect. A
/// `Location` that is not a local path, sent with `200` or any `3xx`, is an
/// external redirect. Everything else passes through, including a `3xx`
/// with a local path, which the client resolves itself.
pub fn resolve(status: StatusCode, headers: &HeaderMap) -> Result<ResponseDisposition> {
    let Some(value) = headers.get(LOCATION) else {
        return Ok(ResponseDisposition::PassThrough);
    };
    let location = value
        .to_str()
        .map_err(|_| BridgeError::HeaderParse("Location header is not visible ASCII".into()))?
        .trim();

    let disposition = if location.starts_with('/') {
        if status == StatusCode::OK {
            ResponseDisposition::InternalRedirect(location.to_string())
        } else {
            ResponseDisposition::PassThrough
        }
    } else if status == StatusCode::OK || status.is_redirection() {
        ResponseDisposition::ExternalRedirect(location.to_string())
    } else {
        ResponseDisposition::PassThrough
    };

    debug!(%status, ?disposition, "response disposition");
    Ok(disposition)
}

/// Read and discard whatever the backend still sends for this request.
pub async fn drain<R>(backend: &mut R) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    tokio::io::copy(backend, &mut tokio::io::sink())
        .await
        .map_err(BridgeError::ProtocolRead)
}

/// Status sent to the client for an external redirect. A backend `3xx` is
/// kept; a `200` becomes `302 Found`.
pub fn redirect_status(status: StatusCode) -> StatusCode {
    if status.is_redirection() {
        status
    } else {
        StatusCode::FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn with_location(location: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());
        headers
    }

    #[test]
    fn test_200_local_location_is_internal() {
        let d = resolve(StatusCode::OK, &with_location("/cart")).unwrap();
        assert_eq!(d, ResponseDisposition::InternalRedirect("/cart".into()));
    }

    #[test]
    fn test_200_absolute_location_is_external() {
        let d = resolve(StatusCode::OK, &with_location("http://other.example/")).unwrap();
        assert_eq!(
            d,
            ResponseDisposition::ExternalRedirect("http://other.example/".into())
        );
    }

    #[test]
    fn test_302_absolute_location_is_external() {
        let d = resolve(StatusCode::FOUND, &with_location("http://other.example/")).unwrap();
        assert_eq!(
            d,
            ResponseDisposition::ExternalRedirect("http://other.example/".into())
        );
        assert_eq!(redirect_status(StatusCode::FOUND), StatusCode::FOUND);
        assert_eq!(redirect_status(StatusCode::OK), StatusCode::FOUND);
    }

    #[test]
    fn test_pass_through_cases() {
        assert_eq!(
            resolve(StatusCode::OK, &HeaderMap::new()).unwrap(),
            ResponseDisposition::PassThrough
        );
        assert_eq!(
            resolve(StatusCode::MOVED_PERMANENTLY, &with_location("/moved")).unwrap(),
            ResponseDisposition::PassThrough
        );
        assert_eq!(
            resolve(StatusCode::CREATED, &with_location("http://x.example/1")).unwrap(),
            ResponseDisposition::PassThrough
        );
    }

    #[test]
    fn test_opaque_location_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_bytes(b"/caf\xe9").unwrap());
        let err = resolve(StatusCode::OK, &headers).unwrap_err();
        assert!(matches!(err, BridgeError::HeaderParse(_)));
    }

    #[tokio::test]
    async fn test_drain_consumes_everything() {
        let mut backend: &[u8] = b"ignored body bytes";
        assert_eq!(drain(&mut backend).await.unwrap(), 18);
        assert!(backend.is_empty());
    }
}
