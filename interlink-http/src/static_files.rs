//! Minimal document-root serving for requests the bridge declines

use bytes::Bytes;
use interlink_protocol::percent_decode_path;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A file read from the document root.
#[derive(Debug, Clone)]
pub struct StaticFile {
    pub content: Bytes,
    pub content_type: String,
}

/// Map a request path onto `root`, refusing anything that would leave it.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_path(request_path.as_bytes()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let mut path = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(path)
}

/// Read the file at `request_path` below `root`. Directories are served
/// through their `index.html`.
pub async fn load(root: &Path, request_path: &str) -> Option<StaticFile> {
    let mut path = resolve_path(root, request_path)?;
    let metadata = tokio::fs::metadata(&path).await.ok()?;
    if metadata.is_dir() {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(content) => Some(StaticFile {
            content_type: mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string(),
            content: Bytes::from(content),
        }),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "static file not readable");
            None
        }
    }
}
