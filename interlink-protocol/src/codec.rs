//! Codec for the link protocol
//!
//! Request format (ASCII framing, raw values):
//! ```text
//! arg <N>\n
//! <len> <argument>\n          × N
//! env <M>\n
//! <len> <KEY=value>\n         × M
//! entity\n                    ┐ only when a body is present
//! <len> <raw body bytes>\n    ┘
//! end\n
//! ```
//! `<len>` is the exact byte length of the value that follows it.

use crate::constants::{
    CMD_ARG, CMD_END, CMD_ENTITY, CMD_ENV, MAX_NUMBER_DIGITS, MAX_VALUE_SIZE, PATH_INFO,
    REDIRECT_URL, REQUEST_URI, SCRIPT_NAME,
};
use crate::context::RequestContext;
use crate::uri::{effective_path, UriDecodeError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use interlink_common::{BridgeError, RewriteConfig};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Errors produced while framing a request
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("bad URI entities in {field}: {source}")]
    BadUriEntity {
        field: &'static str,
        #[source]
        source: UriDecodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<EncodeError> for BridgeError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::BadUriEntity { field, source } => BridgeError::BadUriEntity {
                field,
                reason: source.to_string(),
            },
            EncodeError::Io(e) => BridgeError::ProtocolWrite(e),
        }
    }
}

/// Link protocol codec
///
/// The encoder frames a [`RequestContext`], applying the backend-directed
/// field rewrites when a [`RewriteConfig`] is set. The decoder is its
/// inverse and yields a whole request once the `end` marker has arrived;
/// backends and test stubs use it to read what the bridge sends.
#[derive(Debug, Clone)]
pub struct LinkCodec {
    rewrite: Option<RewriteConfig>,
    max_value_size: usize,
}

impl Default for LinkCodec {
    fn default() -> Self {
        Self {
            rewrite: None,
            max_value_size: MAX_VALUE_SIZE,
        }
    }
}

impl LinkCodec {
    /// Codec that forwards the environment verbatim
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec that applies the path, script-name and redirect rewrites
    pub fn with_rewrite(rewrite: RewriteConfig) -> Self {
        Self {
            rewrite: Some(rewrite),
            ..Self::default()
        }
    }

    /// Override the largest value the decoder accepts
    #[must_use]
    pub fn with_max_value_size(mut self, max_value_size: usize) -> Self {
        self.max_value_size = max_value_size;
        self
    }

    /// Frame a whole request into `dst`.
    ///
    /// Rewritten values are computed before anything is written, so a decoding
    /// failure leaves `dst` untouched.
    pub fn encode_request(
        &self,
        request: &RequestContext,
        dst: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        let env = match &self.rewrite {
            Some(rewrite) => rewritten_env(request, rewrite)?,
            None => request
                .env()
                .iter()
                .map(|(k, v)| env_entry(k, v))
                .collect(),
        };

        put_command(dst, CMD_ARG, Some(request.args().len()));
        for arg in request.args() {
            put_value(dst, arg);
        }

        put_command(dst, CMD_ENV, Some(env.len()));
        for entry in &env {
            put_value(dst, entry);
        }

        if let Some(body) = request.body() {
            put_command(dst, CMD_ENTITY, None);
            put_value(dst, body);
        }

        put_command(dst, CMD_END, None);
        Ok(())
    }
}

impl Encoder<&RequestContext> for LinkCodec {
    type Error = EncodeError;

    fn encode(&mut self, item: &RequestContext, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_request(item, dst)
    }
}

impl Decoder for LinkCodec {
    type Item = RequestContext;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut parser = Parser {
            buf: &src[..],
            pos: 0,
            max_value_size: self.max_value_size,
        };

        match parser.request() {
            Ok(request) => {
                let consumed = parser.pos;
                src.advance(consumed);
                Ok(Some(request))
            }
            Err(ParseError::Incomplete) => Ok(None),
            Err(ParseError::Invalid(msg)) => Err(io::Error::new(io::ErrorKind::InvalidData, msg)),
        }
    }
}

/// Environment block after rewriting: the path field is dropped and
/// synthesised last, the script name replaced in place, and the redirect
/// target moved after the synthetic path field.
fn rewritten_env(
    request: &RequestContext,
    rewrite: &RewriteConfig,
) -> Result<Vec<Bytes>, EncodeError> {
    let prefix = rewrite.location_prefix();
    let mut entries = Vec::with_capacity(request.env().len() + 2);
    let mut request_uri: &[u8] = b"";
    let mut redirect_url = None;

    for (key, value) in request.env() {
        match key.as_ref() {
            k if k == PATH_INFO.as_bytes() => {}
            k if k == REDIRECT_URL.as_bytes() => redirect_url = Some(value.as_ref()),
            k if k == SCRIPT_NAME.as_bytes() => {
                entries.push(env_entry(key, rewrite.script_name().as_bytes()));
            }
            k => {
                if k == REQUEST_URI.as_bytes() {
                    request_uri = value.as_ref();
                }
                entries.push(env_entry(key, value));
            }
        }
    }

    let path_info = effective_path(request_uri, prefix).map_err(|source| {
        EncodeError::BadUriEntity {
            field: REQUEST_URI,
            source,
        }
    })?;
    entries.push(env_entry(PATH_INFO.as_bytes(), &path_info));

    if let Some(raw) = redirect_url {
        let target = effective_path(raw, prefix).map_err(|source| EncodeError::BadUriEntity {
            field: REDIRECT_URL,
            source,
        })?;
        entries.push(env_entry(REDIRECT_URL.as_bytes(), &target));
    }

    Ok(entries)
}

fn env_entry(key: &[u8], value: &[u8]) -> Bytes {
    let mut entry = BytesMut::with_capacity(key.len() + value.len() + 1);
    entry.put_slice(key);
    entry.put_u8(b'=');
    entry.put_slice(value);
    entry.freeze()
}

fn put_command(dst: &mut BytesMut, command: &[u8], count: Option<usize>) {
    dst.put_slice(command);
    if let Some(count) = count {
        dst.put_u8(b' ');
        dst.put_slice(count.to_string().as_bytes());
    }
    dst.put_u8(b'\n');
}

fn put_value(dst: &mut BytesMut, value: &[u8]) {
    let len = value.len().to_string();
    dst.reserve(len.len() + value.len() + 2);
    dst.put_slice(len.as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(value);
    dst.put_u8(b'\n');
}

enum ParseError {
    Incomplete,
    Invalid(String),
}

struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
    max_value_size: usize,
}

impl<'a> Parser<'a> {
    fn request(&mut self) -> Result<RequestContext, ParseError> {
        let mut request = RequestContext::new();

        loop {
            let line = self.line()?;
            let (command, count) = match line.iter().position(|&b| b == b' ') {
                Some(space) => (&line[..space], Some(parse_number(&line[space + 1..])?)),
                None => (line, None),
            };

            match (command, count) {
                (CMD_ARG, Some(n)) => {
                    for _ in 0..n {
                        let arg = self.value()?;
                        request = request.with_arg(arg);
                    }
                }
                (CMD_ENV, Some(n)) => {
                    for _ in 0..n {
                        let entry = self.value()?;
                        let Some(eq) = entry.iter().position(|&b| b == b'=') else {
                            return Err(ParseError::Invalid(
                                "environment entry without '='".into(),
                            ));
                        };
                        request.set_env(entry.slice(..eq), entry.slice(eq + 1..));
                    }
                }
                (CMD_ENTITY, None) => {
                    let body = self.value()?;
                    request = request.with_body(body);
                }
                (CMD_END, None) => return Ok(request),
                _ => {
                    return Err(ParseError::Invalid(format!(
                        "unexpected command line: {}",
                        String::from_utf8_lossy(line)
                    )))
                }
            }
        }
    }

    /// Next `\n`-terminated line, without the terminator.
    fn line(&mut self) -> Result<&'a [u8], ParseError> {
        let buf = self.buf;
        let rest = &buf[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.pos += end + 1;
                Ok(&rest[..end])
            }
            None if rest.len() > MAX_NUMBER_DIGITS + CMD_ENTITY.len() + 1 => {
                Err(ParseError::Invalid("command line too long".into()))
            }
            None => Err(ParseError::Incomplete),
        }
    }

    /// Next `<len> <value>\n` item.
    fn value(&mut self) -> Result<Bytes, ParseError> {
        let buf = self.buf;
        let rest = &buf[self.pos..];
        let Some(space) = rest.iter().take(MAX_NUMBER_DIGITS + 1).position(|&b| b == b' ')
        else {
            return if rest.len() > MAX_NUMBER_DIGITS {
                Err(ParseError::Invalid("length field too long".into()))
            } else {
                Err(ParseError::Incomplete)
            };
        };

        let len = parse_number(&rest[..space])?;
        if len > self.max_value_size {
            return Err(ParseError::Invalid(format!(
                "value too large: {len} bytes (max: {})",
                self.max_value_size
            )));
        }

        let start = space + 1;
        let end = start + len;
        if rest.len() <= end {
            return Err(ParseError::Incomplete);
        }
        if rest[end] != b'\n' {
            return Err(ParseError::Invalid("value not terminated by newline".into()));
        }

        self.pos += end + 1;
        Ok(Bytes::copy_from_slice(&rest[start..end]))
    }
}

fn parse_number(digits: &[u8]) -> Result<usize, ParseError> {
    if digits.is_empty() || digits.len() > MAX_NUMBER_DIGITS || !digits.iter().all(u8::is_ascii_digit)
    {
        return Err(ParseError::Invalid(format!(
            "invalid number: {}",
            String::from_utf8_lossy(digits)
        )));
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::Invalid("number out of range".into()))
}
