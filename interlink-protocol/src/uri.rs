//! Effective application path derivation
//!
//! The backend wants the path below the mount point, without the query
//! string and percent-decoded. Decoding accepts this grammar and nothing
//! else:
//!
//! ```text
//! path    = *( literal / escape )
//! literal = any byte except NUL and "%"
//! escape  = "%" HEXDIG HEXDIG        ; decoded value must not be 0x00 or "/"
//! ```
//!
//! Anything outside it is rejected, never guessed at.

use percent_encoding::percent_decode;

/// Reasons a path field is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriDecodeError {
    #[error("malformed escape at byte {offset}")]
    MalformedEscape { offset: usize },

    #[error("encoded NUL at byte {offset}")]
    EncodedNul { offset: usize },

    #[error("encoded path separator at byte {offset}")]
    EncodedSlash { offset: usize },

    #[error("literal NUL at byte {offset}")]
    LiteralNul { offset: usize },
}

/// Strip the mount point and query string from a raw request path, then
/// percent-decode what is left.
///
/// Leading slashes are trimmed before the prefix is compared. With an empty
/// prefix the leading slashes collapse to exactly one instead.
pub fn effective_path(raw: &[u8], location_prefix: &str) -> Result<Vec<u8>, UriDecodeError> {
    let trimmed = trim_leading_slashes(raw);

    let stripped = if location_prefix.is_empty() {
        if trimmed.len() < raw.len() {
            &raw[raw.len() - trimmed.len() - 1..]
        } else {
            trimmed
        }
    } else {
        trimmed
            .strip_prefix(location_prefix.as_bytes())
            .unwrap_or(trimmed)
    };

    let path = match stripped.iter().position(|&b| b == b'?') {
        Some(query_start) => &stripped[..query_start],
        None => stripped,
    };

    percent_decode_path(path)
}

/// Validate and percent-decode a path.
pub fn percent_decode_path(input: &[u8]) -> Result<Vec<u8>, UriDecodeError> {
    let mut offset = 0;
    while offset < input.len() {
        match input[offset] {
            0 => return Err(UriDecodeError::LiteralNul { offset }),
            b'%' => {
                let hi = input.get(offset + 1).copied().and_then(hex_value);
                let lo = input.get(offset + 2).copied().and_then(hex_value);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(UriDecodeError::MalformedEscape { offset });
                };
                match (hi << 4) | lo {
                    0 => return Err(UriDecodeError::EncodedNul { offset }),
                    b'/' => return Err(UriDecodeError::EncodedSlash { offset }),
                    _ => {}
                }
                offset += 3;
            }
            _ => offset += 1,
        }
    }

    Ok(percent_decode(input).collect())
}

fn trim_leading_slashes(raw: &[u8]) -> &[u8] {
    let start = raw.iter().position(|&b| b != b'/').unwrap_or(raw.len());
    &raw[start..]
}

fn hex_value(b: u8) -> Option<u8> {
    char::from(b).to_digit(16).map(|d| d as u8)
}
