//! `Interlink` link protocol
//!
//! This crate defines the line-oriented text protocol spoken to the backend
//! application server: an `arg` block, an `env` block, an optional `entity`
//! block and the `end` marker, every value length-prefixed.

pub mod codec;
pub mod constants;
pub mod context;
pub mod uri;

pub use codec::{EncodeError, LinkCodec};
pub use context::RequestContext;
pub use uri::{effective_path, percent_decode_path, UriDecodeError};
