//! Protocol constants

/// Argument block command
pub const CMD_ARG: &[u8] = b"arg";

/// Environment block command
pub const CMD_ENV: &[u8] = b"env";

/// Request body command
pub const CMD_ENTITY: &[u8] = b"entity";

/// End-of-request marker
pub const CMD_END: &[u8] = b"end";

/// Position-tracking path field, always synthesised from the request path
pub const PATH_INFO: &str = "PATH_INFO";

/// Script-name field, rewritten to the mount point
pub const SCRIPT_NAME: &str = "SCRIPT_NAME";

/// Raw request URI as seen by the front-end
pub const REQUEST_URI: &str = "REQUEST_URI";

/// Redirect-target hint, re-emitted once after rewriting
pub const REDIRECT_URL: &str = "REDIRECT_URL";

/// Body length hint
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";

/// Request method
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";

/// Maximum accepted value length when decoding (64MB)
pub const MAX_VALUE_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of digits in a length or count field
pub const MAX_NUMBER_DIGITS: usize = 20;
