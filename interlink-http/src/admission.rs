//! Decides whether a request reaches the bridge at all

use interlink_common::AdmissionConfig;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Hand the request to the backend
    Proceed,
    /// Leave the request to the host (ordinary file)
    Declined,
    /// Answer "not found" without contacting the backend
    NotFound,
}

/// Ordinary-file prefixes are checked first, then drop-list substrings.
pub fn admit(config: &AdmissionConfig, path: &str) -> Admission {
    if config
        .ordinary_files
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
    {
        return Admission::Declined;
    }

    if let Some(entry) = config
        .drop_list
        .iter()
        .find(|entry| path.contains(entry.as_str()))
    {
        warn!(path, entry = %entry, "request matches drop list");
        return Admission::NotFound;
    }

    Admission::Proceed
}
