//! One-shot reconnect after a broken pipe while sending the request

use crate::connection::{BackendConnection, Phase};
use interlink_common::BridgeError;

/// Reconnection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    /// No send has failed yet
    Initial,
    /// The single permitted reconnect has been used
    Reconnected,
    /// A send failure was refused a retry
    Failed,
}

/// Decides whether a failed request send may be repeated on a new
/// connection.
///
/// A backend in the middle of a restart can accept a connection and then
/// hang up before reading anything. That shows up as a broken pipe while the
/// request is still being written, and one blind retry covers it. Any other
/// failure, a second broken pipe, or a broken pipe after the response has
/// started to arrive is final.
#[derive(Debug)]
pub struct ReconnectController {
    state: ReconnectState,
}

impl Default for ReconnectController {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ReconnectState::Initial,
        }
    }

    /// Returns true if the caller should reconnect and resend from the start.
    pub fn on_send_error(&mut self, err: &BridgeError, conn: &BackendConnection) -> bool {
        let retryable = self.state == ReconnectState::Initial
            && err.is_retryable_broken_pipe()
            && conn.phase() == Phase::Sending
            && !conn.response_started();

        self.state = if retryable {
            ReconnectState::Reconnected
        } else {
            ReconnectState::Failed
        };
        retryable
    }

    #[must_use]
    pub fn state(&self) -> ReconnectState {
        self.state
    }
}
