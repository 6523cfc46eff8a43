//! Error taxonomy for the session client.
//!
//! Submission and send failures are ordinary, recoverable conditions
//! (the UI disables buttons rather than crashing), so they are typed
//! enums the caller can match on instead of `anyhow` blobs.

use thiserror::Error;

/// Why a submission was rejected before any network I/O happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The link is not open; the submission is a local no-op.
    #[error("not connected to the tutor backend")]
    NotConnected,
    /// The code buffer is blank after trimming.
    #[error("nothing to submit: code is empty")]
    EmptyInput,
}

/// Why a raw send on the link failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The link state is not `Open`.
    #[error("link is not open")]
    NotConnected,
    /// The background link task has shut down and will not come back.
    #[error("link task has shut down")]
    LinkClosed,
}

/// Failure to interpret an inbound wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The payload was not parseable structured data. The message is
    /// dropped; the session continues unaffected.
    #[error("malformed wire message: {0}")]
    Malformed(String),
}
