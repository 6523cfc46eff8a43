//! Tutor client - real-time session client for the code tutor backend.
//!
//! This crate provides the connectivity core of an interactive code
//! tutoring front end: it owns a single persistent WebSocket to the
//! backend, reconnects it automatically under failure, and correlates
//! streamed multi-message responses to the two logical operations
//! (code execution and code explanation) sharing that link.
//!
//! # Architecture
//!
//! - **SessionLink** - owns the duplex connection lifecycle: connect,
//!   detect closure, back off, reconnect, expose connectivity
//! - **protocol** - the tagged JSON message vocabulary and pure decode
//! - **RequestCoordinator** - one in-flight request per operation kind,
//!   ordered result logs, submission preconditions
//!
//! The editor/UI is an external collaborator; the `tutor` binary is a
//! thin CLI standing in for it.
//!
//! # Modules
//!
//! - [`session`] - link lifecycle, wire protocol, request coordination
//! - [`ws`] - shared WebSocket transport wrapper
//! - [`config`] - configuration loading/saving

pub mod config;
pub mod constants;
pub mod error;
pub mod session;
pub mod ws;

// Re-export commonly used types
pub use config::Config;
pub use error::{ProtocolError, SendError, SubmitError};
pub use session::{
    client_session_id, session_url, ConnectionState, InboundEvent, Link, Operation,
    OutboundRequest, OutputEntry, OutputKind, ReconnectPolicy, RequestCoordinator, SessionLink,
};
