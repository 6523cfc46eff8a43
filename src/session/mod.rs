//! Real-time session client.
//!
//! One persistent duplex WebSocket per client session, with three layers:
//!
//! - [`connection`] - link lifecycle: connect, detect closure, back off,
//!   reconnect, expose connectivity
//! - [`protocol`] - the wire vocabulary and pure encode/decode
//! - [`coordinator`] - per-operation in-flight tracking and result logs
//!
//! The UI collaborator submits through [`RequestCoordinator`], observes
//! connectivity through [`SessionLink::watch_state`], and feeds inbound
//! frames back into the coordinator.

pub mod backoff;
pub mod connection;
pub mod coordinator;
pub mod protocol;

pub use backoff::ReconnectPolicy;
pub use connection::{session_url, ConnectionState, Link, SessionLink};
pub use coordinator::{OutputEntry, OutputKind, RequestCoordinator};
pub use protocol::{InboundEvent, Operation, OutboundRequest};

/// Generate the opaque id identifying this client to the backend.
///
/// Format: `client_<unix-millis>_<9 random base36 chars>`. Generated once
/// at startup and kept for the lifetime of the session.
#[must_use]
pub fn client_session_id() -> String {
    use rand::Rng;

    const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("client_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}
