//! Application-wide constants for the tutor client.
//!
//! Centralizes magic numbers so the reconnect schedule and protocol
//! defaults are documented in one place.

use std::time::Duration;

// ============================================================================
// Reconnection
// ============================================================================

/// Delay before the first reconnection attempt.
///
/// Doubles on each consecutive failed cycle until [`RECONNECT_MAX_DELAY`]
/// is reached.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Ceiling for the exponential reconnect backoff.
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Number of consecutive failed cycles before the link gives up.
///
/// Once exhausted, no automatic attempts are made; the user has to start
/// a fresh session (the CLI analogue of reloading the page).
pub const RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// WebSocket close code for a normal, intentional closure.
///
/// A close frame carrying this code never schedules a reconnection;
/// every other code is treated as an abnormal drop.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

// ============================================================================
// Channels
// ============================================================================

/// Buffer size for inbound text frames before backpressure applies.
pub const INBOUND_BUFFER: usize = 256;

// ============================================================================
// Defaults
// ============================================================================

/// Default backend base URL (the `/ws/<session>` path is appended).
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default language tag sent with submissions.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Context string attached to explanation requests by default.
pub const DEFAULT_EXPLAIN_CONTEXT: &str = "User wants to understand this code";
