//! Session link lifecycle.
//!
//! [`SessionLink`] owns the single duplex WebSocket to the tutor backend.
//! A background task manages connect / reconnect / teardown and publishes
//! the current [`ConnectionState`] through a watch channel; inbound text
//! frames are forwarded on an mpsc channel for the coordinator to decode.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──ok──► Open ──close(1000)──► Closed          (terminal)
//!     │                │
//!     └──err──┐        └──abnormal close──┐
//!             ▼                           ▼
//!        Reconnecting ◄── backoff ── attempt budget left?
//!             │                           │ no
//!             └────► Connecting           ▼
//!                                     Exhausted            (terminal)
//! ```
//!
//! An abnormal closure conceptually passes through Closed on its way to
//! Reconnecting or Exhausted. The watch channel is last-value-wins, so
//! that instant is collapsed: subscribers see the settled state directly
//! and a published Closed always means the link is down for good.
//!
//! Exactly one transport is live at a time; replacing it on reconnect
//! drops the previous reader/writer halves and their subscriptions.
//! Dropping the link cancels any pending reconnect sleep and closes the
//! live socket, so no timers or sockets outlive the handle.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::constants::{INBOUND_BUFFER, NORMAL_CLOSE_CODE};
use crate::error::SendError;
use crate::session::backoff::ReconnectPolicy;
use crate::ws;

/// Connectivity of the session link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    Connecting,
    /// The link is ready; sends are accepted.
    Open,
    /// The backend closed the link normally. No reconnection follows.
    Closed,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting,
    /// The attempt budget is spent. Terminal until a fresh link is built.
    Exhausted,
}

/// Minimal view of the link that request submission needs.
///
/// The coordinator is generic over this seam so its state machine can be
/// tested against a recording fake instead of a live socket.
pub trait Link {
    /// Current connectivity state.
    fn state(&self) -> ConnectionState;

    /// Queue a text frame for sending.
    ///
    /// # Errors
    ///
    /// Fails with [`SendError::NotConnected`] unless the state is
    /// [`ConnectionState::Open`].
    fn send_text(&self, text: &str) -> Result<(), SendError>;
}

impl<T: Link + ?Sized> Link for &T {
    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        (**self).send_text(text)
    }
}

/// Handle to the background link task.
///
/// Cloneable state observation via [`Self::watch_state`]; sends are
/// synchronous queue pushes guarded by the current state. Dropping the
/// handle tears the connection down.
#[derive(Debug)]
pub struct SessionLink {
    outbound_tx: mpsc::UnboundedSender<String>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl SessionLink {
    /// Spawn the background task and start connecting to `url`.
    ///
    /// Returns the handle plus the receiver for inbound text frames.
    /// `url` must be a full WebSocket URL, normally built with
    /// [`session_url`].
    #[must_use]
    pub fn connect(url: String, policy: ReconnectPolicy) -> (Self, mpsc::Receiver<String>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();

        tokio::spawn(run_link_loop(
            url,
            policy,
            state_tx,
            outbound_rx,
            inbound_tx,
            cancel.clone(),
        ));

        (
            Self {
                outbound_tx,
                state_rx,
                cancel,
            },
            inbound_rx,
        )
    }

    /// Subscribe to connectivity changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Tear down the link: cancel any pending reconnect sleep and close
    /// the live socket. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Link for SessionLink {
    fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        if self.state() != ConnectionState::Open {
            return Err(SendError::NotConnected);
        }
        self.outbound_tx
            .send(text.to_string())
            .map_err(|_| SendError::LinkClosed)
    }
}

impl Drop for SessionLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Build the WebSocket URL for a client session.
///
/// Converts an `http(s)://` server URL to the `ws(s)://` scheme and
/// appends the `/ws/<session_id>` path the backend routes on.
#[must_use]
pub fn session_url(server_url: &str, session_id: &str) -> String {
    let base = ws::http_to_ws_scheme(server_url);
    format!("{}/ws/{}", base.trim_end_matches('/'), session_id)
}

/// Why the open-link loop returned.
enum LinkExit {
    /// Shutdown was requested or the consumer went away.
    Shutdown,
    /// The backend sent close code 1000 — do not reconnect.
    ClosedNormally,
    /// Abnormal closure or transport error — candidate for reconnect.
    Dropped,
}

/// Outer connection loop: connect, run, back off, repeat.
async fn run_link_loop(
    url: String,
    mut policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    inbound_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    loop {
        state_tx.send_replace(ConnectionState::Connecting);
        log::info!("[Session] Connecting to {url}");

        let connected = tokio::select! {
            () = cancel.cancelled() => {
                state_tx.send_replace(ConnectionState::Closed);
                return;
            }
            result = ws::connect(&url) => result,
        };

        match connected {
            Ok((mut writer, mut reader)) => {
                policy.reset();
                state_tx.send_replace(ConnectionState::Open);
                log::info!("[Session] Link open");

                let exit = run_open_link(
                    &mut writer,
                    &mut reader,
                    &mut outbound_rx,
                    &inbound_tx,
                    &cancel,
                )
                .await;

                match exit {
                    LinkExit::Shutdown => {
                        let _ = writer.close().await;
                        state_tx.send_replace(ConnectionState::Closed);
                        return;
                    }
                    LinkExit::ClosedNormally => {
                        log::info!("[Session] Backend closed the link normally");
                        state_tx.send_replace(ConnectionState::Closed);
                        return;
                    }
                    LinkExit::Dropped => {}
                }
            }
            Err(e) => {
                log::warn!("[Session] Connect failed: {e}");
            }
        }

        // Abnormal closure (or failed attempt): consult the backoff budget
        match policy.next_delay() {
            Some(delay) => {
                state_tx.send_replace(ConnectionState::Reconnecting);
                log::info!(
                    "[Session] Reconnecting in {}ms (attempt {})",
                    delay.as_millis(),
                    policy.attempt_count()
                );
                tokio::select! {
                    () = cancel.cancelled() => {
                        state_tx.send_replace(ConnectionState::Closed);
                        return;
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            None => {
                log::warn!("[Session] Reconnect attempts exhausted, giving up");
                state_tx.send_replace(ConnectionState::Exhausted);
                return;
            }
        }
    }
}

/// Inner loop for one live connection.
///
/// Multiplexes outbound sends and inbound frames on a single task.
/// Inbound text frames are forwarded verbatim; decoding happens in the
/// coordinator so a malformed payload can never kill this loop.
async fn run_open_link(
    writer: &mut ws::WsWriter,
    reader: &mut ws::WsReader,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    inbound_tx: &mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> LinkExit {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return LinkExit::Shutdown,

            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(e) = writer.send_text(&text).await {
                            log::warn!("[Session] Send failed: {e}");
                            return LinkExit::Dropped;
                        }
                    }
                    // All senders dropped — the handle is gone
                    None => return LinkExit::Shutdown,
                }
            }

            frame = reader.recv() => {
                match frame {
                    Some(Ok(ws::WsMessage::Text(text))) => {
                        if inbound_tx.send(text).await.is_err() {
                            // Consumer dropped the receiver
                            return LinkExit::Shutdown;
                        }
                    }
                    Some(Ok(ws::WsMessage::Ping(data))) => {
                        let _ = writer.send_pong(data).await;
                    }
                    Some(Ok(ws::WsMessage::Close { code, reason })) => {
                        if code == NORMAL_CLOSE_CODE {
                            return LinkExit::ClosedNormally;
                        }
                        log::warn!("[Session] Abnormal close: code={code} reason={reason:?}");
                        return LinkExit::Dropped;
                    }
                    Some(Ok(ws::WsMessage::Pong(_))) => {}
                    Some(Err(e)) => {
                        log::warn!("[Session] Read error: {e}");
                        return LinkExit::Dropped;
                    }
                    None => {
                        log::warn!("[Session] Stream ended without a close frame");
                        return LinkExit::Dropped;
                    }
                }
            }
        }
    }
}
