//! Request coordination over the shared link.
//!
//! [`RequestCoordinator`] tracks at most one in-flight execution and one
//! in-flight explanation at a time. Because both operations share one
//! WebSocket and the protocol carries no request ids, inbound events are
//! classified purely by their `type` tag, never by arrival position.
//!
//! Per operation the lifecycle is Idle → Submitted → (Completed | Failed)
//! → Idle again on the next submission or clear. Submitting while the
//! same kind is in flight supersedes the old request client-side: the
//! corresponding log is cleared and a fresh request goes out. A late
//! reply for the superseded request is indistinguishable from the
//! current one and will be applied; the wire protocol would need a
//! correlation id to do better.

use crate::error::{SubmitError, SendError};
use crate::session::connection::{ConnectionState, Link};
use crate::session::protocol::{self, InboundEvent, OutboundRequest};

/// Classification of one result-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Informational (execution started).
    Info,
    /// Program output.
    Result,
    /// Backend-reported error.
    Error,
}

/// One entry in the execution result log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    /// Entry classification.
    pub kind: OutputKind,
    /// Rendered content.
    pub content: String,
}

/// Coordinates submissions and streamed results for one client session.
///
/// Owns the execution result log and the explanation text; the UI
/// collaborator reads them through the accessors and never mutates them
/// directly.
pub struct RequestCoordinator<L: Link> {
    link: L,
    language: String,
    explain_context: String,
    output: Vec<OutputEntry>,
    explanation: String,
    executing: bool,
    explaining: bool,
}

impl<L: Link> std::fmt::Debug for RequestCoordinator<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("language", &self.language)
            .field("executing", &self.executing)
            .field("explaining", &self.explaining)
            .field("output_entries", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl<L: Link> RequestCoordinator<L> {
    /// Create a coordinator for `link` with the given active language tag.
    pub fn new(link: L, language: impl Into<String>) -> Self {
        Self {
            link,
            language: language.into(),
            explain_context: crate::constants::DEFAULT_EXPLAIN_CONTEXT.to_string(),
            output: Vec::new(),
            explanation: String::new(),
            executing: false,
            explaining: false,
        }
    }

    /// Submit code for execution.
    ///
    /// Clears the result log and marks the Execute operation in flight.
    /// A submission while one is already in flight supersedes it.
    ///
    /// # Errors
    ///
    /// [`SubmitError::EmptyInput`] if `code` is blank after trimming,
    /// [`SubmitError::NotConnected`] if the link is not open. Neither
    /// touches the result log.
    pub fn submit_execute(&mut self, code: &str) -> Result<(), SubmitError> {
        self.precheck(code)?;
        let request = OutboundRequest::ExecuteCode {
            code: code.to_string(),
            language: self.language.clone(),
        };
        self.send(&request)?;
        self.output.clear();
        self.executing = true;
        Ok(())
    }

    /// Submit code for explanation, with the default context hint.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Self::submit_execute`].
    pub fn submit_explain(&mut self, code: &str) -> Result<(), SubmitError> {
        let context = self.explain_context.clone();
        self.submit_explain_with_context(code, &context)
    }

    /// Submit code for explanation with an explicit context hint.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Self::submit_execute`].
    pub fn submit_explain_with_context(
        &mut self,
        code: &str,
        context: &str,
    ) -> Result<(), SubmitError> {
        self.precheck(code)?;
        let request = OutboundRequest::GetExplanation {
            code: code.to_string(),
            language: self.language.clone(),
            context: context.to_string(),
        };
        self.send(&request)?;
        self.explanation.clear();
        self.explaining = true;
        Ok(())
    }

    /// Decode and route one raw inbound frame.
    ///
    /// Malformed payloads are dropped with a warning; unknown `type`
    /// values are ignored. Neither mutates the logs or flags.
    pub fn handle_raw(&mut self, raw: &str) {
        match protocol::decode(raw) {
            Ok(InboundEvent::Unknown) => {
                log::trace!("[Session] Ignoring unknown message type");
            }
            Ok(event) => self.handle_event(event),
            Err(e) => {
                log::warn!("[Session] Dropping inbound frame: {e}");
            }
        }
    }

    /// Route one decoded inbound event.
    pub fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::ExecutionStart { message } => {
                self.output.push(OutputEntry {
                    kind: OutputKind::Info,
                    content: message,
                });
            }
            InboundEvent::ExecutionResult { data } => {
                self.output.push(OutputEntry {
                    kind: OutputKind::Result,
                    content: render_data(&data),
                });
                self.executing = false;
            }
            InboundEvent::ExecutionError { error } => {
                self.output.push(OutputEntry {
                    kind: OutputKind::Error,
                    content: error,
                });
                self.executing = false;
            }
            InboundEvent::ExplanationResult { explanation } => {
                self.explanation = explanation;
                self.explaining = false;
            }
            InboundEvent::ExplanationError { error } => {
                self.explanation = format!("Error: {error}");
                self.explaining = false;
            }
            InboundEvent::Unknown => {}
        }
    }

    /// Empty the result log and explanation text.
    ///
    /// Connectivity and in-flight flags are untouched. Idempotent.
    pub fn clear(&mut self) {
        self.output.clear();
        self.explanation.clear();
    }

    /// Switch the active language tag.
    ///
    /// Results from a different language are stale, so both logs are
    /// discarded on an actual change. In-flight backend requests are not
    /// cancelled; a late reply for the old language is still applied.
    pub fn set_language(&mut self, language: &str) {
        if language == self.language {
            return;
        }
        self.language = language.to_string();
        self.clear();
    }

    /// Active language tag.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Execution result log, in arrival order.
    #[must_use]
    pub fn output(&self) -> &[OutputEntry] {
        &self.output
    }

    /// Latest explanation text (or formatted error), empty if none.
    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Whether an execution is in flight.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Whether an explanation is in flight.
    #[must_use]
    pub fn is_explaining(&self) -> bool {
        self.explaining
    }

    fn precheck(&self, code: &str) -> Result<(), SubmitError> {
        if code.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        if self.link.state() != ConnectionState::Open {
            return Err(SubmitError::NotConnected);
        }
        Ok(())
    }

    fn send(&self, request: &OutboundRequest) -> Result<(), SubmitError> {
        self.link.send_text(&request.encode()).map_err(|e| match e {
            SendError::NotConnected | SendError::LinkClosed => SubmitError::NotConnected,
        })
    }
}

/// Render execution output for the result log.
///
/// The backend usually sends a plain string; anything else is shown as
/// compact JSON.
fn render_data(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Recording link double: captures sends, state is settable.
    struct FakeLink {
        state: Cell<ConnectionState>,
        sent: RefCell<Vec<String>>,
    }

    impl FakeLink {
        fn open() -> Self {
            Self {
                state: Cell::new(ConnectionState::Open),
                sent: RefCell::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.borrow().clone()
        }
    }

    impl Link for FakeLink {
        fn state(&self) -> ConnectionState {
            self.state.get()
        }

        fn send_text(&self, text: &str) -> Result<(), SendError> {
            if self.state.get() != ConnectionState::Open {
                return Err(SendError::NotConnected);
            }
            self.sent.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    fn entry(kind: OutputKind, content: &str) -> OutputEntry {
        OutputEntry { kind, content: content.into() }
    }

    #[test]
    fn execute_round_trip_builds_the_result_log() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");

        coordinator.submit_execute("print(1)").unwrap();
        assert!(coordinator.is_executing());

        let sent = link.sent();
        assert_eq!(sent.len(), 1);
        let frame: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(frame["type"], "execute_code");
        assert_eq!(frame["code"], "print(1)");
        assert_eq!(frame["language"], "python");

        coordinator.handle_raw(r#"{"type":"execution_start","message":"Running..."}"#);
        coordinator.handle_raw(r#"{"type":"execution_result","data":"1\n"}"#);

        assert_eq!(
            coordinator.output(),
            &[
                entry(OutputKind::Info, "Running..."),
                entry(OutputKind::Result, "1\n"),
            ]
        );
        assert!(!coordinator.is_executing());
    }

    #[test]
    fn explanation_error_renders_formatted_text() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");

        coordinator.submit_explain("x = 1").unwrap();
        assert!(coordinator.is_explaining());

        coordinator.handle_raw(r#"{"type":"explanation_error","error":"timeout"}"#);
        assert_eq!(coordinator.explanation(), "Error: timeout");
        assert!(!coordinator.is_explaining());
    }

    #[test]
    fn explain_carries_default_context() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.submit_explain("x = 1").unwrap();

        let frame: serde_json::Value = serde_json::from_str(&link.sent()[0]).unwrap();
        assert_eq!(frame["type"], "get_explanation");
        assert_eq!(frame["context"], "User wants to understand this code");
    }

    #[test]
    fn blank_code_is_rejected_before_any_send() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");

        assert_eq!(coordinator.submit_execute("   \n\t"), Err(SubmitError::EmptyInput));
        assert_eq!(coordinator.submit_explain(""), Err(SubmitError::EmptyInput));
        assert!(link.sent().is_empty());
        assert!(!coordinator.is_executing());
    }

    #[test]
    fn submission_while_disconnected_is_a_no_op() {
        let link = FakeLink::open();
        link.state.set(ConnectionState::Reconnecting);
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.handle_raw(r#"{"type":"execution_start","message":"old"}"#);
        let before = coordinator.output().to_vec();

        assert_eq!(coordinator.submit_execute("print(1)"), Err(SubmitError::NotConnected));
        assert!(link.sent().is_empty());
        assert_eq!(coordinator.output(), &before[..]);
        assert!(!coordinator.is_executing());
    }

    #[test]
    fn resubmission_supersedes_the_previous_request() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");

        coordinator.submit_execute("print(1)").unwrap();
        coordinator.handle_raw(r#"{"type":"execution_start","message":"Running..."}"#);
        assert_eq!(coordinator.output().len(), 1);

        // Still in flight; the new submission clears the log and sends fresh
        coordinator.submit_execute("print(2)").unwrap();
        assert!(coordinator.output().is_empty());
        assert!(coordinator.is_executing());
        assert_eq!(link.sent().len(), 2);
    }

    #[test]
    fn operations_interleave_without_cross_talk() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");

        coordinator.submit_execute("print(1)").unwrap();
        coordinator.submit_explain("print(1)").unwrap();
        assert!(coordinator.is_executing());
        assert!(coordinator.is_explaining());

        // Backend happens to answer the explanation first
        coordinator.handle_raw(r#"{"type":"explanation_result","explanation":"Prints 1."}"#);
        assert!(!coordinator.is_explaining());
        assert!(coordinator.is_executing());
        assert_eq!(coordinator.explanation(), "Prints 1.");

        coordinator.handle_raw(r#"{"type":"execution_result","data":"1\n"}"#);
        assert!(!coordinator.is_executing());
        assert_eq!(coordinator.output(), &[entry(OutputKind::Result, "1\n")]);
    }

    #[test]
    fn execution_error_is_terminal_and_logged() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");

        coordinator.submit_execute("boom()").unwrap();
        coordinator.handle_raw(r#"{"type":"execution_error","error":"NameError: boom"}"#);

        assert_eq!(coordinator.output(), &[entry(OutputKind::Error, "NameError: boom")]);
        assert!(!coordinator.is_executing());
    }

    #[test]
    fn malformed_and_unknown_frames_mutate_nothing() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.submit_execute("print(1)").unwrap();

        coordinator.handle_raw("not json at all");
        coordinator.handle_raw(r#"{"message":"no type tag"}"#);
        coordinator.handle_raw(r#"{"type":"heartbeat","seq":1}"#);

        assert!(coordinator.output().is_empty());
        assert_eq!(coordinator.explanation(), "");
        assert!(coordinator.is_executing());
    }

    #[test]
    fn clear_is_idempotent_and_keeps_flags() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.submit_execute("print(1)").unwrap();
        coordinator.handle_raw(r#"{"type":"execution_start","message":"Running..."}"#);

        coordinator.clear();
        coordinator.clear();
        assert!(coordinator.output().is_empty());
        assert_eq!(coordinator.explanation(), "");
        assert!(coordinator.is_executing());
    }

    #[test]
    fn language_switch_discards_stale_results() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.submit_execute("print(1)").unwrap();
        coordinator.handle_raw(r#"{"type":"execution_start","message":"Running..."}"#);
        coordinator.handle_raw(r#"{"type":"explanation_result","explanation":"old"}"#);

        coordinator.set_language("javascript");
        assert_eq!(coordinator.language(), "javascript");
        assert!(coordinator.output().is_empty());
        assert_eq!(coordinator.explanation(), "");
        // The in-flight request is not cancelled; a late reply still lands
        assert!(coordinator.is_executing());
        coordinator.handle_raw(r#"{"type":"execution_result","data":"1\n"}"#);
        assert_eq!(coordinator.output(), &[entry(OutputKind::Result, "1\n")]);
    }

    #[test]
    fn language_switch_to_same_tag_keeps_results() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.handle_raw(r#"{"type":"execution_start","message":"Running..."}"#);

        coordinator.set_language("python");
        assert_eq!(coordinator.output().len(), 1);
    }

    #[test]
    fn structured_result_data_renders_as_json() {
        let link = FakeLink::open();
        let mut coordinator = RequestCoordinator::new(&link, "python");
        coordinator.handle_raw(r#"{"type":"execution_result","data":{"exit":0}}"#);
        assert_eq!(coordinator.output(), &[entry(OutputKind::Result, r#"{"exit":0}"#)]);
    }
}
