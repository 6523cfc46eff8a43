//! Session wire protocol.
//!
//! JSON messages exchanged with the tutor backend over the WebSocket,
//! one object per text frame, dispatched on a `type` tag:
//!
//! Outbound:
//! ```text
//! { "type": "execute_code",    "code": ..., "language": ... }
//! { "type": "get_explanation", "code": ..., "language": ..., "context": ... }
//! ```
//!
//! Inbound:
//! ```text
//! { "type": "execution_start",    "message": ... }
//! { "type": "execution_result",   "data": ... }
//! { "type": "execution_error",    "error": ... }
//! { "type": "explanation_result", "explanation": ... }
//! { "type": "explanation_error",  "error": ... }
//! ```
//!
//! Encoding and decoding are pure; no I/O and no state between calls.
//! Unrecognized `type` values decode to [`InboundEvent::Unknown`] so
//! newer backends can add message kinds without breaking this client.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// The two logical operations multiplexed over one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Run the submitted code on the backend.
    Execute,
    /// Ask the backend for an AI explanation of the code.
    Explain,
}

/// Outbound request message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundRequest {
    /// Execute `code` under the interpreter selected by `language`.
    ExecuteCode {
        /// Source code buffer.
        code: String,
        /// Language tag (e.g. "python", "javascript").
        language: String,
    },
    /// Request an explanation of `code`.
    GetExplanation {
        /// Source code buffer.
        code: String,
        /// Language tag.
        language: String,
        /// Free-form hint about what the user wants explained.
        context: String,
    },
}

impl OutboundRequest {
    /// Which operation this request belongs to.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::ExecuteCode { .. } => Operation::Execute,
            Self::GetExplanation { .. } => Operation::Explain,
        }
    }

    /// Serialize to a wire frame.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("request serialization cannot fail")
    }
}

/// Inbound message, classified by operation kind and role.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Execution has started on the backend (informational).
    ExecutionStart {
        /// Status text (e.g. "Running...").
        message: String,
    },
    /// Execution output. Terminal for the Execute operation.
    ExecutionResult {
        /// Program output; usually a string but the backend may send
        /// arbitrary JSON.
        data: serde_json::Value,
    },
    /// Execution failed. Terminal for the Execute operation.
    ExecutionError {
        /// Backend-reported error text.
        error: String,
    },
    /// Explanation completed. Terminal for the Explain operation; the
    /// whole explanation arrives in this single message.
    ExplanationResult {
        /// Explanation text.
        explanation: String,
    },
    /// Explanation failed. Terminal for the Explain operation.
    ExplanationError {
        /// Backend-reported error text.
        error: String,
    },
    /// A `type` value this client does not know. Ignored, not an error —
    /// forward compatibility.
    #[serde(other)]
    Unknown,
}

/// Parse a raw text frame into an [`InboundEvent`].
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the payload is not a JSON
/// object with a string `type` field. Callers drop such frames.
pub fn decode(raw: &str) -> Result<InboundEvent, ProtocolError> {
    serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_execute_code() {
        let request = OutboundRequest::ExecuteCode {
            code: "print(1)".into(),
            language: "python".into(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&request.encode()).expect("valid JSON");
        assert_eq!(
            value,
            json!({ "type": "execute_code", "code": "print(1)", "language": "python" })
        );
        assert_eq!(request.operation(), Operation::Execute);
    }

    #[test]
    fn encode_get_explanation() {
        let request = OutboundRequest::GetExplanation {
            code: "x = 1".into(),
            language: "python".into(),
            context: "User wants to understand this code".into(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&request.encode()).expect("valid JSON");
        assert_eq!(value["type"], "get_explanation");
        assert_eq!(value["context"], "User wants to understand this code");
        assert_eq!(request.operation(), Operation::Explain);
    }

    #[test]
    fn decode_execution_events() {
        assert_eq!(
            decode(r#"{"type":"execution_start","message":"Running..."}"#).unwrap(),
            InboundEvent::ExecutionStart { message: "Running...".into() }
        );
        assert_eq!(
            decode(r#"{"type":"execution_result","data":"1\n"}"#).unwrap(),
            InboundEvent::ExecutionResult { data: json!("1\n") }
        );
        assert_eq!(
            decode(r#"{"type":"execution_error","error":"boom"}"#).unwrap(),
            InboundEvent::ExecutionError { error: "boom".into() }
        );
    }

    #[test]
    fn decode_explanation_events() {
        assert_eq!(
            decode(r#"{"type":"explanation_result","explanation":"It prints 1."}"#).unwrap(),
            InboundEvent::ExplanationResult { explanation: "It prints 1.".into() }
        );
        assert_eq!(
            decode(r#"{"type":"explanation_error","error":"timeout"}"#).unwrap(),
            InboundEvent::ExplanationError { error: "timeout".into() }
        );
    }

    #[test]
    fn unrecognized_type_decodes_to_unknown() {
        let event = decode(r#"{"type":"heartbeat","seq":7}"#).unwrap();
        assert_eq!(event, InboundEvent::Unknown);
    }

    #[test]
    fn missing_type_field_is_malformed() {
        assert!(decode(r#"{"message":"no tag"}"#).is_err());
    }

    #[test]
    fn non_json_payload_is_malformed() {
        assert!(decode("not json at all").is_err());
    }

    #[test]
    fn structured_result_data_survives_decoding() {
        let event = decode(r#"{"type":"execution_result","data":{"stdout":"1\n","ms":12}}"#)
            .unwrap();
        match event {
            InboundEvent::ExecutionResult { data } => {
                assert_eq!(data["stdout"], "1\n");
                assert_eq!(data["ms"], 12);
            }
            other => panic!("expected ExecutionResult, got {other:?}"),
        }
    }
}
