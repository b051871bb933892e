//! JSON-RPC 2.0 envelope handling.
//!
//! The bridge is a transparent carrier: it validates that a body is a
//! well-formed envelope and classifies it, but never interprets `method` or
//! `params`. The original JSON value is preserved and re-serialized verbatim.

use serde_json::{Value, json};
use thiserror::Error;

/// Invalid JSON was received (JSON-RPC 2.0 `-32700`).
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object (`-32600`).
pub const INVALID_REQUEST: i64 = -32600;
/// Internal JSON-RPC error; used for processor faults (`-32603`).
pub const INTERNAL_ERROR: i64 = -32603;
/// Conversation timed out before the processor completed.
///
/// Implementation-defined server error, kept distinct from [`INTERNAL_ERROR`]
/// so clients can tell timeouts from faults.
pub const CONVERSATION_TIMEOUT: i64 = -32001;

/// Why a body failed envelope validation.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid JSON-RPC envelope: {0}")]
    InvalidEnvelope(&'static str),
}

impl EnvelopeError {
    /// The JSON-RPC error code matching this validation failure.
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidJson(_) => PARSE_ERROR,
            Self::InvalidEnvelope(_) => INVALID_REQUEST,
        }
    }
}

/// Envelope classification per JSON-RPC 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Has `method` and `id`.
    Request,
    /// Has `method` and no `id`.
    Notification,
    /// Has `id` and `result` or `error`.
    Response,
}

/// One validated JSON-RPC 2.0 envelope.
#[derive(Debug, Clone)]
pub struct JsonRpcMessage {
    value: Value,
    kind: MessageKind,
}

impl JsonRpcMessage {
    /// Parse and validate an envelope from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value as an envelope.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let object = value
            .as_object()
            .ok_or(EnvelopeError::InvalidEnvelope("message must be an object"))?;

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some("2.0") => {}
            Some(_) => {
                return Err(EnvelopeError::InvalidEnvelope(
                    "jsonrpc version must be \"2.0\"",
                ));
            }
            None => {
                return Err(EnvelopeError::InvalidEnvelope("missing jsonrpc field"));
            }
        }

        let kind = match object.get("method") {
            Some(method) => {
                if !method.is_string() {
                    return Err(EnvelopeError::InvalidEnvelope("method must be a string"));
                }
                if object.contains_key("id") {
                    MessageKind::Request
                } else {
                    MessageKind::Notification
                }
            }
            None => {
                if !object.contains_key("id") {
                    return Err(EnvelopeError::InvalidEnvelope(
                        "message has neither method nor id",
                    ));
                }
                if !object.contains_key("result") && !object.contains_key("error") {
                    return Err(EnvelopeError::InvalidEnvelope(
                        "response must carry result or error",
                    ));
                }
                MessageKind::Response
            }
        };

        Ok(Self { value, kind })
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The `id` field, if present.
    pub fn id(&self) -> Option<&Value> {
        self.value.get("id")
    }

    /// The envelope as the original JSON value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Serialize the envelope for the wire.
    pub fn to_json(&self) -> String {
        self.value.to_string()
    }
}

/// Build a terminal JSON-RPC error envelope for an SSE frame.
///
/// `id` is the originating request id when known, `null` otherwise.
pub fn error_frame(id: Option<Value>, code: i64, message: impl Into<String>) -> JsonRpcMessage {
    JsonRpcMessage {
        value: json!({
            "jsonrpc": "2.0",
            "id": id.unwrap_or(Value::Null),
            "error": {
                "code": code,
                "message": message.into(),
            }
        }),
        kind: MessageKind::Response,
    }
}
