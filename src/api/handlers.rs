//! HTTP handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::sse::Sse;
use tracing::{debug, instrument};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::bridge::ConversationStream;
use crate::protocol::JsonRpcMessage;

/// Health check endpoint. No side effects, no conversation created.
pub async fn health() -> &'static str {
    "ok"
}

/// Accept one protocol message and stream the processor's replies as SSE.
///
/// A malformed body is the one synchronous error exit; everything after the
/// stream begins is reported in-stream.
#[instrument(skip(state, body))]
pub async fn mcp(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Sse<ConversationStream>> {
    if body.is_empty() {
        return Err(ApiError::bad_request("empty request body"));
    }

    let message = JsonRpcMessage::from_slice(&body)
        .map_err(|err| ApiError::bad_request(format!("invalid protocol message: {err}")))?;

    debug!(kind = ?message.kind(), "accepted protocol message");
    Ok(Sse::new(state.bridge.open(message)))
}
