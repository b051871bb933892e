//! Session bridge: one conversation per accepted HTTP request.
//!
//! A conversation pairs a fresh duplex channel pair with one backend
//! processor execution and one SSE response stream. The single inbound
//! message is pushed and the inbound side closed; the drain loop then
//! forwards every outbound message as one SSE `data:` frame until the
//! processor completes, faults, or the per-conversation timeout elapses.
//! Every exit path, including client disconnect, aborts the processor
//! execution and discards the channel pair.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::response::sse::Event;
use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::channel::{self, MessageReceiver};
use crate::processor::MessageProcessor;
use crate::protocol::{self, JsonRpcMessage};

/// Immutable per-process bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum lifetime of one conversation, measured from acceptance.
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Bridges single protocol messages into processor conversations.
pub struct SessionBridge {
    processor: Arc<dyn MessageProcessor>,
    config: BridgeConfig,
}

impl SessionBridge {
    pub fn new(processor: Arc<dyn MessageProcessor>, config: BridgeConfig) -> Self {
        Self { processor, config }
    }

    /// Open a conversation for one validated inbound message.
    ///
    /// Starts a fresh processor execution, pushes the message, closes the
    /// inbound side, and returns the stream of SSE events to serve. Dropping
    /// the stream (client disconnect) cancels the execution.
    pub fn open(&self, message: JsonRpcMessage) -> ConversationStream {
        let conversation_id = Uuid::new_v4();
        let request_id = message.id().cloned();
        let (bridge_side, processor_side) = channel::duplex();

        let processor = Arc::clone(&self.processor);
        let processor_task: JoinHandle<anyhow::Result<()>> = tokio::spawn(async move {
            processor
                .run(processor_side.inbound, processor_side.outbound)
                .await
        });
        let processor_abort = processor_task.abort_handle();

        debug!(%conversation_id, "conversation started");

        let channel::BridgeSide { inbound, outbound } = bridge_side;
        if inbound.send(message).is_err() {
            // Only possible if the processor dropped its receiver before
            // consuming input; the fault surfaces through the join below.
            warn!(%conversation_id, "processor closed the inbound channel before receiving input");
        }
        inbound.close();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(
            conversation_id,
            request_id,
            outbound,
            processor_task,
            events_tx,
            self.config.timeout,
        ));

        ConversationStream {
            events: UnboundedReceiverStream::new(events_rx),
            _guard: ConversationGuard {
                driver: driver.abort_handle(),
                processor: processor_abort,
            },
        }
    }
}

/// Drain loop: forwards outbound messages as SSE events until completion,
/// fault, or timeout.
async fn drive(
    conversation_id: Uuid,
    request_id: Option<Value>,
    mut outbound: MessageReceiver,
    mut processor_task: JoinHandle<anyhow::Result<()>>,
    events: mpsc::UnboundedSender<Event>,
    timeout: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;
    let expired = tokio::time::sleep_until(deadline);
    tokio::pin!(expired);

    loop {
        tokio::select! {
            received = outbound.recv() => match received {
                Some(message) => {
                    if events.send(Event::default().data(message.to_json())).is_err() {
                        // Client went away; the stream guard handles cleanup.
                        debug!(%conversation_id, "client disconnected");
                        break;
                    }
                }
                None => {
                    // Processor closed its outbound side. It still has to
                    // return within the conversation window: a processor
                    // lingering after closing its output must not suspend
                    // the conversation past the deadline.
                    let joined = tokio::select! {
                        joined = &mut processor_task => joined,
                        _ = &mut expired => {
                            warn!(%conversation_id, ?timeout, "conversation timed out waiting for processor exit");
                            let frame = protocol::error_frame(
                                request_id.clone(),
                                protocol::CONVERSATION_TIMEOUT,
                                format!("conversation timed out after {}s", timeout.as_secs_f64()),
                            );
                            let _ = events.send(Event::default().data(frame.to_json()));
                            break;
                        }
                    };
                    // Report any fault inside the stream.
                    match joined {
                        Ok(Ok(())) => {
                            debug!(%conversation_id, "conversation completed");
                        }
                        Ok(Err(err)) => {
                            warn!(%conversation_id, error = %err, "processor fault");
                            let frame = protocol::error_frame(
                                request_id.clone(),
                                protocol::INTERNAL_ERROR,
                                err.to_string(),
                            );
                            let _ = events.send(Event::default().data(frame.to_json()));
                        }
                        Err(err) if err.is_cancelled() => {}
                        Err(err) => {
                            warn!(%conversation_id, error = %err, "processor task panicked");
                            let frame = protocol::error_frame(
                                request_id.clone(),
                                protocol::INTERNAL_ERROR,
                                "processor execution failed",
                            );
                            let _ = events.send(Event::default().data(frame.to_json()));
                        }
                    }
                    break;
                }
            },
            _ = &mut expired => {
                warn!(%conversation_id, ?timeout, "conversation timed out");
                let frame = protocol::error_frame(
                    request_id.clone(),
                    protocol::CONVERSATION_TIMEOUT,
                    format!("conversation timed out after {}s", timeout.as_secs_f64()),
                );
                let _ = events.send(Event::default().data(frame.to_json()));
                break;
            }
        }
    }

    // Covers the timeout and disconnect paths; a no-op once the task finished.
    processor_task.abort();
}

/// The SSE event stream for one conversation.
///
/// Dropping it aborts both the processor execution and the drain loop, so a
/// disconnected client cannot leak a running processor.
pub struct ConversationStream {
    events: UnboundedReceiverStream<Event>,
    _guard: ConversationGuard,
}

impl Stream for ConversationStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx).map(|event| event.map(Ok))
    }
}

struct ConversationGuard {
    driver: AbortHandle,
    processor: AbortHandle,
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        self.processor.abort();
        self.driver.abort();
    }
}
