//! Duplex channel pair connecting the bridge and a backend processor.
//!
//! Two unidirectional, unbounded, FIFO message queues: inbound (bridge to
//! processor) and outbound (processor to bridge). One producer and one
//! consumer per direction. A conversation gets a fresh pair; nothing is
//! shared across conversations.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::JsonRpcMessage;

/// A send was attempted after the target channel closed.
///
/// Internal-only: the bridge sends exactly once per conversation before
/// closing the inbound side, so this surfacing externally indicates a bug.
#[derive(Debug, Error)]
#[error("channel closed")]
pub struct ChannelClosed;

/// Producer half of one channel direction.
#[derive(Debug)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<JsonRpcMessage>,
}

impl MessageSender {
    /// Enqueue a message. Never blocks; fails only if the channel is closed.
    pub fn send(&self, message: JsonRpcMessage) -> Result<(), ChannelClosed> {
        self.tx.send(message).map_err(|_| ChannelClosed)
    }

    /// Close this direction. Messages already sent are still delivered to
    /// the consumer before it observes end-of-stream.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer half of one channel direction.
#[derive(Debug)]
pub struct MessageReceiver {
    rx: mpsc::UnboundedReceiver<JsonRpcMessage>,
}

impl MessageReceiver {
    /// Wait for the next message. Returns `None` once the channel is closed
    /// and all buffered messages have been consumed.
    pub async fn recv(&mut self) -> Option<JsonRpcMessage> {
        self.rx.recv().await
    }

    /// Close from the consumer side. Idempotent; future sends fail with
    /// [`ChannelClosed`], buffered messages remain receivable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// The bridge's view of a conversation's channel pair.
#[derive(Debug)]
pub struct BridgeSide {
    /// Producer for the inbound direction (towards the processor).
    pub inbound: MessageSender,
    /// Consumer for the outbound direction (from the processor).
    pub outbound: MessageReceiver,
}

/// The processor's view of a conversation's channel pair.
#[derive(Debug)]
pub struct ProcessorSide {
    /// Consumer for the inbound direction.
    pub inbound: MessageReceiver,
    /// Producer for the outbound direction.
    pub outbound: MessageSender,
}

/// Create a fresh channel pair for one conversation.
pub fn duplex() -> (BridgeSide, ProcessorSide) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    (
        BridgeSide {
            inbound: MessageSender { tx: inbound_tx },
            outbound: MessageReceiver { rx: outbound_rx },
        },
        ProcessorSide {
            inbound: MessageReceiver { rx: inbound_rx },
            outbound: MessageSender { tx: outbound_tx },
        },
    )
}
