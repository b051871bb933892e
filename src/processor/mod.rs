//! Backend message processor seam.
//!
//! A processor consumes protocol messages from its inbound receiver and
//! produces protocol messages on its outbound sender. It runs until the
//! inbound side reports end-of-stream, closes its outbound side (by
//! returning, which drops the sender), and may be cancelled externally at
//! any time.

pub mod stdio;

pub use stdio::StdioProcessor;

use anyhow::Result;
use async_trait::async_trait;

use crate::channel::{MessageReceiver, MessageSender};

/// One conversation's worth of message processing.
///
/// Each call to [`run`](MessageProcessor::run) is an independent execution
/// with a fresh channel pair. Executions are never pooled or shared across
/// conversations; reuse would leak in-flight request state between
/// unrelated clients.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn run(&self, inbound: MessageReceiver, outbound: MessageSender) -> Result<()>;
}
