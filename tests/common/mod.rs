//! Test utilities: app construction and scripted processor stubs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use serde_json::{Value, json};

use mcp_bridge::api::{self, AppState};
use mcp_bridge::bridge::{BridgeConfig, SessionBridge};
use mcp_bridge::channel::{MessageReceiver, MessageSender};
use mcp_bridge::processor::MessageProcessor;
use mcp_bridge::protocol::JsonRpcMessage;

/// Create a test application around the given processor.
pub fn test_app(processor: Arc<dyn MessageProcessor>, timeout: Duration) -> Router {
    let bridge = SessionBridge::new(processor, BridgeConfig { timeout });
    api::create_router(AppState::new(bridge))
}

/// Create a test application with the default 30s conversation timeout.
pub fn test_app_default(processor: Arc<dyn MessageProcessor>) -> Router {
    test_app(processor, Duration::from_secs(30))
}

/// Replies to each inbound message with `notifications` progress
/// notifications followed by one response echoing the request.
pub struct EchoProcessor {
    pub notifications: usize,
}

#[async_trait]
impl MessageProcessor for EchoProcessor {
    async fn run(&self, mut inbound: MessageReceiver, outbound: MessageSender) -> Result<()> {
        while let Some(message) = inbound.recv().await {
            for seq in 0..self.notifications {
                outbound.send(JsonRpcMessage::from_value(json!({
                    "jsonrpc": "2.0",
                    "method": "notify/progress",
                    "params": { "seq": seq, "of": message.id().cloned().unwrap_or(Value::Null) },
                }))?)?;
            }
            outbound.send(JsonRpcMessage::from_value(json!({
                "jsonrpc": "2.0",
                "id": message.id().cloned().unwrap_or(Value::Null),
                "result": { "echo": message.as_value() },
            }))?)?;
        }
        Ok(())
    }
}

/// Closes its outbound side, then never returns.
pub struct LingeringProcessor;

#[async_trait]
impl MessageProcessor for LingeringProcessor {
    async fn run(&self, mut inbound: MessageReceiver, outbound: MessageSender) -> Result<()> {
        while inbound.recv().await.is_some() {}
        outbound.close();
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Consumes its input and fails.
pub struct FailingProcessor;

#[async_trait]
impl MessageProcessor for FailingProcessor {
    async fn run(&self, mut inbound: MessageReceiver, _outbound: MessageSender) -> Result<()> {
        while inbound.recv().await.is_some() {}
        anyhow::bail!("conversion backend unavailable")
    }
}

/// Emits `preamble` notifications, then hangs forever without completing.
/// Tracks live executions so tests can assert cleanup.
pub struct StuckProcessor {
    pub preamble: usize,
    active: Arc<AtomicUsize>,
}

impl StuckProcessor {
    pub fn new(preamble: usize) -> Self {
        Self {
            preamble,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageProcessor for StuckProcessor {
    async fn run(&self, _inbound: MessageReceiver, outbound: MessageSender) -> Result<()> {
        self.active.fetch_add(1, Ordering::SeqCst);
        let _guard = ActiveGuard(Arc::clone(&self.active));
        for seq in 0..self.preamble {
            outbound.send(JsonRpcMessage::from_value(json!({
                "jsonrpc": "2.0",
                "method": "notify/progress",
                "params": { "seq": seq },
            }))?)?;
        }
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Counts executions like [`StuckProcessor`] but completes normally,
/// echoing one response.
pub struct TrackedEchoProcessor {
    active: Arc<AtomicUsize>,
}

impl TrackedEchoProcessor {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }
}

#[async_trait]
impl MessageProcessor for TrackedEchoProcessor {
    async fn run(&self, inbound: MessageReceiver, outbound: MessageSender) -> Result<()> {
        self.active.fetch_add(1, Ordering::SeqCst);
        let _guard = ActiveGuard(Arc::clone(&self.active));
        EchoProcessor { notifications: 0 }.run(inbound, outbound).await
    }
}

/// Wait until `counter` drops to zero, panicking after one second.
pub async fn assert_drains_to_zero(counter: &AtomicUsize) {
    for _ in 0..100 {
        if counter.load(Ordering::SeqCst) == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected all processor executions to finish, {} still live",
        counter.load(Ordering::SeqCst)
    );
}

/// Parse an SSE body into the JSON payloads of its `data:` frames.
pub fn parse_sse_frames(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            let data: String = chunk
                .lines()
                .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
                .collect();
            serde_json::from_str(&data).expect("SSE frame payload is not valid JSON")
        })
        .collect()
}
