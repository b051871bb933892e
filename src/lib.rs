//! Streamable HTTP bridge for stdio MCP servers.
//!
//! Accepts one JSON-RPC 2.0 message per `POST /mcp` request, runs a fresh
//! backend processor execution for it, and streams every message the
//! processor emits back to the client as server-sent events.

pub mod api;
pub mod bridge;
pub mod channel;
pub mod processor;
pub mod protocol;
