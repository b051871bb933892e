//! Child-process processor speaking newline-delimited JSON-RPC over stdio.
//!
//! One child process per conversation. Inbound messages are written to the
//! child's stdin as JSON lines; stdin is closed when the inbound channel
//! reports end-of-stream, which stdio MCP servers treat as "this exchange is
//! complete". Each stdout line that parses as an envelope is forwarded
//! outbound. The child is killed if the execution is cancelled.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::channel::{MessageReceiver, MessageSender};
use crate::processor::MessageProcessor;
use crate::protocol::JsonRpcMessage;

/// Spawns a configured command per conversation.
#[derive(Debug, Clone)]
pub struct StdioProcessor {
    command: String,
    args: Vec<String>,
}

impl StdioProcessor {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl MessageProcessor for StdioProcessor {
    async fn run(&self, mut inbound: MessageReceiver, outbound: MessageSender) -> Result<()> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning processor command '{}'", self.command))?;

        let mut stdin = child.stdin.take().context("child stdin not captured")?;
        let stdout = child.stdout.take().context("child stdout not captured")?;
        let mut lines = BufReader::new(stdout).lines();

        let writer = async {
            while let Some(message) = inbound.recv().await {
                let mut line = message.to_json();
                line.push('\n');
                stdin.write_all(line.as_bytes()).await?;
                stdin.flush().await?;
            }
            // End-of-input: close stdin so the child knows the exchange is over.
            drop(stdin);
            Ok::<_, std::io::Error>(())
        };

        let reader = async {
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                match JsonRpcMessage::from_slice(line.as_bytes()) {
                    Ok(message) => {
                        debug!("forwarding processor output line");
                        if outbound.send(message).is_err() {
                            // Bridge went away; stop reading.
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "skipping non-envelope processor output line");
                    }
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let (wrote, read) = tokio::join!(writer, reader);
        wrote.context("writing to processor stdin")?;
        read.context("reading processor stdout")?;

        let status = child.wait().await.context("waiting for processor exit")?;
        if !status.success() {
            anyhow::bail!("processor exited with {status}");
        }
        Ok(())
    }
}

/// Resolve `command` to an executable path, for startup validation.
///
/// Bare names are looked up in `PATH`; anything with a path separator is
/// checked directly.
pub fn resolve_command(command: &str) -> Result<PathBuf> {
    let path = Path::new(command);
    if path.components().count() > 1 {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!("processor command not found: {}", path.display());
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(command);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    anyhow::bail!("processor command '{command}' not found in PATH")
}
