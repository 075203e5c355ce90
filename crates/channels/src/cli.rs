//! CLI channel — interactive terminal-based chat.
//!
//! Reads customer messages from stdin, writes replies to stdout.
//! Used for `pharmabot chat` interactive mode.

use async_trait::async_trait;
use pharmabot_core::channel::{Channel, ChannelId, ChannelMessage};
use pharmabot_core::error::ChannelError;
use std::io::Write;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Words that end an interactive session.
pub const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q", "خروج"];

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim().to_lowercase();
    EXIT_COMMANDS.contains(&line.as_str())
}

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward non-empty lines from `reader` until EOF, an exit command, or the
/// receiver going away.
pub fn spawn_line_reader<R>(
    reader: R,
    channel_id: ChannelId,
) -> mpsc::Receiver<Result<ChannelMessage, ChannelError>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }

                    if is_exit_command(&line) {
                        break;
                    }

                    let msg = ChannelMessage {
                        channel_id: channel_id.clone(),
                        sender_id: "local_user".into(),
                        content: line,
                        metadata: serde_json::Map::new(),
                    };

                    if tx.send(Ok(msg)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Input closed");
                    break; // EOF (Ctrl+D)
                }
                Err(e) => {
                    let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                    break;
                }
            }
        }
    });

    rx
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        Ok(spawn_line_reader(BufReader::new(io::stdin()), self.id.clone()))
    }

    async fn send(&self, content: &str) -> Result<(), ChannelError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{content}")
            .and_then(|_| stdout.flush())
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "cli".into(),
                reason: e.to_string(),
            })
    }
}
