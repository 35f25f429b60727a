//! STDIO transport implementation.
//!
//! Newline-delimited JSON-RPC over the process's stdin/stdout pair. One peer,
//! one session, no reconnect: when stdin reaches EOF the session closes,
//! in-flight requests are cancelled and drained, and the transport returns.
//!
//! stdout carries protocol lines only. Logging goes to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::session::Session;
use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// Lifecycle of the duplex link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexState {
    Unconnected,
    Connected,
    Closed,
}

/// STDIO transport handler.
pub struct StdioTransport {
    state: DuplexState,
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            state: DuplexState::Unconnected,
        }
    }

    pub fn state(&self) -> DuplexState {
        self.state
    }

    /// Run the STDIO transport until stdin closes.
    pub async fn run(mut self, server: McpServer) -> TransportResult<()> {
        info!("Ready - communicating via stdin/stdout");
        self.serve(server, tokio::io::stdin(), tokio::io::stdout())
            .await?;
        info!("STDIO transport finished");
        Ok(())
    }

    /// Serve one peer over an arbitrary reader/writer pair.
    ///
    /// Each inbound line is dispatched on its own task; replies are written
    /// by a single writer task so lines never interleave.
    pub async fn serve<R, W>(
        &mut self,
        server: McpServer,
        reader: R,
        writer: W,
    ) -> TransportResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if self.state != DuplexState::Unconnected {
            return Err(TransportError::connection(
                "duplex transport can only be connected once",
            ));
        }
        self.state = DuplexState::Connected;

        let session = Arc::new(Session::new("stdio"));
        let (outbound, inbox) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_lines(writer, inbox));

        let mut lines = BufReader::new(reader).lines();
        let mut tasks = JoinSet::new();
        let mut read_error = None;

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let server = server.clone();
                        let session = session.clone();
                        let outbound = outbound.clone();
                        tasks.spawn(async move {
                            let Some(response) = server.handle_message(&line, &session).await else {
                                return;
                            };
                            match serde_json::to_string(&response) {
                                Ok(encoded) => {
                                    if outbound.send(encoded).is_err() {
                                        warn!("Writer closed before response could be sent");
                                    }
                                }
                                Err(e) => error!("Failed to encode response: {}", e),
                            }
                        });
                    }
                    Ok(None) => {
                        info!("Peer closed stdin");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read from stdin: {}", e);
                        read_error = Some(e);
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Request task failed: {}", e);
                    }
                }
            }
        }

        session.close();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Request task failed: {}", e);
            }
        }

        drop(outbound);
        let written = writer_task
            .await
            .map_err(|e| TransportError::connection(format!("writer task failed: {e}")))?;
        self.state = DuplexState::Closed;
        debug!("Duplex link closed");

        written?;
        match read_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

async fn write_lines<W>(mut writer: W, mut inbox: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = inbox.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
