//! Line-delimited JSON-RPC transport.
//!
//! One JSON message per line. Generic over the byte streams so the server
//! can run on stdio or on in-memory pipes in tests.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use super::protocol::JsonRpcResponse;

/// A line received from the peer.
#[derive(Debug)]
pub enum Incoming {
    Message(serde_json::Value),
    /// The line was not valid JSON
    Malformed(String),
}

pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

impl LineTransport<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next non-blank line; `None` at EOF.
    pub async fn read_message(&mut self) -> io::Result<Option<Incoming>> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Ok(None);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Ok(Some(match serde_json::from_str(trimmed) {
                Ok(value) => Incoming::Message(value),
                Err(e) => {
                    tracing::error!("Failed to parse JSON-RPC message: {}", e);
                    Incoming::Malformed(e.to_string())
                }
            }));
        }
    }

    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}
