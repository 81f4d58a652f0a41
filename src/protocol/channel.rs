//! Message channel abstraction and the JSON Lines transport.

use std::future::Future;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::error::{GenError, Result};
use crate::protocol::ProcessMessage;

/// Bidirectional worker ↔ host channel.
///
/// `recv` is single-consumer: two tasks waiting on it at once race for the
/// next message, so callers await one response at a time.
pub trait MessageChannel: Send + Sync {
    /// Deliver `message` to the host. Messages arrive in call order.
    fn send(&self, message: &ProcessMessage) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next message from the host. `Ok(None)` means the host
    /// closed the channel.
    fn recv(&self) -> impl Future<Output = Result<Option<ProcessMessage>>> + Send;
}

/// Newline-delimited JSON over an async reader/writer pair.
///
/// Incoming lines that are blank, not UTF-8, or not a known message are
/// skipped with a warning; only read failures and end of input end `recv`.
pub struct JsonLinesChannel<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
}

/// JSON Lines over the worker's stdin (host → worker) and stdout
/// (worker → host).
pub type StdioChannel = JsonLinesChannel<Stdin, Stdout>;

impl<R, W> JsonLinesChannel<R, W>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
        }
    }
}

impl JsonLinesChannel<Stdin, Stdout> {
    /// Channel over the process's standard streams.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> MessageChannel for JsonLinesChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: &ProcessMessage) -> Result<()> {
        let mut line = serde_json::to_string(message).map_err(GenError::Codec)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await.map_err(GenError::Channel)?;
        writer.flush().await.map_err(GenError::Channel)?;

        tracing::trace!("Sent {}", message.cmd());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<ProcessMessage>> {
        let mut reader = self.reader.lock().await;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(GenError::Channel)?;
            if read == 0 {
                return Ok(None);
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!("Ignoring host message that is not UTF-8: {}", e);
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<ProcessMessage>(line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    tracing::warn!("Ignoring malformed host message {:?}: {}", line, e);
                }
            }
        }
    }
}

pub(crate) fn disconnected() -> GenError {
    GenError::Channel(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "host side of the channel is gone",
    ))
}
