//! In-process channel pair, for hosts embedding a session and for tests.

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::protocol::channel::{disconnected, MessageChannel};
use crate::protocol::ProcessMessage;

/// Worker side of an in-memory channel.
pub struct MemoryChannel {
    to_host: UnboundedSender<ProcessMessage>,
    from_host: Mutex<UnboundedReceiver<ProcessMessage>>,
}

/// Host side of an in-memory channel.
pub struct HostEndpoint {
    to_worker: UnboundedSender<ProcessMessage>,
    from_worker: UnboundedReceiver<ProcessMessage>,
}

impl MemoryChannel {
    /// Create a connected worker/host pair.
    pub fn pair() -> (MemoryChannel, HostEndpoint) {
        let (to_host, from_worker) = mpsc::unbounded_channel();
        let (to_worker, from_host) = mpsc::unbounded_channel();

        (
            MemoryChannel {
                to_host,
                from_host: Mutex::new(from_host),
            },
            HostEndpoint {
                to_worker,
                from_worker,
            },
        )
    }
}

impl MessageChannel for MemoryChannel {
    async fn send(&self, message: &ProcessMessage) -> Result<()> {
        self.to_host
            .send(message.clone())
            .map_err(|_| disconnected())
    }

    async fn recv(&self) -> Result<Option<ProcessMessage>> {
        Ok(self.from_host.lock().await.recv().await)
    }
}

impl HostEndpoint {
    /// Send a message to the worker. Returns `false` when the worker side
    /// is gone.
    pub fn send(&self, message: ProcessMessage) -> bool {
        self.to_worker.send(message).is_ok()
    }

    /// Answer a `getModel` request.
    pub fn send_model(&self, model_data: Option<Value>) -> bool {
        self.send(ProcessMessage::SetModel { model_data })
    }

    /// Wait for the next message from the worker.
    pub async fn recv(&mut self) -> Option<ProcessMessage> {
        self.from_worker.recv().await
    }

    /// Next already-delivered message, if any.
    pub fn try_recv(&mut self) -> Option<ProcessMessage> {
        self.from_worker.try_recv().ok()
    }

    /// All messages delivered so far, in order.
    pub fn drain(&mut self) -> Vec<ProcessMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.try_recv() {
            messages.push(message);
        }
        messages
    }
}
