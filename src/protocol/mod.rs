//! Worker ↔ host message protocol.
//!
//! Envelopes are JSON objects discriminated by a `cmd` field, one per line:
//!
//! ```text
//! {"cmd":"processStarted"}
//! {"cmd":"generateStarted"}
//! {"cmd":"getModel"}
//! {"cmd":"setModel","modelData":{"name":"Shop"}}
//! {"cmd":"log","level":"warn","message":"..."}
//! {"cmd":"generateFinished"}
//! ```
//!
//! The host keeps a worker alive while a `generateStarted` is open, so the
//! session always closes it with a matching `generateFinished`.

pub mod channel;
pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use channel::{JsonLinesChannel, MessageChannel, StdioChannel};
pub use memory::{HostEndpoint, MemoryChannel};

/// A single protocol envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum ProcessMessage {
    /// Worker booted and is ready.
    ProcessStarted,
    /// A unit of work began; the host must not kill the worker.
    GenerateStarted,
    /// The unit of work opened by the last `GenerateStarted` ended.
    GenerateFinished,
    /// Worker asks the host for model data.
    GetModel,
    /// Host answers `GetModel`.
    SetModel {
        #[serde(rename = "modelData", default)]
        model_data: Option<Value>,
    },
    /// Diagnostic forwarded from worker to host.
    Log { level: LogLevel, message: String },
}

impl ProcessMessage {
    /// The `cmd` discriminator of this envelope.
    pub fn cmd(&self) -> &'static str {
        match self {
            ProcessMessage::ProcessStarted => "processStarted",
            ProcessMessage::GenerateStarted => "generateStarted",
            ProcessMessage::GenerateFinished => "generateFinished",
            ProcessMessage::GetModel => "getModel",
            ProcessMessage::SetModel { .. } => "setModel",
            ProcessMessage::Log { .. } => "log",
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        ProcessMessage::Log {
            level,
            message: message.into(),
        }
    }
}

/// Severity of a forwarded log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
        }
    }
}
