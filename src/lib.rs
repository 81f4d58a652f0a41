//! # Regen: Generation Worker Runtime
//!
//! Regen runs code-generation templates inside short-lived worker processes.
//! A host launches the worker, optionally feeds it a model over a JSON Lines
//! message channel, and the worker's template writes text files through an
//! indentation-aware writer.
//!
//! ## Features
//!
//! - **Session protocol**: `processStarted`, `getModel`/`setModel`,
//!   `generateStarted`/`generateFinished` keep-alive pairs, `log` forwarding
//! - **Output modes**: overwrite, append, or write once and keep hand edits
//! - **Text writer**: indentation, line terminators, significant-line counting
//! - **Regions**: pull named, marker-delimited spans of existing files back
//!   into generated output
//! - **Model transforms**: pluggable single-method transforms and renaming
//!   strategies
//!
//! ## Example: template worker
//!
//! ```rust,no_run
//! use regen::{GenerationOptions, ModelAcquisitionOptions, TextWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), regen::GenError> {
//!     let generator = regen::worker::start().await?;
//!
//!     generator
//!         .generate_from_model(
//!             GenerationOptions::new("src/generated/model.rs"),
//!             ModelAcquisitionOptions::new(),
//!             |w, model| {
//!                 w.write_line(format!("// model: {}", model["name"]));
//!                 w.write_file_region("custom", "src/model_ext.rs");
//!             },
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fs_utils;
pub mod protocol;
pub mod session;
pub mod transform;
pub mod worker;
pub mod writer;

// Re-export key types
pub use error::{GenError, Result};
pub use protocol::{
    HostEndpoint, JsonLinesChannel, LogLevel, MemoryChannel, MessageChannel, ProcessMessage,
    StdioChannel,
};
pub use session::{
    GenerateOutcome, GenerationOptions, Generator, GeneratorBuilder, ModelAcquisitionOptions,
    ModelReader, OutputMode, StartupArgs,
};
pub use transform::{ModelTransform, TransformError, TransformRegistry};
pub use writer::{
    DefaultRegionMarkerFormatter, Encoding, LineCommentRegionMarkerFormatter, RegionMarkerFormatter,
    StreamWriter, TextWriter,
};
