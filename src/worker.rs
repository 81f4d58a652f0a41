//! Worker process bootstrap.
//!
//! A worker binary is a template: its `main` starts a session and calls
//! `generate*` on it.
//!
//! ```rust,no_run
//! use regen::{GenerationOptions, TextWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), regen::GenError> {
//!     let generator = regen::worker::start().await?;
//!     generator
//!         .generate(GenerationOptions::new("out/hello.txt"), |w| {
//!             w.write_line("hello");
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::protocol::StdioChannel;
use crate::session::{Generator, StartupArgs};

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "REGEN_LOG";

/// Install a tracing subscriber writing to stderr.
///
/// Stdout carries the host protocol, so diagnostics must stay off it. The
/// filter comes from `REGEN_LOG` and defaults to `info`. Calling this more
/// than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Boot a worker: load `.env`, set up tracing, parse the process
/// arguments and announce the session on stdio.
pub async fn start() -> Result<Generator<StdioChannel>> {
    dotenv::dotenv().ok();
    init_tracing();

    Generator::builder(StdioChannel::stdio())
        .args(StartupArgs::from_env())
        .start()
        .await
}
