//! Error types for generation sessions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::transform::TransformError;

/// Errors raised by the session controller, the message channel and the
/// model acquisition path.
#[derive(Error, Debug)]
pub enum GenError {
    /// The host answered `getModel` with no model data.
    #[error("host returned empty model")]
    EmptyModel,

    /// The message channel closed before the expected response arrived.
    #[error("host disconnected before answering '{0}'")]
    HostDisconnected(&'static str),

    /// A model build started with `build_model` failed; carries the
    /// builder's rendered error.
    #[error("model build failed: {0}")]
    ModelBuild(String),

    /// `--templateArgs` was present but not valid JSON.
    #[error("invalid --templateArgs payload: {0}")]
    TemplateArgs(#[source] serde_json::Error),

    /// Filesystem failure on an output or referenced file.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the message channel failed.
    #[error("message channel failure: {0}")]
    Channel(#[source] io::Error),

    /// A message envelope could not be encoded or decoded.
    #[error("message codec failure: {0}")]
    Codec(#[source] serde_json::Error),

    /// The model reader accepted the data but could not extract a model.
    #[error("model document could not be read: {0}")]
    Reader(String),

    /// A model transform rejected the model.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl GenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_model_message_is_descriptive() {
        assert_eq!(GenError::EmptyModel.to_string(), "host returned empty model");
    }

    #[test]
    fn test_io_error_names_the_path() {
        let err = GenError::io(
            "out/file.rs",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error on 'out/file.rs': denied");
    }

    #[test]
    fn test_transform_errors_pass_through() {
        let err: GenError = TransformError::InvalidModel("not an object".to_string()).into();
        assert_eq!(err.to_string(), "Invalid model: not an object");
    }
}
