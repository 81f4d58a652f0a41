//! Per-call options for generation and model acquisition.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::transform::ModelTransform;
use crate::writer::RegionMarkerFormatter;

/// How an existing output file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Truncate and rewrite.
    #[default]
    Overwrite,
    /// Write only when the file does not exist yet.
    Once,
    /// Append to the end.
    Append,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Overwrite => write!(f, "overwrite"),
            OutputMode::Once => write!(f, "once"),
            OutputMode::Append => write!(f, "append"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(OutputMode::Overwrite),
            "once" => Ok(OutputMode::Once),
            "append" => Ok(OutputMode::Append),
            other => Err(format!(
                "Unsupported output mode: '{}'. Supported modes: append, once, overwrite",
                other
            )),
        }
    }
}

/// Options for one `generate*` call.
#[derive(Clone)]
pub struct GenerationOptions {
    /// Output path, relative to the worker's working directory.
    pub output_file: PathBuf,

    /// Overrides the session's default output mode.
    pub output_mode: Option<OutputMode>,

    /// Region markers for this output; defaults to `/// <name>`.
    pub region_marker_formatter: Option<Arc<dyn RegionMarkerFormatter>>,
}

impl GenerationOptions {
    pub fn new(output_file: impl Into<PathBuf>) -> Self {
        Self {
            output_file: output_file.into(),
            output_mode: None,
            region_marker_formatter: None,
        }
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = Some(mode);
        self
    }

    pub fn with_region_marker_formatter(
        mut self,
        formatter: impl RegionMarkerFormatter + 'static,
    ) -> Self {
        self.region_marker_formatter = Some(Arc::new(formatter));
        self
    }
}

impl fmt::Debug for GenerationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationOptions")
            .field("output_file", &self.output_file)
            .field("output_mode", &self.output_mode)
            .field(
                "region_marker_formatter",
                &self.region_marker_formatter.as_ref().map(|_| "custom"),
            )
            .finish()
    }
}

/// Options for one model acquisition.
#[derive(Clone, Default)]
pub struct ModelAcquisitionOptions {
    /// Applied to the resolved model when it is not null.
    pub model_transform: Option<Arc<dyn ModelTransform>>,

    /// Pass host data through as raw JSON, skipping the model reader.
    pub no_parse: bool,
}

impl ModelAcquisitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(self, transform: impl ModelTransform + 'static) -> Self {
        self.with_transform_arc(Arc::new(transform))
    }

    pub fn with_transform_arc(mut self, transform: Arc<dyn ModelTransform>) -> Self {
        self.model_transform = Some(transform);
        self
    }

    pub fn no_parse(mut self) -> Self {
        self.no_parse = true;
        self
    }
}

impl fmt::Debug for ModelAcquisitionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelAcquisitionOptions")
            .field("model_transform", &self.model_transform.is_some())
            .field("no_parse", &self.no_parse)
            .finish()
    }
}
