//! Generation sessions.
//!
//! A [`Generator`] is the single coordinator of a worker process. It owns
//! the startup configuration, talks to the host over a
//! [`MessageChannel`], resolves models and hands each `generate*` call a
//! fresh [`StreamWriter`].
//!
//! ## Message order
//!
//! ```text
//! start                      processStarted
//! generate*                  generateStarted ... generateFinished
//! generate_from_model*       getModel, <setModel>, generateStarted ... generateFinished
//! build_model                generateStarted ... generateFinished
//! ```
//!
//! The host keeps the worker alive while a `generateStarted` is open, so
//! every started unit of work is closed, including the failure paths.

pub mod args;
pub mod model;
pub mod options;

use std::fmt;
use std::future::{self, Future};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{GenError, Result};
use crate::fs_utils;
use crate::protocol::{LogLevel, MessageChannel, ProcessMessage};
use crate::writer::{DefaultRegionMarkerFormatter, StreamWriter};

pub use args::StartupArgs;
pub use model::{DocumentReader, ModelDocument, ModelReader};
pub use options::{GenerationOptions, ModelAcquisitionOptions, OutputMode};

use model::{lock_state, wait_for_build, BuildGuard, ModelState};

/// What a `generate*` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The template ran and its output was written to `path`.
    Written {
        path: PathBuf,
        line_count: usize,
        significant_line_count: usize,
    },
    /// Output mode was `Once` and `path` already existed; the template did
    /// not run.
    Skipped { path: PathBuf },
    /// The model could not be resolved; nothing was written.
    ModelUnavailable { reason: String },
}

impl GenerateOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, GenerateOutcome::Written { .. })
    }
}

/// Configures and starts a [`Generator`].
pub struct GeneratorBuilder<C> {
    channel: C,
    args: StartupArgs,
    working_dir: Option<PathBuf>,
    reader: Box<dyn ModelReader>,
}

impl<C: MessageChannel> GeneratorBuilder<C> {
    /// Startup arguments; defaults to none.
    pub fn args(mut self, args: StartupArgs) -> Self {
        self.args = args;
        self
    }

    /// Directory output paths resolve against; defaults to the process's
    /// current directory at start.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Reader deciding how host model documents are parsed.
    pub fn model_reader(mut self, reader: impl ModelReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Apply the configuration and announce the worker to the host.
    pub async fn start(self) -> Result<Generator<C>> {
        let template_args = self
            .args
            .template_args_value()
            .map_err(GenError::TemplateArgs)?;
        let default_output_mode = self.args.output_mode().unwrap_or_default();

        let working_dir = match self.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|e| GenError::io(".", e))?,
        };

        let generator = Generator {
            channel: self.channel,
            working_dir,
            template_args,
            default_output_mode,
            reader: self.reader,
            model: Mutex::new(ModelState::Absent),
        };

        generator.channel.send(&ProcessMessage::ProcessStarted).await?;
        tracing::debug!(
            "Worker started in {} (default output mode: {})",
            generator.working_dir.display(),
            generator.default_output_mode
        );

        Ok(generator)
    }
}

/// Session controller for one worker process.
pub struct Generator<C> {
    channel: C,
    working_dir: PathBuf,
    template_args: Option<Value>,
    default_output_mode: OutputMode,
    reader: Box<dyn ModelReader>,
    model: Mutex<ModelState>,
}

impl<C: MessageChannel> Generator<C> {
    pub fn builder(channel: C) -> GeneratorBuilder<C> {
        GeneratorBuilder {
            channel,
            args: StartupArgs::default(),
            working_dir: None,
            reader: Box::new(DocumentReader),
        }
    }

    /// The `--templateArgs` payload, if any.
    pub fn template_args(&self) -> Option<&Value> {
        self.template_args.as_ref()
    }

    /// The `--templateArgs` payload deserialized into `T`.
    pub fn template_args_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.template_args
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(GenError::TemplateArgs)
    }

    pub fn default_output_mode(&self) -> OutputMode {
        self.default_output_mode
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run a synchronous template.
    pub async fn generate<F>(
        &self,
        options: GenerationOptions,
        template: F,
    ) -> Result<GenerateOutcome>
    where
        F: FnOnce(&mut StreamWriter),
    {
        self.generate_internal(options, move |mut writer| {
            template(&mut writer);
            future::ready(writer)
        })
        .await
    }

    /// Run an asynchronous template. The output is closed once the
    /// template's future hands the writer back.
    pub async fn generate_async<F, Fut>(
        &self,
        options: GenerationOptions,
        template: F,
    ) -> Result<GenerateOutcome>
    where
        F: FnOnce(StreamWriter) -> Fut,
        Fut: Future<Output = StreamWriter>,
    {
        self.generate_internal(options, template).await
    }

    /// Resolve the model, then run a synchronous template with it.
    ///
    /// A model that cannot be resolved is logged and reported as
    /// [`GenerateOutcome::ModelUnavailable`]; no file is written.
    pub async fn generate_from_model<F>(
        &self,
        options: GenerationOptions,
        model_options: ModelAcquisitionOptions,
        template: F,
    ) -> Result<GenerateOutcome>
    where
        F: FnOnce(&mut StreamWriter, Value),
    {
        let model = match self.get_model(&model_options).await {
            Ok(model) => model,
            Err(e) => return self.model_unavailable(&options, e).await,
        };

        self.generate(options, move |writer| template(writer, model))
            .await
    }

    /// Resolve the model, then run an asynchronous template with it.
    pub async fn generate_from_model_async<F, Fut>(
        &self,
        options: GenerationOptions,
        model_options: ModelAcquisitionOptions,
        template: F,
    ) -> Result<GenerateOutcome>
    where
        F: FnOnce(StreamWriter, Value) -> Fut,
        Fut: Future<Output = StreamWriter>,
    {
        let model = match self.get_model(&model_options).await {
            Ok(model) => model,
            Err(e) => return self.model_unavailable(&options, e).await,
        };

        self.generate_internal(options, move |writer| template(writer, model))
            .await
    }

    /// Resolve the model for a template.
    ///
    /// A model built with [`Generator::build_model`] wins over the host;
    /// otherwise the host is asked with `getModel` and exactly one
    /// `setModel` answer is awaited.
    pub async fn get_model(&self, options: &ModelAcquisitionOptions) -> Result<Value> {
        let model = self.resolve_model(options.no_parse).await?;

        match &options.model_transform {
            Some(transform) if !model.is_null() => Ok(transform.transform(model)?),
            _ => Ok(model),
        }
    }

    /// Build the model in-process instead of receiving it from the host.
    ///
    /// The result is cached for every later [`Generator::get_model`] call.
    /// A failing builder's error is returned unchanged.
    ///
    /// Dropping the returned future before the builder finishes leaves the
    /// host without a `generateFinished`. The session forgets the build,
    /// so later lookups ask the host; callers already waiting on it fail
    /// with [`GenError::ModelBuild`].
    pub async fn build_model<F, Fut, E>(&self, builder: F) -> std::result::Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Value, E>>,
        E: From<GenError> + fmt::Display,
    {
        self.channel.send(&ProcessMessage::GenerateStarted).await?;

        let (tx, rx) = watch::channel(None);
        let guard = BuildGuard::start(&self.model, rx);

        let outcome = builder().await;

        let (state, shared) = match &outcome {
            Ok(model) => (ModelState::Ready(model.clone()), Ok(model.clone())),
            Err(e) => (ModelState::Failed(e.to_string()), Err(e.to_string())),
        };
        guard.settle(state);
        tx.send_replace(Some(shared));

        self.channel.send(&ProcessMessage::GenerateFinished).await?;
        outcome
    }

    /// Log locally and forward the message to the host.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
        }

        self.channel.send(&ProcessMessage::Log { level, message }).await
    }

    async fn generate_internal<F, Fut>(
        &self,
        options: GenerationOptions,
        callback: F,
    ) -> Result<GenerateOutcome>
    where
        F: FnOnce(StreamWriter) -> Fut,
        Fut: Future<Output = StreamWriter>,
    {
        let path = self.working_dir.join(&options.output_file);
        if let Some(parent) = path.parent() {
            fs_utils::ensure_directory(parent).map_err(|e| GenError::io(parent, e))?;
        }

        self.channel.send(&ProcessMessage::GenerateStarted).await?;

        let mode = options.output_mode.unwrap_or(self.default_output_mode);
        if mode == OutputMode::Once && path.exists() {
            tracing::debug!("Keeping existing {} (output mode once)", path.display());
            self.channel.send(&ProcessMessage::GenerateFinished).await?;
            return Ok(GenerateOutcome::Skipped { path });
        }

        let file = match fs_utils::open_output(&path, mode) {
            Ok(file) => file,
            Err(e) => return Err(self.abort_generation(GenError::io(&path, e)).await),
        };

        let formatter = options
            .region_marker_formatter
            .unwrap_or_else(|| Arc::new(DefaultRegionMarkerFormatter));
        let writer = StreamWriter::new(BufWriter::new(file), self.working_dir.clone())
            .with_formatter(formatter);

        let writer = callback(writer).await;
        let line_count = writer.line_count();
        let significant_line_count = writer.significant_line_count();

        if let Err(e) = writer.finish() {
            return Err(self.abort_generation(GenError::io(&path, e)).await);
        }

        tracing::info!(
            "Generated {} ({} lines, {} significant, mode {})",
            path.display(),
            line_count,
            significant_line_count,
            mode
        );
        self.channel.send(&ProcessMessage::GenerateFinished).await?;

        Ok(GenerateOutcome::Written {
            path,
            line_count,
            significant_line_count,
        })
    }

    /// Report a failed generation to the host and close its unit of work.
    async fn abort_generation(&self, err: GenError) -> GenError {
        let message = format!("Generation failed: {}", err);
        if let Err(send_err) = self.log(LogLevel::Error, message).await {
            tracing::warn!("Could not forward failure to host: {}", send_err);
        }
        if let Err(send_err) = self.channel.send(&ProcessMessage::GenerateFinished).await {
            tracing::warn!("Could not send generateFinished: {}", send_err);
        }
        err
    }

    async fn model_unavailable(
        &self,
        options: &GenerationOptions,
        err: GenError,
    ) -> Result<GenerateOutcome> {
        let reason = err.to_string();
        let message = format!(
            "Skipping {}: model unavailable: {}",
            options.output_file.display(),
            reason
        );
        if let Err(send_err) = self.log(LogLevel::Error, message).await {
            tracing::warn!("Could not forward failure to host: {}", send_err);
        }
        Ok(GenerateOutcome::ModelUnavailable { reason })
    }

    async fn resolve_model(&self, no_parse: bool) -> Result<Value> {
        let pending = match &*self.model_state() {
            ModelState::Ready(model) => return Ok(model.clone()),
            ModelState::Failed(message) => return Err(GenError::ModelBuild(message.clone())),
            ModelState::Building(rx) => Some(rx.clone()),
            ModelState::Absent => None,
        };

        match pending {
            Some(rx) => wait_for_build(rx).await,
            None => self.request_model(no_parse).await,
        }
    }

    async fn request_model(&self, no_parse: bool) -> Result<Value> {
        self.channel.send(&ProcessMessage::GetModel).await?;

        let model_data = loop {
            match self.channel.recv().await? {
                Some(ProcessMessage::SetModel { model_data }) => break model_data,
                Some(other) => {
                    tracing::debug!("Ignoring '{}' while waiting for setModel", other.cmd());
                }
                None => return Err(GenError::HostDisconnected("getModel")),
            }
        };

        let data = match model_data {
            Some(data) if !data.is_null() => data,
            _ => return Err(GenError::EmptyModel),
        };

        if !no_parse && self.reader.can_read(&data) {
            self.reader.read(data)
        } else {
            Ok(data)
        }
    }

    fn model_state(&self) -> MutexGuard<'_, ModelState> {
        lock_state(&self.model)
    }
}
