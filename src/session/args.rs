//! Worker startup arguments.
//!
//! The host may pass `--templateArgs <json>` and `--outputMode <mode>` on the
//! worker's command line, in either `--flag value` or `--flag=value` form.
//! Anything else on the command line belongs to the template and is ignored
//! here.

use clap::Parser;
use serde_json::Value;

use crate::session::OutputMode;

const TEMPLATE_ARGS_FLAG: &str = "--templateArgs";
const OUTPUT_MODE_FLAG: &str = "--outputMode";

/// Flags recognized at worker startup.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(
    name = "regen-worker",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
pub struct StartupArgs {
    /// JSON payload made visible to templates
    #[arg(long = "templateArgs", allow_hyphen_values = true)]
    pub template_args: Option<String>,

    /// Default output mode: append, once or overwrite
    #[arg(long = "outputMode", allow_hyphen_values = true)]
    pub output_mode: Option<String>,
}

impl StartupArgs {
    /// Parse the current process's arguments.
    pub fn from_env() -> Self {
        Self::from_args(std::env::args())
    }

    /// Parse an argument list whose first item is the program name.
    ///
    /// Only the two recognized flags are handed to the parser; unrelated
    /// arguments and a trailing flag without a value are dropped.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| "regen-worker".to_string());

        let mut recognized = vec![program];
        while let Some(arg) = args.next() {
            if let Some((flag, value)) = arg.split_once('=') {
                if is_recognized(flag) {
                    recognized.push(flag.to_string());
                    recognized.push(value.to_string());
                    continue;
                }
            }

            if is_recognized(&arg) {
                match args.next() {
                    Some(value) => {
                        recognized.push(arg);
                        recognized.push(value);
                    }
                    None => tracing::warn!("Ignoring {} without a value", arg),
                }
            } else {
                tracing::trace!("Ignoring unrelated argument {:?}", arg);
            }
        }

        match Self::try_parse_from(recognized) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Ignoring unparseable startup arguments: {}", e);
                Self::default()
            }
        }
    }

    /// The `--templateArgs` payload as JSON. Absent, empty and `null`
    /// payloads all yield `None`.
    pub fn template_args_value(&self) -> Result<Option<Value>, serde_json::Error> {
        match self.template_args.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)?;
                Ok((!value.is_null()).then_some(value))
            }
        }
    }

    /// The `--outputMode` value, if present and recognized. Unrecognized
    /// values are dropped with a warning.
    pub fn output_mode(&self) -> Option<OutputMode> {
        let raw = self.output_mode.as_deref()?;
        match raw.parse::<OutputMode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                tracing::warn!("{}; keeping the default output mode", e);
                None
            }
        }
    }
}

fn is_recognized(flag: &str) -> bool {
    flag == TEMPLATE_ARGS_FLAG || flag == OUTPUT_MODE_FLAG
}
