//! regen-sample - example template worker
//!
//! Turns a model of classes into Rust structs. Hand-written additions live
//! in regions of `src/model_ext.rs` and are carried into the output.
//!
//! Template arguments (all optional):
//!
//! ```json
//! {"output": "src/generated/model.rs", "rename": "pascal", "header": "HEADER.txt"}
//! ```

use std::process::ExitCode;

use serde::Deserialize;
use serde_json::Value;

use regen::transform::{Case, CaseRename, RenamingTransform, TypeRef};
use regen::{
    GenerateOutcome, GenerationOptions, ModelAcquisitionOptions, StreamWriter, TextWriter,
    TransformRegistry,
};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SampleArgs {
    output: String,
    rename: Option<String>,
    header: Option<String>,
    extensions: String,
}

impl Default for SampleArgs {
    fn default() -> Self {
        Self {
            output: "src/generated/model.rs".to_string(),
            rename: Some("pascal".to_string()),
            header: None,
            extensions: "src/model_ext.rs".to_string(),
        }
    }
}

fn transforms() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry.register(
        "pascal",
        RenamingTransform::new(CaseRename::new(Case::Pascal).only_kinds(["class", "enum"])),
    );
    registry.register(
        "snake",
        RenamingTransform::new(CaseRename::new(Case::Snake).only_kinds(["attribute"])),
    );
    registry
}

fn render_model(w: &mut StreamWriter, model: &Value, args: &SampleArgs) {
    w.with_frozen_sloc(|w| {
        match &args.header {
            Some(header) => {
                w.write_file(header);
            }
            None => {
                w.write_line("// @generated by regen-sample. Do not edit outside regions.");
            }
        }
        w.new_line();
    });

    let elements = model
        .get("elements")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for element in elements {
        let Some(name) = TypeRef::Type(element).type_name() else {
            continue;
        };

        w.write_line("#[derive(Debug, Clone)]");
        w.write_line(format!("pub struct {} {{", name)).increase_indent();

        let attributes = element
            .get("attributes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for attribute in attributes {
            let field = attribute.get("name").and_then(Value::as_str).unwrap_or("_");
            let ty = TypeRef::of(attribute).type_name().unwrap_or("()");
            w.write_line(format!("pub {}: {},", field, ty));
        }

        w.decrease_indent().write_line("}").new_line();

        w.write_line(format!("impl {} {{", name)).increase_indent();
        if !w.write_file_region(&format!("{}-impl", name), &args.extensions) {
            w.with_frozen_sloc(|w| {
                w.write_line(format!("// /// <{}-impl> in {}", name, args.extensions));
            });
        }
        w.decrease_indent().write_line("}").new_line();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let generator = match regen::worker::start().await {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = match generator.template_args_as::<SampleArgs>() {
        Ok(args) => args.unwrap_or_default(),
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut model_options = ModelAcquisitionOptions::new();
    if let Some(name) = &args.rename {
        match transforms().get(name) {
            Ok(transform) => model_options = model_options.with_transform_arc(transform),
            Err(e) => tracing::warn!("{}; using the model as received", e),
        }
    }

    let outcome = generator
        .generate_from_model(
            GenerationOptions::new(&args.output),
            model_options,
            |w, model| render_model(w, &model, &args),
        )
        .await;

    match outcome {
        Ok(GenerateOutcome::ModelUnavailable { .. }) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
