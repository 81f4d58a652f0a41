//! Model transforms applied between model acquisition and the template.
//!
//! A transform is a single-method capability mapping one model to another.
//! Behaviors that would otherwise be subclasses, such as renaming elements,
//! are strategies plugged into a generic element walk (see [`rename`]).

pub mod rename;
pub mod type_ref;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use convert_case::Case;
pub use rename::{walk_elements, CaseRename, RegexRename, RenameStrategy, RenamingTransform};
pub use type_ref::TypeRef;

/// Error type for transform operations
#[derive(Debug, Clone)]
pub enum TransformError {
    NotFound(String),
    InvalidModel(String),
    ExecutionError(String),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::NotFound(name) => write!(f, "Transform not found: {}", name),
            TransformError::InvalidModel(msg) => write!(f, "Invalid model: {}", msg),
            TransformError::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
        }
    }
}

impl std::error::Error for TransformError {}

/// Maps a source model to a target model.
pub trait ModelTransform: Send + Sync {
    fn transform(&self, source: Value) -> Result<Value, TransformError>;
}

/// Simple function-based implementation of ModelTransform
impl<F> ModelTransform for F
where
    F: Fn(Value) -> Result<Value, TransformError> + Send + Sync,
{
    fn transform(&self, source: Value) -> Result<Value, TransformError> {
        self(source)
    }
}

/// Applies transforms in order, feeding each one the previous result.
#[derive(Clone, Default)]
pub struct TransformChain {
    steps: Vec<Arc<dyn ModelTransform>>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, step: impl ModelTransform + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl ModelTransform for TransformChain {
    fn transform(&self, source: Value) -> Result<Value, TransformError> {
        self.steps
            .iter()
            .try_fold(source, |model, step| step.transform(model))
    }
}

/// Named transforms, so a template can pick one from its arguments.
#[derive(Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn ModelTransform>>,
}

impl TransformRegistry {
    /// Create a new empty transform registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, transform: impl ModelTransform + 'static) {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Shared handle to a registered transform, ready for
    /// `ModelAcquisitionOptions::with_transform_arc`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ModelTransform>, TransformError> {
        self.transforms
            .get(name)
            .cloned()
            .ok_or_else(|| TransformError::NotFound(name.to_string()))
    }

    /// Run a registered transform directly.
    pub fn call(&self, name: &str, model: Value) -> Result<Value, TransformError> {
        self.get(name)?.transform(model)
    }

    /// Check if a transform is registered
    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_transforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.transforms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(source: Value) -> Result<Value, TransformError> {
        Ok(json!({ "wrapped": source }))
    }

    #[test]
    fn test_closure_is_a_transform() {
        let upper = |model: Value| -> Result<Value, TransformError> {
            let name = model
                .as_str()
                .ok_or_else(|| TransformError::InvalidModel("expected a string".to_string()))?;
            Ok(Value::String(name.to_uppercase()))
        };

        assert_eq!(upper.transform(json!("shop")).unwrap(), json!("SHOP"));
        assert!(upper.transform(json!(1)).is_err());
    }

    #[test]
    fn test_chain_runs_in_order() {
        let chain = TransformChain::new()
            .then(wrap)
            .then(|m: Value| -> Result<Value, TransformError> { Ok(json!([m])) });

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.transform(json!(1)).unwrap(), json!([{"wrapped": 1}]));
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = TransformChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.transform(json!({"a": 1})).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TransformRegistry::new();
        registry.register("wrap", wrap);

        assert!(registry.has_transform("wrap"));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.list_transforms(), vec!["wrap".to_string()]);
        assert_eq!(registry.call("wrap", json!(2)).unwrap(), json!({"wrapped": 2}));
    }

    #[test]
    fn test_registry_missing_transform() {
        let registry = TransformRegistry::new();
        let err = registry.call("nonexistent", json!(null)).unwrap_err();
        assert_eq!(err.to_string(), "Transform not found: nonexistent");
    }
}
