//! Element renaming as strategies over a generic model walk.

use convert_case::{Case, Casing};
use regex::Regex;
use serde_json::{Map, Value};

use crate::transform::{ModelTransform, TransformError};

/// Visit every element of `model` in pre-order.
///
/// An element is any JSON object carrying a string `name`. Containers
/// without a name are walked through but not visited.
pub fn walk_elements(model: &mut Value, visit: &mut dyn FnMut(&mut Map<String, Value>)) {
    match model {
        Value::Object(map) => {
            if matches!(map.get("name"), Some(Value::String(_))) {
                visit(map);
            }
            for child in map.values_mut() {
                walk_elements(child, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_elements(item, visit);
            }
        }
        _ => {}
    }
}

/// Decides the new name of one element.
///
/// Returning `None` leaves the element untouched.
pub trait RenameStrategy: Send + Sync {
    fn rename(&self, element: &Map<String, Value>, name: &str) -> Option<String>;
}

impl<F> RenameStrategy for F
where
    F: Fn(&Map<String, Value>, &str) -> Option<String> + Send + Sync,
{
    fn rename(&self, element: &Map<String, Value>, name: &str) -> Option<String> {
        self(element, name)
    }
}

/// Converts names to a case, optionally limited to some element kinds.
///
/// The kind of an element is its string `kind` member.
#[derive(Debug, Clone)]
pub struct CaseRename {
    case: Case,
    kinds: Vec<String>,
}

impl CaseRename {
    pub fn new(case: Case) -> Self {
        Self {
            case,
            kinds: Vec::new(),
        }
    }

    /// Only rename elements whose `kind` is one of `kinds`.
    pub fn only_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    fn applies_to(&self, element: &Map<String, Value>) -> bool {
        if self.kinds.is_empty() {
            return true;
        }
        element
            .get("kind")
            .and_then(Value::as_str)
            .is_some_and(|kind| self.kinds.iter().any(|k| k == kind))
    }
}

impl RenameStrategy for CaseRename {
    fn rename(&self, element: &Map<String, Value>, name: &str) -> Option<String> {
        if !self.applies_to(element) {
            return None;
        }
        let renamed = name.to_case(self.case);
        (renamed != name).then_some(renamed)
    }
}

/// Rewrites names matching a pattern.
#[derive(Debug, Clone)]
pub struct RegexRename {
    pattern: Regex,
    replacement: String,
}

impl RegexRename {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, TransformError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| TransformError::ExecutionError(format!("Invalid rename pattern: {}", e)))?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }
}

impl RenameStrategy for RegexRename {
    fn rename(&self, _element: &Map<String, Value>, name: &str) -> Option<String> {
        if !self.pattern.is_match(name) {
            return None;
        }
        Some(
            self.pattern
                .replace_all(name, self.replacement.as_str())
                .into_owned(),
        )
    }
}

/// Transform applying a rename strategy to every element of the model.
pub struct RenamingTransform<S> {
    strategy: S,
}

impl<S: RenameStrategy> RenamingTransform<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }
}

impl<S: RenameStrategy> ModelTransform for RenamingTransform<S> {
    fn transform(&self, mut source: Value) -> Result<Value, TransformError> {
        walk_elements(&mut source, &mut |element: &mut Map<String, Value>| {
            let renamed = match element.get("name") {
                Some(Value::String(name)) => self.strategy.rename(element, name),
                _ => None,
            };
            if let Some(renamed) = renamed {
                element.insert("name".to_string(), Value::String(renamed));
            }
        });
        Ok(source)
    }
}
