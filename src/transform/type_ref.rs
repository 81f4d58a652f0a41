//! Type-name lookup over model elements.

use serde_json::Value;

/// Something a template wants the type name of.
///
/// A `Type` is a type element itself (`{"name": "Order", ...}`). A
/// `TypedElement` is an attribute, parameter or similar that refers to a
/// type through its `type` member, either by name (`"type": "Order"`) or
/// inline (`"type": {"name": "Order"}`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeRef<'a> {
    Type(&'a Value),
    TypedElement(&'a Value),
}

impl<'a> TypeRef<'a> {
    /// Classify `element`: anything with a `type` member is a typed element.
    pub fn of(element: &'a Value) -> Self {
        if element.get("type").is_some() {
            TypeRef::TypedElement(element)
        } else {
            TypeRef::Type(element)
        }
    }

    /// Name of the referenced type, if the element carries one.
    pub fn type_name(&self) -> Option<&'a str> {
        match *self {
            TypeRef::Type(ty) => ty.get("name").and_then(Value::as_str),
            TypeRef::TypedElement(element) => match element.get("type")? {
                Value::String(name) => Some(name.as_str()),
                inline @ Value::Object(_) => inline.get("name").and_then(Value::as_str),
                _ => None,
            },
        }
    }

    /// Type name qualified with the owning `package` member, when present.
    pub fn qualified_name(&self, separator: &str) -> Option<String> {
        let name = self.type_name()?;
        let owner = match *self {
            TypeRef::Type(ty) => ty,
            TypeRef::TypedElement(element) => match element.get("type") {
                Some(inline @ Value::Object(_)) => inline,
                _ => return Some(name.to_string()),
            },
        };

        match owner.get("package").and_then(Value::as_str) {
            Some(package) if !package.is_empty() => {
                Some(format!("{}{}{}", package, separator, name))
            }
            _ => Some(name.to_string()),
        }
    }
}
