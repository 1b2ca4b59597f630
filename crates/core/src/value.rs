//! The uniform artifact value.
//!
//! Every artifact held by the builder or exposed through the namespace is a
//! `Value`. Scalars and JSON payloads cover opaque domain content; the
//! `Fragment`, `Composite`, `Module` and `File` variants carry the structured
//! artifacts the engine itself understands; `Deferred` is a late-bound
//! reference resolved when the owning partial builds.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::composite::Composite;
use crate::fragment::FragmentRef;
use crate::model::Binding;

#[derive(Debug, Clone)]
pub enum Value {
    /// Explicitly absent entry; filtered out of built maps.
    Absent,
    Bool(bool),
    Number(f64),
    String(String),
    /// Opaque structured payload.
    Json(serde_json::Value),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Fragment(FragmentRef),
    Composite(Arc<Composite>),
    Module(Arc<Module>),
    File(Arc<FileContent>),
    /// Late-bound reference to other artifacts, resolved at build time.
    Deferred(Binding),
}

impl Value {
    /// Short shape label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Json(_) => "json",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Fragment(_) => "fragment",
            Value::Composite(_) => "composite",
            Value::Module(_) => "module",
            Value::File(_) => "file",
            Value::Deferred(_) => "deferred",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&FragmentRef> {
        match self {
            Value::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Arc<Composite>> {
        match self {
            Value::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Arc<Module>> {
        match self {
            Value::Module(module) => Some(module),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Fragments are identified by name.
            (Value::Fragment(a), Value::Fragment(b)) => a.name() == b.name(),
            (Value::Composite(a), Value::Composite(b)) => Arc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::File(a), Value::File(b)) => a == b,
            // Deferred values have no usable equality before resolution.
            (Value::Deferred(_), Value::Deferred(_)) => false,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl From<FragmentRef> for Value {
    fn from(value: FragmentRef) -> Self {
        Value::Fragment(value)
    }
}

/// A built module: named sub-values plus the files registered on it.
///
/// Produced by the module partial once every deferred attribute has been
/// resolved; immutable from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    name: String,
    path: Option<String>,
    attrs: BTreeMap<String, Value>,
    files: BTreeMap<String, String>,
}

impl Module {
    pub fn new(
        name: String,
        path: Option<String>,
        attrs: BTreeMap<String, Value>,
        files: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name,
            path,
            attrs,
            files,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }
}

/// A raw-content file artifact attached to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub module: String,
    pub path: String,
    pub content: String,
}
