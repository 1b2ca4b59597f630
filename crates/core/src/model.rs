//! Model descriptor and late-bound references.
//!
//! `ModelInfo` carries the identity of the model under assembly: name,
//! version, description and a free-form configuration map. Derived name
//! forms (`base_name`, `slug`, `title_name`) can each be overridden through
//! the configuration.
//!
//! `Binding` is the deferred-value placeholder: a reference to one or more
//! named artifacts, optionally passed through a transform, resolved when the
//! owning partial builds. `RuntimeDependencies` is the late-bound side
//! channel handed out during assembly and bound exactly once at finalize.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::BindingError;
use crate::namespace::Namespace;
use crate::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub configuration: BTreeMap<String, serde_json::Value>,
}

impl ModelInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "0.1.0".to_string(),
            description: String::new(),
            configuration: BTreeMap::new(),
        }
    }

    pub fn config(&self, key: &str) -> Option<&serde_json::Value> {
        self.configuration.get(key)
    }

    fn config_string(&self, key: &str) -> Option<String> {
        self.config(key).and_then(|v| v.as_str()).map(str::to_string)
    }

    /// Lowercased identifier form of the model name.
    pub fn base_name(&self) -> String {
        self.config_string("base_name").unwrap_or_else(|| {
            self.name.to_lowercase().replace([' ', '-'], "_")
        })
    }

    /// Dash-separated form, used in URLs and export names.
    pub fn slug(&self) -> String {
        self.config_string("slug")
            .unwrap_or_else(|| self.base_name().replace('_', "-"))
    }

    /// Title-case form, used as the prefix of composite type names.
    pub fn title_name(&self) -> String {
        self.config_string("title_name")
            .unwrap_or_else(|| title_case(&self.base_name()))
    }
}

/// Title-case an identifier: split on separators and camel boundaries,
/// capitalize each word, join without separators.
pub fn title_case(s: &str) -> String {
    let mut out = String::new();
    let mut word_start = true;
    for ch in s.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            word_start = true;
        } else if ch.is_uppercase() {
            out.push(ch);
            word_start = false;
        } else if word_start {
            out.extend(ch.to_uppercase());
            word_start = false;
        } else {
            out.push(ch);
        }
    }
    out
}

pub type TransformFn = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// A deferred reference to named artifacts.
///
/// Resolution pulls each key's built value (per-key defaults cover missing
/// names), then either runs the transform over the values or yields the bare
/// value (single key) / a list (multiple keys).
#[derive(Clone)]
pub struct Binding {
    keys: Vec<String>,
    defaults: BTreeMap<String, Value>,
    transform: Option<TransformFn>,
}

impl Binding {
    pub fn new(key: &str) -> Self {
        Self {
            keys: vec![key.to_string()],
            defaults: BTreeMap::new(),
            transform: None,
        }
    }

    pub fn multi(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            defaults: BTreeMap::new(),
            transform: None,
        }
    }

    pub fn with_default(mut self, key: &str, value: Value) -> Self {
        self.defaults.insert(key.to_string(), value);
        self
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn default_for(&self, key: &str) -> Option<&Value> {
        self.defaults.get(key)
    }

    /// Combine the resolved per-key values into the bound value.
    pub fn finish(&self, mut values: Vec<Value>) -> Value {
        if let Some(transform) = &self.transform {
            return transform(values);
        }
        if values.len() == 1 {
            return values.remove(0);
        }
        Value::List(values)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("keys", &self.keys)
            .field("defaults", &self.defaults)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Late-bound dependencies of a finalized model.
///
/// Handed out by the builder during assembly; the finalized namespace is
/// bound into it exactly once when the builder finalizes. Artifacts that
/// capture a clone of this handle can resolve named values that only exist
/// after full assembly.
#[derive(Debug, Clone, Default)]
pub struct RuntimeDependencies {
    bound: Arc<OnceLock<Arc<Namespace>>>,
}

impl RuntimeDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the finalized namespace. The first bind wins; later calls are
    /// ignored.
    pub fn bind(&self, namespace: Arc<Namespace>) {
        let _ = self.bound.set(namespace);
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    pub fn get(&self, key: &str) -> Result<Value, BindingError> {
        let namespace = self.bound.get().ok_or(BindingError::Unbound)?;
        namespace
            .get(key)
            .cloned()
            .ok_or_else(|| BindingError::MissingDependency(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let model = ModelInfo::new("My Test-Model");
        assert_eq!(model.base_name(), "my_test_model");
        assert_eq!(model.slug(), "my-test-model");
        assert_eq!(model.title_name(), "MyTestModel");
    }

    #[test]
    fn test_configuration_overrides_derived_names() {
        let mut model = ModelInfo::new("records");
        model
            .configuration
            .insert("base_name".to_string(), serde_json::json!("recs"));
        model
            .configuration
            .insert("title_name".to_string(), serde_json::json!("Recs"));
        assert_eq!(model.base_name(), "recs");
        assert_eq!(model.slug(), "recs");
        assert_eq!(model.title_name(), "Recs");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("record_service"), "RecordService");
        assert_eq!(title_case("draft-files"), "DraftFiles");
        assert_eq!(title_case("jsonSchema"), "JsonSchema");
    }

    #[test]
    fn test_binding_single_key_yields_bare_value() {
        let binding = Binding::new("foo");
        assert_eq!(binding.finish(vec![Value::from("x")]), Value::from("x"));
    }

    #[test]
    fn test_binding_multi_key_yields_list() {
        let binding = Binding::multi(&["a", "b"]);
        let value = binding.finish(vec![Value::from(1), Value::from(2)]);
        assert_eq!(value, Value::List(vec![Value::from(1), Value::from(2)]));
    }

    #[test]
    fn test_binding_transform_runs_over_values() {
        let binding = Binding::multi(&["a", "b"]).with_transform(|values| {
            let joined = values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("/");
            Value::from(joined)
        });
        let value = binding.finish(vec![Value::from("x"), Value::from("y")]);
        assert_eq!(value, Value::from("x/y"));
    }

    #[test]
    fn test_runtime_dependencies_unbound() {
        let deps = RuntimeDependencies::new();
        assert!(!deps.is_bound());
        assert_eq!(deps.get("anything").unwrap_err(), BindingError::Unbound);
    }

    #[test]
    fn test_runtime_dependencies_bound_lookup() {
        let deps = RuntimeDependencies::new();
        let mut values = BTreeMap::new();
        values.insert("service".to_string(), Value::from("ready"));
        let namespace = Arc::new(Namespace::new(values, BTreeMap::new(), Vec::new()));
        deps.bind(namespace);

        assert!(deps.is_bound());
        assert_eq!(deps.get("service").unwrap(), Value::from("ready"));
        assert_eq!(
            deps.get("missing").unwrap_err(),
            BindingError::MissingDependency("missing".to_string())
        );
    }
}
