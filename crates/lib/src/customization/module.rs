//! Customizations targeting modules and files.

use forge_core::{ModelInfo, Value};

use crate::builder::ModelBuilder;
use crate::error::BuildError;

use super::Customization;

/// Declare a namespace/module partial.
pub struct AddModule {
  name: String,
  path: Option<String>,
  exists_ok: bool,
}

impl AddModule {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      path: None,
      exists_ok: false,
    }
  }

  pub fn with_path(mut self, path: &str) -> Self {
    self.path = Some(path.to_string());
    self
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddModule {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddModule({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    let module = builder.add_module(&self.name, self.exists_ok)?;
    if let Some(path) = &self.path {
      module.set_path(path)?;
    }
    Ok(())
  }
}

/// Set a named sub-value on an existing module. Re-assigning an attribute
/// requires `exists_ok`.
pub struct AddToModule {
  module: String,
  attr: String,
  value: Value,
  exists_ok: bool,
}

impl AddToModule {
  pub fn new(module: &str, attr: &str, value: Value) -> Self {
    Self {
      module: module.to_string(),
      attr: attr.to_string(),
      value,
      exists_ok: false,
    }
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddToModule {
  fn name(&self) -> &str {
    &self.module
  }

  fn describe(&self) -> String {
    format!("AddToModule({}.{})", self.module, self.attr)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder
      .get_module(&self.module)?
      .set_attr(&self.attr, self.value.clone(), self.exists_ok)
  }
}

/// Add a raw-content file to an existing module. Optionally registers a
/// constant holding the `(module, path)` location of the file.
pub struct AddFileToModule {
  module: String,
  path: String,
  content: String,
  namespace_constant: Option<String>,
}

impl AddFileToModule {
  pub fn new(module: &str, path: &str, content: &str) -> Self {
    Self {
      module: module.to_string(),
      path: path.to_string(),
      content: content.to_string(),
      namespace_constant: None,
    }
  }

  pub fn with_namespace_constant(mut self, name: &str) -> Self {
    self.namespace_constant = Some(name.to_string());
    self
  }
}

impl Customization for AddFileToModule {
  fn name(&self) -> &str {
    &self.module
  }

  fn describe(&self) -> String {
    format!("AddFileToModule({}/{})", self.module, self.path)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder
      .get_module(&self.module)?
      .add_file(&self.path, &self.content)?;
    if let Some(constant) = &self.namespace_constant {
      builder.add_constant(
        constant,
        Value::List(vec![
          Value::from(self.module.as_str()),
          Value::from(self.path.as_str()),
        ]),
        false,
      )?;
    }
    Ok(())
  }
}

/// Add a JSON file to an existing module, serializing the payload.
pub struct AddJsonFile {
  module: String,
  path: String,
  payload: serde_json::Value,
}

impl AddJsonFile {
  pub fn new(module: &str, path: &str, payload: serde_json::Value) -> Self {
    Self {
      module: module.to_string(),
      path: path.to_string(),
      payload,
    }
  }
}

impl Customization for AddJsonFile {
  fn name(&self) -> &str {
    &self.module
  }

  fn describe(&self) -> String {
    format!("AddJsonFile({}/{})", self.module, self.path)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    let content = serde_json::to_string(&self.payload)?;
    builder
      .get_module(&self.module)?
      .add_file(&self.path, &content)
  }
}

/// Deep-merge a JSON payload into a module file. A missing file starts from
/// an empty object; maps merge recursively, arrays concatenate, everything
/// else is replaced by the patch.
pub struct PatchJsonFile {
  module: String,
  path: String,
  payload: serde_json::Value,
}

impl PatchJsonFile {
  pub fn new(module: &str, path: &str, payload: serde_json::Value) -> Self {
    Self {
      module: module.to_string(),
      path: path.to_string(),
      payload,
    }
  }
}

impl Customization for PatchJsonFile {
  fn name(&self) -> &str {
    &self.module
  }

  fn describe(&self) -> String {
    format!("PatchJsonFile({}/{})", self.module, self.path)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    let module = builder.get_module(&self.module)?;
    let previous = match module.file(&self.path) {
      Some(content) => serde_json::from_str(content)?,
      None => serde_json::json!({}),
    };
    let merged = deep_merge(previous, self.payload.clone());
    let content = serde_json::to_string_pretty(&merged)?;
    module.add_file(&self.path, &content)
  }
}

/// Register a standalone file partial under a symbolic name.
pub struct AddFile {
  name: String,
  module: String,
  path: String,
  content: String,
  exists_ok: bool,
}

impl AddFile {
  pub fn new(name: &str, module: &str, path: &str, content: &str) -> Self {
    Self {
      name: name.to_string(),
      module: module.to_string(),
      path: path.to_string(),
      content: content.to_string(),
      exists_ok: false,
    }
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddFile {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddFile({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.add_file(
      &self.name,
      &self.module,
      &self.path,
      &self.content,
      self.exists_ok,
    )?;
    Ok(())
  }
}

fn deep_merge(base: serde_json::Value, patch: serde_json::Value) -> serde_json::Value {
  match (base, patch) {
    (serde_json::Value::Object(mut base), serde_json::Value::Object(patch)) => {
      for (key, patch_value) in patch {
        match base.remove(&key) {
          Some(base_value) => {
            base.insert(key, deep_merge(base_value, patch_value));
          }
          None => {
            base.insert(key, patch_value);
          }
        }
      }
      serde_json::Value::Object(base)
    }
    (serde_json::Value::Array(mut base), serde_json::Value::Array(patch)) => {
      base.extend(patch);
      serde_json::Value::Array(base)
    }
    (_, patch) => patch,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn setup() -> (ModelBuilder, ModelInfo) {
    let model = ModelInfo::new("demo");
    (ModelBuilder::new(model.clone()), model)
  }

  #[test]
  fn module_attrs_are_write_once() {
    let (mut builder, model) = setup();
    AddModule::new("config").apply(&mut builder, &model).unwrap();
    AddToModule::new("config", "debug", Value::from(false))
      .apply(&mut builder, &model)
      .unwrap();
    let err = AddToModule::new("config", "debug", Value::from(true))
      .apply(&mut builder, &model)
      .unwrap_err();
    assert!(matches!(err, BuildError::AttributeExists { .. }));
  }

  #[test]
  fn file_with_namespace_constant() {
    let (mut builder, model) = setup();
    AddModule::new("schemas").apply(&mut builder, &model).unwrap();
    AddFileToModule::new("schemas", "record-v1.json", "{}")
      .with_namespace_constant("record_schema_location")
      .apply(&mut builder, &model)
      .unwrap();

    let location = builder.build_partial("record_schema_location").unwrap();
    assert_eq!(
      location,
      Value::List(vec![Value::from("schemas"), Value::from("record-v1.json")])
    );
  }

  #[test]
  fn patch_json_merges_into_existing_file() {
    let (mut builder, model) = setup();
    AddModule::new("schemas").apply(&mut builder, &model).unwrap();
    AddJsonFile::new(
      "schemas",
      "record-v1.json",
      json!({"properties": {"title": {"type": "string"}}, "required": ["title"]}),
    )
    .apply(&mut builder, &model)
    .unwrap();
    PatchJsonFile::new(
      "schemas",
      "record-v1.json",
      json!({"properties": {"year": {"type": "integer"}}, "required": ["year"]}),
    )
    .apply(&mut builder, &model)
    .unwrap();

    let content = builder
      .get_module("schemas")
      .unwrap()
      .file("record-v1.json")
      .unwrap()
      .to_string();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed["properties"]["title"]["type"], "string");
    assert_eq!(parsed["properties"]["year"]["type"], "integer");
    assert_eq!(parsed["required"], json!(["title", "year"]));
  }

  #[test]
  fn standalone_file_lands_in_the_namespace() {
    let (mut builder, model) = setup();
    AddFile::new("mapping", "search", "os-v2/record-v1.json", "{}")
      .apply(&mut builder, &model)
      .unwrap();

    let ns = builder.finalize().unwrap();
    assert_eq!(
      ns.files().get("search/os-v2/record-v1.json"),
      Some(&"{}".to_string())
    );
  }

  #[test]
  fn patch_json_starts_from_empty_object() {
    let (mut builder, model) = setup();
    AddModule::new("schemas").apply(&mut builder, &model).unwrap();
    PatchJsonFile::new("schemas", "new.json", json!({"a": 1}))
      .apply(&mut builder, &model)
      .unwrap();
    let content = builder
      .get_module("schemas")
      .unwrap()
      .file("new.json")
      .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(content).unwrap();
    assert_eq!(parsed, json!({"a": 1}));
  }
}
