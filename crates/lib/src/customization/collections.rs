//! Customizations targeting sequences, maps and constants.

use std::collections::BTreeMap;

use forge_core::{ModelInfo, Value};

use crate::builder::ModelBuilder;
use crate::error::BuildError;

use super::Customization;

/// Declare an ordered-sequence partial, optionally seeded with items.
pub struct AddSequence {
  name: String,
  items: Vec<Value>,
  exists_ok: bool,
}

impl AddSequence {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      items: Vec::new(),
      exists_ok: false,
    }
  }

  pub fn with_items(mut self, items: Vec<Value>) -> Self {
    self.items = items;
    self
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddSequence {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddSequence({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.add_sequence(&self.name, self.items.clone(), self.exists_ok)?;
    Ok(())
  }
}

/// Append one value to a sequence, declaring the sequence if needed.
/// Appending a value already present is an error unless `exists_ok`.
pub struct AppendToSequence {
  name: String,
  value: Value,
  exists_ok: bool,
}

impl AppendToSequence {
  pub fn new(name: &str, value: Value) -> Self {
    Self {
      name: name.to_string(),
      value,
      exists_ok: false,
    }
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AppendToSequence {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AppendToSequence({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    let sequence = builder.add_sequence(&self.name, Vec::new(), true)?;
    if sequence.contains(&self.value) && !self.exists_ok {
      return Err(BuildError::DuplicateValue(self.name.clone()));
    }
    sequence.push(self.value.clone())
  }
}

/// Declare a key-unique mapping partial, optionally seeded with defaults.
pub struct AddMap {
  name: String,
  default: BTreeMap<String, Value>,
  exists_ok: bool,
}

impl AddMap {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      default: BTreeMap::new(),
      exists_ok: false,
    }
  }

  pub fn with_default(mut self, default: BTreeMap<String, Value>) -> Self {
    self.default = default;
    self
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddMap {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddMap({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.add_map(&self.name, self.default.clone(), self.exists_ok)?;
    Ok(())
  }
}

/// Merge patches and/or set one keyed entry in a mapping, declaring the
/// mapping if needed. Re-assigning an existing key requires `overwrite`.
pub struct AddToMap {
  name: String,
  patches: Vec<BTreeMap<String, Value>>,
  entry: Option<(String, Value)>,
  overwrite: bool,
}

impl AddToMap {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      patches: Vec::new(),
      entry: None,
      overwrite: false,
    }
  }

  pub fn with_patch(mut self, patch: BTreeMap<String, Value>) -> Self {
    self.patches.push(patch);
    self
  }

  pub fn with_entry(mut self, key: &str, value: Value) -> Self {
    self.entry = Some((key.to_string(), value));
    self
  }

  pub fn overwrite(mut self) -> Self {
    self.overwrite = true;
    self
  }
}

impl Customization for AddToMap {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddToMap({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    let map = builder.add_map(&self.name, BTreeMap::new(), true)?;
    for patch in &self.patches {
      map.merge(patch.clone())?;
    }
    if let Some((key, value)) = &self.entry {
      map.insert(key, value.clone(), self.overwrite)?;
    }
    Ok(())
  }
}

/// Declare a scalar/constant partial.
pub struct AddConstant {
  name: String,
  value: Value,
  exists_ok: bool,
}

impl AddConstant {
  pub fn new(name: &str, value: Value) -> Self {
    Self {
      name: name.to_string(),
      value,
      exists_ok: false,
    }
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddConstant {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddConstant({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.add_constant(&self.name, self.value.clone(), self.exists_ok)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn setup() -> (ModelBuilder, ModelInfo) {
    let model = ModelInfo::new("demo");
    (ModelBuilder::new(model.clone()), model)
  }

  #[test]
  fn add_sequence_seeds_items() {
    let (mut builder, model) = setup();
    AddSequence::new("serializers")
      .with_items(vec![Value::from("json"), Value::from("ui")])
      .apply(&mut builder, &model)
      .unwrap();
    let err = AddSequence::new("serializers")
      .apply(&mut builder, &model)
      .unwrap_err();
    assert!(matches!(err, BuildError::AlreadyRegistered { .. }));
    assert_eq!(builder.get_sequence("serializers").unwrap().items().len(), 2);
  }

  #[test]
  fn append_declares_sequence_on_demand() {
    let (mut builder, model) = setup();
    AppendToSequence::new("facets", Value::from("by_year"))
      .apply(&mut builder, &model)
      .unwrap();
    AppendToSequence::new("facets", Value::from("by_type"))
      .apply(&mut builder, &model)
      .unwrap();
    assert_eq!(builder.get_sequence("facets").unwrap().items().len(), 2);
  }

  #[test]
  fn append_rejects_duplicates_without_exists_ok() {
    let (mut builder, model) = setup();
    AppendToSequence::new("facets", Value::from("by_year"))
      .apply(&mut builder, &model)
      .unwrap();
    let err = AppendToSequence::new("facets", Value::from("by_year"))
      .apply(&mut builder, &model)
      .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateValue(_)));

    AppendToSequence::new("facets", Value::from("by_year"))
      .exists_ok()
      .apply(&mut builder, &model)
      .unwrap();
  }

  #[test]
  fn add_to_map_merges_then_sets_entry() {
    let (mut builder, model) = setup();
    let mut patch = BTreeMap::new();
    patch.insert("page_size".to_string(), Value::from(25));

    AddToMap::new("search")
      .with_patch(patch)
      .with_entry("sort", Value::from("newest"))
      .apply(&mut builder, &model)
      .unwrap();

    let map = builder.get_map("search").unwrap();
    assert_eq!(map.entries().get("page_size"), Some(&Value::from(25)));
    assert_eq!(map.entries().get("sort"), Some(&Value::from("newest")));
  }

  #[test]
  fn add_to_map_respects_write_once() {
    let (mut builder, model) = setup();
    AddToMap::new("search")
      .with_entry("sort", Value::from("newest"))
      .apply(&mut builder, &model)
      .unwrap();
    let err = AddToMap::new("search")
      .with_entry("sort", Value::from("oldest"))
      .apply(&mut builder, &model)
      .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateKey { .. }));

    AddToMap::new("search")
      .with_entry("sort", Value::from("oldest"))
      .overwrite()
      .apply(&mut builder, &model)
      .unwrap();
  }
}
