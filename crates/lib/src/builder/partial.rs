//! Partial shapes.
//!
//! A partial is a pending artifact held by the builder: it accumulates
//! mutations while presets run and produces its final value exactly once.
//! Every mutation checks the `built` flag; once a partial is built it is
//! immutable and any further mutation fails fast.

use std::collections::BTreeMap;

use forge_core::{FragmentRef, Value};

use crate::error::BuildError;

/// A pending artifact of one of the six supported shapes.
#[derive(Debug, Clone)]
pub enum Partial {
  Composite(CompositePartial),
  Sequence(SequencePartial),
  Map(MapPartial),
  Constant(ConstantPartial),
  Module(ModulePartial),
  File(FilePartial),
}

impl Partial {
  pub fn kind(&self) -> &'static str {
    match self {
      Partial::Composite(_) => "composite",
      Partial::Sequence(_) => "sequence",
      Partial::Map(_) => "map",
      Partial::Constant(_) => "constant",
      Partial::Module(_) => "module",
      Partial::File(_) => "file",
    }
  }

  pub fn key(&self) -> &str {
    match self {
      Partial::Composite(p) => &p.key,
      Partial::Sequence(p) => &p.key,
      Partial::Map(p) => &p.key,
      Partial::Constant(p) => &p.key,
      Partial::Module(p) => &p.key,
      Partial::File(p) => &p.key,
    }
  }

  pub(crate) fn mark_built(&mut self) {
    match self {
      Partial::Composite(p) => p.built = true,
      Partial::Sequence(p) => p.built = true,
      Partial::Map(p) => p.built = true,
      Partial::Constant(p) => p.built = true,
      Partial::Module(p) => p.built = true,
      Partial::File(p) => p.built = true,
    }
  }
}

/// A composite type under construction: an ordered mixin list, a base list
/// and literal fields. The mixin list is kept most specific first; the two
/// lists are concatenated, repaired and synthesized at build time.
#[derive(Debug, Clone)]
pub struct CompositePartial {
  pub(crate) key: String,
  type_name: String,
  mixins: Vec<FragmentRef>,
  bases: Vec<FragmentRef>,
  fields: BTreeMap<String, Value>,
  pub(crate) built: bool,
}

impl CompositePartial {
  pub(crate) fn new(key: &str, type_name: String, base: Option<FragmentRef>) -> Self {
    Self {
      key: key.to_string(),
      type_name,
      mixins: Vec::new(),
      bases: base.into_iter().collect(),
      fields: BTreeMap::new(),
      built: false,
    }
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn mixins(&self) -> &[FragmentRef] {
    &self.mixins
  }

  pub fn bases(&self) -> &[FragmentRef] {
    &self.bases
  }

  pub fn fields(&self) -> &BTreeMap<String, Value> {
    &self.fields
  }

  pub fn add_base_fragments(&mut self, fragments: &[FragmentRef]) -> Result<(), BuildError> {
    self.guard()?;
    self.bases.extend(fragments.iter().cloned());
    Ok(())
  }

  /// Prepend mixins: a later call inserts before an earlier one, so the most
  /// recently added mixins are the most specific. The order within one call
  /// is preserved.
  pub fn add_mixins(&mut self, fragments: &[FragmentRef]) -> Result<(), BuildError> {
    self.guard()?;
    for fragment in fragments.iter().rev() {
      self.mixins.insert(0, fragment.clone());
    }
    Ok(())
  }

  pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), BuildError> {
    self.guard()?;
    self.fields.insert(name.to_string(), value);
    Ok(())
  }

  fn guard(&self) -> Result<(), BuildError> {
    if self.built {
      return Err(BuildError::AlreadyBuilt(self.key.clone()));
    }
    Ok(())
  }
}

/// An ordered sequence of values. A sequence holding only fragments is
/// repaired to a mutually consistent order at build time.
#[derive(Debug, Clone)]
pub struct SequencePartial {
  pub(crate) key: String,
  items: Vec<Value>,
  pub(crate) built: bool,
}

impl SequencePartial {
  pub(crate) fn new(key: &str, items: Vec<Value>) -> Self {
    Self {
      key: key.to_string(),
      items,
      built: false,
    }
  }

  pub fn items(&self) -> &[Value] {
    &self.items
  }

  pub fn contains(&self, value: &Value) -> bool {
    self.items.contains(value)
  }

  pub fn push(&mut self, value: Value) -> Result<(), BuildError> {
    self.guard()?;
    self.items.push(value);
    Ok(())
  }

  pub fn extend(&mut self, values: Vec<Value>) -> Result<(), BuildError> {
    self.guard()?;
    self.items.extend(values);
    Ok(())
  }

  fn guard(&self) -> Result<(), BuildError> {
    if self.built {
      return Err(BuildError::AlreadyBuilt(self.key.clone()));
    }
    Ok(())
  }
}

/// A key-unique mapping: re-assignment of an existing key is rejected unless
/// explicitly permitted. Entries set to `Value::Absent` are dropped at build.
#[derive(Debug, Clone)]
pub struct MapPartial {
  pub(crate) key: String,
  entries: BTreeMap<String, Value>,
  pub(crate) built: bool,
}

impl MapPartial {
  pub(crate) fn new(key: &str, entries: BTreeMap<String, Value>) -> Self {
    Self {
      key: key.to_string(),
      entries,
      built: false,
    }
  }

  pub fn entries(&self) -> &BTreeMap<String, Value> {
    &self.entries
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn insert(&mut self, key: &str, value: Value, overwrite: bool) -> Result<(), BuildError> {
    self.guard()?;
    if self.entries.contains_key(key) && !overwrite {
      return Err(BuildError::DuplicateKey {
        name: self.key.clone(),
        key: key.to_string(),
      });
    }
    self.entries.insert(key.to_string(), value);
    Ok(())
  }

  /// Merge a patch map in; patched keys overwrite existing ones.
  pub fn merge(&mut self, patch: BTreeMap<String, Value>) -> Result<(), BuildError> {
    self.guard()?;
    self.entries.extend(patch);
    Ok(())
  }

  fn guard(&self) -> Result<(), BuildError> {
    if self.built {
      return Err(BuildError::AlreadyBuilt(self.key.clone()));
    }
    Ok(())
  }
}

/// A single constant value.
#[derive(Debug, Clone)]
pub struct ConstantPartial {
  pub(crate) key: String,
  value: Value,
  pub(crate) built: bool,
}

impl ConstantPartial {
  pub(crate) fn new(key: &str, value: Value) -> Self {
    Self {
      key: key.to_string(),
      value,
      built: false,
    }
  }

  pub fn value(&self) -> &Value {
    &self.value
  }
}

/// A module under construction: named sub-values (possibly deferred
/// bindings, resolved at build) plus a file table.
#[derive(Debug, Clone)]
pub struct ModulePartial {
  pub(crate) key: String,
  path: Option<String>,
  attrs: BTreeMap<String, Value>,
  files: BTreeMap<String, String>,
  pub(crate) built: bool,
}

impl ModulePartial {
  pub(crate) fn new(key: &str) -> Self {
    Self {
      key: key.to_string(),
      path: None,
      attrs: BTreeMap::new(),
      files: BTreeMap::new(),
      built: false,
    }
  }

  pub fn path(&self) -> Option<&str> {
    self.path.as_deref()
  }

  pub fn set_path(&mut self, path: &str) -> Result<(), BuildError> {
    self.guard()?;
    self.path = Some(path.to_string());
    Ok(())
  }

  pub fn attrs(&self) -> &BTreeMap<String, Value> {
    &self.attrs
  }

  pub fn attr(&self, name: &str) -> Option<&Value> {
    self.attrs.get(name)
  }

  pub fn set_attr(&mut self, name: &str, value: Value, exists_ok: bool) -> Result<(), BuildError> {
    self.guard()?;
    if self.attrs.contains_key(name) && !exists_ok {
      return Err(BuildError::AttributeExists {
        name: self.key.clone(),
        attr: name.to_string(),
      });
    }
    self.attrs.insert(name.to_string(), value);
    Ok(())
  }

  pub fn files(&self) -> &BTreeMap<String, String> {
    &self.files
  }

  pub fn file(&self, path: &str) -> Option<&str> {
    self.files.get(path).map(String::as_str)
  }

  pub fn add_file(&mut self, path: &str, content: &str) -> Result<(), BuildError> {
    self.guard()?;
    self.files.insert(path.to_string(), content.to_string());
    Ok(())
  }

  fn guard(&self) -> Result<(), BuildError> {
    if self.built {
      return Err(BuildError::AlreadyBuilt(self.key.clone()));
    }
    Ok(())
  }
}

/// A standalone raw-content file, registered under a symbolic name.
#[derive(Debug, Clone)]
pub struct FilePartial {
  pub(crate) key: String,
  module: String,
  path: String,
  content: String,
  pub(crate) built: bool,
}

impl FilePartial {
  pub(crate) fn new(key: &str, module: &str, path: &str, content: &str) -> Self {
    Self {
      key: key.to_string(),
      module: module.to_string(),
      path: path.to_string(),
      content: content.to_string(),
      built: false,
    }
  }

  pub fn module(&self) -> &str {
    &self.module
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn content(&self) -> &str {
    &self.content
  }
}
