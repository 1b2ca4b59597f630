//! The partial-build registry.
//!
//! `ModelBuilder` owns every partial and the namespace cache. Presets and
//! customizations declare and mutate partials through the shape-specific
//! `add_*` / `get_*` operations; `build_partial` materializes one artifact
//! lazily and idempotently, recursing depth-first through deferred
//! references; `finalize` builds everything left and returns the immutable
//! namespace.
//!
//! One builder serves exactly one assembly run. The scheduler guarantees a
//! safe processing order at preset granularity, so no cycle detection is
//! needed here; a build-in-progress sentinel converts an accidentally
//! self-referential partial into a clear error instead of unbounded
//! recursion.

mod partial;

pub use partial::{
  CompositePartial, ConstantPartial, FilePartial, MapPartial, ModulePartial, Partial,
  SequencePartial,
};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use forge_core::model::title_case;
use forge_core::{
  Binding, Composite, ExportPoint, FileContent, FragmentRef, Module, ModelInfo, Namespace,
  RuntimeDependencies, Value, linearize,
};

use crate::error::BuildError;

pub struct ModelBuilder {
  model: ModelInfo,
  partials: HashMap<String, Partial>,
  /// Declaration order; finalize builds in this order.
  order: Vec<String>,
  /// Built values, memoized by artifact name.
  ns: BTreeMap<String, Value>,
  /// Build-in-progress sentinel.
  building: HashSet<String>,
  exports: BTreeMap<(String, String), String>,
  runtime_deps: RuntimeDependencies,
}

impl ModelBuilder {
  pub fn new(model: ModelInfo) -> Self {
    Self {
      model,
      partials: HashMap::new(),
      order: Vec::new(),
      ns: BTreeMap::new(),
      building: HashSet::new(),
      exports: BTreeMap::new(),
      runtime_deps: RuntimeDependencies::new(),
    }
  }

  pub fn model(&self) -> &ModelInfo {
    &self.model
  }

  /// The late-bound dependency handle; clones share the binding state.
  pub fn runtime_dependencies(&self) -> RuntimeDependencies {
    self.runtime_deps.clone()
  }

  fn declare(
    &mut self,
    name: &str,
    partial: Partial,
    exists_ok: bool,
    kind: &'static str,
  ) -> Result<&mut Partial, BuildError> {
    match self.partials.entry(name.to_string()) {
      std::collections::hash_map::Entry::Occupied(entry) => {
        if !exists_ok {
          return Err(BuildError::AlreadyRegistered {
            kind,
            name: name.to_string(),
          });
        }
        let existing = entry.into_mut();
        if existing.kind() != kind {
          return Err(BuildError::WrongShape {
            name: name.to_string(),
            expected: kind,
            actual: existing.kind(),
          });
        }
        Ok(existing)
      }
      std::collections::hash_map::Entry::Vacant(entry) => {
        self.order.push(name.to_string());
        Ok(entry.insert(partial))
      }
    }
  }

  fn get(&mut self, name: &str, kind: &'static str) -> Result<&mut Partial, BuildError> {
    match self.partials.get_mut(name) {
      None => Err(BuildError::NotFound {
        kind,
        name: name.to_string(),
      }),
      Some(partial) if partial.kind() != kind => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: kind,
        actual: partial.kind(),
      }),
      Some(partial) => Ok(partial),
    }
  }

  /// Declare a composite-type partial. The composite's display name is the
  /// model's title name followed by the title-cased artifact name.
  pub fn add_composite(
    &mut self,
    name: &str,
    base: Option<FragmentRef>,
    exists_ok: bool,
  ) -> Result<&mut CompositePartial, BuildError> {
    let type_name = format!("{}{}", self.model.title_name(), title_case(name));
    let partial = Partial::Composite(CompositePartial::new(name, type_name, base));
    match self.declare(name, partial, exists_ok, "composite")? {
      Partial::Composite(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "composite",
        actual: other.kind(),
      }),
    }
  }

  pub fn get_composite(&mut self, name: &str) -> Result<&mut CompositePartial, BuildError> {
    match self.get(name, "composite")? {
      Partial::Composite(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "composite",
        actual: other.kind(),
      }),
    }
  }

  pub fn add_sequence(
    &mut self,
    name: &str,
    items: Vec<Value>,
    exists_ok: bool,
  ) -> Result<&mut SequencePartial, BuildError> {
    let partial = Partial::Sequence(SequencePartial::new(name, items));
    match self.declare(name, partial, exists_ok, "sequence")? {
      Partial::Sequence(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "sequence",
        actual: other.kind(),
      }),
    }
  }

  pub fn get_sequence(&mut self, name: &str) -> Result<&mut SequencePartial, BuildError> {
    match self.get(name, "sequence")? {
      Partial::Sequence(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "sequence",
        actual: other.kind(),
      }),
    }
  }

  pub fn add_map(
    &mut self,
    name: &str,
    default: BTreeMap<String, Value>,
    exists_ok: bool,
  ) -> Result<&mut MapPartial, BuildError> {
    let partial = Partial::Map(MapPartial::new(name, default));
    match self.declare(name, partial, exists_ok, "map")? {
      Partial::Map(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "map",
        actual: other.kind(),
      }),
    }
  }

  pub fn get_map(&mut self, name: &str) -> Result<&mut MapPartial, BuildError> {
    match self.get(name, "map")? {
      Partial::Map(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "map",
        actual: other.kind(),
      }),
    }
  }

  pub fn add_constant(
    &mut self,
    name: &str,
    value: Value,
    exists_ok: bool,
  ) -> Result<&mut ConstantPartial, BuildError> {
    let partial = Partial::Constant(ConstantPartial::new(name, value));
    match self.declare(name, partial, exists_ok, "constant")? {
      Partial::Constant(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "constant",
        actual: other.kind(),
      }),
    }
  }

  pub fn get_constant(&mut self, name: &str) -> Result<&mut ConstantPartial, BuildError> {
    match self.get(name, "constant")? {
      Partial::Constant(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "constant",
        actual: other.kind(),
      }),
    }
  }

  pub fn add_module(
    &mut self,
    name: &str,
    exists_ok: bool,
  ) -> Result<&mut ModulePartial, BuildError> {
    let partial = Partial::Module(ModulePartial::new(name));
    match self.declare(name, partial, exists_ok, "module")? {
      Partial::Module(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "module",
        actual: other.kind(),
      }),
    }
  }

  pub fn get_module(&mut self, name: &str) -> Result<&mut ModulePartial, BuildError> {
    match self.get(name, "module")? {
      Partial::Module(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "module",
        actual: other.kind(),
      }),
    }
  }

  pub fn add_file(
    &mut self,
    name: &str,
    module: &str,
    path: &str,
    content: &str,
    exists_ok: bool,
  ) -> Result<&mut FilePartial, BuildError> {
    let partial = Partial::File(FilePartial::new(name, module, path, content));
    match self.declare(name, partial, exists_ok, "file")? {
      Partial::File(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "file",
        actual: other.kind(),
      }),
    }
  }

  pub fn get_file(&mut self, name: &str) -> Result<&mut FilePartial, BuildError> {
    match self.get(name, "file")? {
      Partial::File(p) => Ok(p),
      other => Err(BuildError::WrongShape {
        name: name.to_string(),
        expected: "file",
        actual: other.kind(),
      }),
    }
  }

  /// Register an export point, namespaced with the model's base name.
  pub fn add_export(
    &mut self,
    group: &str,
    name: &str,
    value: &str,
    separator: &str,
    overwrite: bool,
  ) -> Result<(), BuildError> {
    let key = (group.to_string(), name.to_string());
    if self.exports.contains_key(&key) && !overwrite {
      return Err(BuildError::ExportExists {
        group: group.to_string(),
        name: name.to_string(),
      });
    }
    let target = format!("{}{}{}", self.model.base_name(), separator, value);
    self.exports.insert(key, target);
    Ok(())
  }

  /// Build one artifact, memoized. Already-built artifacts return the cached
  /// value; otherwise the partial's build runs exactly once, recursing
  /// depth-first through any deferred references it holds.
  pub fn build_partial(&mut self, key: &str) -> Result<Value, BuildError> {
    if let Some(value) = self.ns.get(key) {
      return Ok(value.clone());
    }
    let Some(partial) = self.partials.get(key) else {
      return Err(BuildError::NotFound {
        kind: "partial",
        name: key.to_string(),
      });
    };
    let partial = partial.clone();
    if !self.building.insert(key.to_string()) {
      return Err(BuildError::BuildInProgress(key.to_string()));
    }
    trace!(partial = key, "building");

    let result = self.run_build(&partial);
    self.building.remove(key);
    let value = result?;

    if let Some(entry) = self.partials.get_mut(key) {
      entry.mark_built();
    }
    self.ns.insert(key.to_string(), value.clone());
    Ok(value)
  }

  /// Build every remaining partial in declaration order, collect files and
  /// exports, and return the immutable namespace. Binds the namespace into
  /// the runtime-dependency handle.
  pub fn finalize(mut self) -> Result<Arc<Namespace>, BuildError> {
    let keys = self.order.clone();
    for key in &keys {
      self.build_partial(key)?;
    }

    let mut files = BTreeMap::new();
    for key in &keys {
      match self.partials.get(key.as_str()) {
        Some(Partial::Module(module)) => {
          for (path, content) in module.files() {
            files.insert(format!("{key}/{path}"), content.clone());
          }
        }
        Some(Partial::File(file)) => {
          files.insert(
            format!("{}/{}", file.module(), file.path()),
            file.content().to_string(),
          );
        }
        _ => {}
      }
    }

    let exports = self
      .exports
      .iter()
      .map(|((group, name), target)| ExportPoint {
        group: group.clone(),
        name: name.clone(),
        target: target.clone(),
      })
      .collect();

    let namespace = Arc::new(Namespace::new(self.ns, files, exports));
    self.runtime_deps.bind(namespace.clone());
    debug!(
      artifacts = namespace.len(),
      files = namespace.files().len(),
      "builder finalized"
    );
    Ok(namespace)
  }

  fn run_build(&mut self, partial: &Partial) -> Result<Value, BuildError> {
    match partial {
      Partial::Composite(p) => self.build_composite(p),
      Partial::Sequence(p) => self.build_sequence(p),
      Partial::Map(p) => self.build_map(p),
      Partial::Constant(p) => self.resolve_value(p.value()),
      Partial::Module(p) => self.build_module(p),
      Partial::File(p) => Ok(Value::File(Arc::new(FileContent {
        module: p.module().to_string(),
        path: p.path().to_string(),
        content: p.content().to_string(),
      }))),
    }
  }

  fn build_composite(&mut self, p: &CompositePartial) -> Result<Value, BuildError> {
    let mut sequence: Vec<FragmentRef> = p.mixins().to_vec();
    sequence.extend(p.bases().iter().cloned());
    let repaired = linearize::repair(&sequence).map_err(|source| BuildError::Linearize {
      name: p.type_name().to_string(),
      source,
    })?;

    let mut fields = BTreeMap::new();
    for (field, value) in p.fields() {
      fields.insert(field.clone(), self.resolve_value(value)?);
    }

    let composite = Composite::new(p.type_name(), repaired, fields).map_err(|source| {
      BuildError::Linearize {
        name: p.type_name().to_string(),
        source,
      }
    })?;
    Ok(Value::Composite(Arc::new(composite)))
  }

  fn build_sequence(&mut self, p: &SequencePartial) -> Result<Value, BuildError> {
    let items = p.items();
    let all_fragments =
      !items.is_empty() && items.iter().all(|item| matches!(item, Value::Fragment(_)));
    if all_fragments {
      let fragments: Vec<FragmentRef> =
        items.iter().filter_map(Value::as_fragment).cloned().collect();
      let repaired = linearize::repair(&fragments).map_err(|source| BuildError::Linearize {
        name: p.key.clone(),
        source,
      })?;
      return Ok(Value::List(
        repaired.into_iter().map(Value::Fragment).collect(),
      ));
    }

    let mut built = Vec::with_capacity(items.len());
    for item in items {
      built.push(self.resolve_value(item)?);
    }
    Ok(Value::List(built))
  }

  fn build_map(&mut self, p: &MapPartial) -> Result<Value, BuildError> {
    let mut built = BTreeMap::new();
    for (key, value) in p.entries() {
      if matches!(value, Value::Absent) {
        continue;
      }
      built.insert(key.clone(), self.resolve_value(value)?);
    }
    Ok(Value::Map(built))
  }

  fn build_module(&mut self, p: &ModulePartial) -> Result<Value, BuildError> {
    let mut attrs = BTreeMap::new();
    for (name, value) in p.attrs() {
      attrs.insert(name.clone(), self.resolve_value(value)?);
    }
    Ok(Value::Module(Arc::new(Module::new(
      p.key.clone(),
      p.path().map(str::to_string),
      attrs,
      p.files().clone(),
    ))))
  }

  /// Resolve deferred bindings in a value, recursing into lists and maps.
  fn resolve_value(&mut self, value: &Value) -> Result<Value, BuildError> {
    match value {
      Value::Deferred(binding) => self.resolve_binding(binding),
      Value::List(items) => {
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
          resolved.push(self.resolve_value(item)?);
        }
        Ok(Value::List(resolved))
      }
      Value::Map(entries) => {
        let mut resolved = BTreeMap::new();
        for (key, item) in entries {
          resolved.insert(key.clone(), self.resolve_value(item)?);
        }
        Ok(Value::Map(resolved))
      }
      other => Ok(other.clone()),
    }
  }

  fn resolve_binding(&mut self, binding: &Binding) -> Result<Value, BuildError> {
    let mut values = Vec::with_capacity(binding.keys().len());
    for key in binding.keys() {
      let value = if self.ns.contains_key(key.as_str()) || self.partials.contains_key(key.as_str())
      {
        self.build_partial(key)?
      } else if let Some(default) = binding.default_for(key) {
        default.clone()
      } else {
        return Err(forge_core::BindingError::MissingDependency(key.clone()).into());
      };
      values.push(value);
    }
    Ok(binding.finish(values))
  }
}
