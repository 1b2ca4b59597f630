//! The preset protocol.
//!
//! A preset is a stateless capability descriptor. It declares which artifact
//! names it originates (`provides`), which it reads after they are fully
//! finalized (`depends_on`), and which already-existing artifacts it mutates
//! (`modifies`). The driver instantiates each preset once, the scheduler
//! orders them, and `apply` is invoked exactly once with the built values of
//! the declared dependencies.

use std::collections::BTreeMap;

use forge_core::{ModelInfo, Value};

use crate::builder::ModelBuilder;
use crate::customization::Customization;
use crate::error::BuildError;

pub trait Preset {
  /// Identity used in scheduling diagnostics and error chains.
  fn name(&self) -> &str;

  /// Artifact names this preset originates. Each name must have exactly one
  /// provider across the whole preset set.
  fn provides(&self) -> Vec<String> {
    Vec::new()
  }

  /// Artifact names that must be fully finalized before this preset runs.
  /// Their built values are handed to `apply`.
  fn depends_on(&self) -> Vec<String> {
    Vec::new()
  }

  /// Artifact names this preset mutates. They must already exist; multiple
  /// modifiers of one name run in the order they were supplied.
  fn modifies(&self) -> Vec<String> {
    Vec::new()
  }

  /// Whether this preset participates in the assembly. A `false` here is a
  /// normal, silent skip rather than an error.
  fn enabled(&self, _model: &ModelInfo) -> bool {
    true
  }

  /// Produce the ordered customizations this preset contributes.
  ///
  /// `dependencies` maps each declared `depends_on` name to its built value.
  fn apply(
    &self,
    builder: &mut ModelBuilder,
    model: &ModelInfo,
    dependencies: &BTreeMap<String, Value>,
  ) -> Result<Vec<Box<dyn Customization>>, BuildError>;
}

impl std::fmt::Debug for dyn Preset {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Preset").field("name", &self.name()).finish()
  }
}

/// Presets are supplied as an ordered collection that may nest; groups are
/// flattened in order before scheduling.
pub enum PresetGroup {
  One(Box<dyn Preset>),
  Many(Vec<PresetGroup>),
}

impl PresetGroup {
  pub fn flatten(groups: Vec<PresetGroup>) -> Vec<Box<dyn Preset>> {
    let mut flat = Vec::new();
    for group in groups {
      match group {
        PresetGroup::One(preset) => flat.push(preset),
        PresetGroup::Many(nested) => flat.extend(Self::flatten(nested)),
      }
    }
    flat
  }
}

impl From<Box<dyn Preset>> for PresetGroup {
  fn from(preset: Box<dyn Preset>) -> Self {
    PresetGroup::One(preset)
  }
}
