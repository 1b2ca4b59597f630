//! The assembly driver.
//!
//! `assemble` is the single synchronous entry point: flatten the supplied
//! preset groups, drop disabled presets, schedule the rest, then walk the
//! schedule applying customizations against a private builder. User
//! customizations that target a dependency of an upcoming preset are applied
//! just before that preset runs, so the preset observes the customized
//! value; whatever is left over is applied after all presets. Finalization
//! builds every remaining partial and returns the immutable namespace.
//!
//! Errors from a preset or customization are re-raised wrapped with the
//! offending identity, so the root cause is never lost behind a generic
//! failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use forge_core::{ModelInfo, Namespace};

use crate::builder::ModelBuilder;
use crate::customization::Customization;
use crate::error::AssembleError;
use crate::preset::PresetGroup;
use crate::schedule::sort_presets;

/// Caller-facing knobs for one assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleOptions {
  pub description: String,
  pub version: String,
  pub configuration: BTreeMap<String, serde_json::Value>,
}

impl Default for AssembleOptions {
  fn default() -> Self {
    Self {
      description: String::new(),
      version: "0.1.0".to_string(),
      configuration: BTreeMap::new(),
    }
  }
}

/// Assemble a model from presets and ad-hoc customizations.
pub fn assemble(
  name: &str,
  presets: Vec<PresetGroup>,
  customizations: Vec<Box<dyn Customization>>,
  options: AssembleOptions,
) -> Result<Arc<Namespace>, AssembleError> {
  let model = ModelInfo {
    name: name.to_string(),
    version: options.version,
    description: options.description,
    configuration: options.configuration,
  };
  let mut builder = ModelBuilder::new(model.clone());

  let mut enabled = Vec::new();
  for preset in PresetGroup::flatten(presets) {
    if preset.enabled(&model) {
      enabled.push(preset);
    } else {
      debug!(preset = preset.name(), "skipping disabled preset");
    }
  }

  let sorted = sort_presets(enabled)?;
  let mut pending = customizations;

  for preset in &sorted {
    let depends_on = preset.depends_on();

    // User customizations targeting one of this preset's dependencies must
    // land before the dependency is built.
    let mut idx = 0;
    while idx < pending.len() {
      if depends_on.iter().any(|dep| dep == pending[idx].name()) {
        let customization = pending.remove(idx);
        customization
          .apply(&mut builder, &model)
          .map_err(|source| AssembleError::Customization {
            customization: customization.describe(),
            preset: preset.name().to_string(),
            source,
          })?;
      } else {
        idx += 1;
      }
    }

    let mut dependencies = BTreeMap::new();
    for dep in &depends_on {
      let value = builder
        .build_partial(dep)
        .map_err(|source| AssembleError::Preset {
          preset: preset.name().to_string(),
          source,
        })?;
      dependencies.insert(dep.clone(), value);
    }

    let emitted = preset
      .apply(&mut builder, &model, &dependencies)
      .map_err(|source| AssembleError::Preset {
        preset: preset.name().to_string(),
        source,
      })?;
    for customization in emitted {
      customization
        .apply(&mut builder, &model)
        .map_err(|source| AssembleError::Customization {
          customization: customization.describe(),
          preset: preset.name().to_string(),
          source,
        })?;
    }
  }

  for customization in pending {
    customization
      .apply(&mut builder, &model)
      .map_err(|source| AssembleError::UserCustomization {
        customization: customization.describe(),
        source,
      })?;
  }

  let namespace = builder.finalize()?;
  info!(
    model = name,
    artifacts = namespace.len(),
    "model assembled"
  );
  Ok(namespace)
}
