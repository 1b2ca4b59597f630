//! Error types for the assembly engine.
//!
//! Every failure is a configuration, composition or application error per
//! the engine's taxonomy; nothing is retried and nothing is downgraded to a
//! warning. `AssembleError` is what the entry point surfaces: a single chain
//! that pinpoints the first fatal inconsistency, with the offending preset
//! or customization named in the message.

use thiserror::Error;

use forge_core::{BindingError, LinearizeError};

/// Errors raised by the builder and by customizations mutating it.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A partial was declared twice without `exists_ok`.
  #[error("{kind} '{name}' already exists")]
  AlreadyRegistered { kind: &'static str, name: String },

  /// A required partial does not exist.
  #[error("{kind} '{name}' not found")]
  NotFound { kind: &'static str, name: String },

  /// A partial exists under the name but has a different shape.
  #[error("partial '{name}' is a {actual}, expected a {expected}")]
  WrongShape {
    name: String,
    expected: &'static str,
    actual: &'static str,
  },

  /// Mutation attempted after the partial was finalized.
  #[error("cannot mutate '{0}' after it is built")]
  AlreadyBuilt(String),

  /// A partial's build re-entered itself.
  #[error("partial '{0}' is already being built (self-referential partial)")]
  BuildInProgress(String),

  /// Write-once map key re-assigned without the override flag.
  #[error("key '{key}' already exists in map '{name}'")]
  DuplicateKey { name: String, key: String },

  /// Duplicate value appended to a sequence without `exists_ok`.
  #[error("value already exists in sequence '{0}'")]
  DuplicateValue(String),

  /// Module attribute re-assigned without `exists_ok`.
  #[error("attribute '{attr}' already exists in module '{name}'")]
  AttributeExists { name: String, attr: String },

  /// Export re-registered without the overwrite flag.
  #[error("export {group}:{name} is already registered")]
  ExportExists { group: String, name: String },

  /// Linearization failed while building a composite or fragment sequence.
  #[error("error while building '{name}': {source}")]
  Linearize {
    name: String,
    #[source]
    source: LinearizeError,
  },

  /// A deferred binding referenced a value that cannot be resolved.
  #[error(transparent)]
  Binding(#[from] BindingError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Errors raised while ordering presets.
#[derive(Debug, Error)]
pub enum ScheduleError {
  #[error("preset '{second}' provides '{name}', but it is already provided by '{first}'")]
  DuplicateProvider {
    name: String,
    first: String,
    second: String,
  },

  #[error("preset '{preset}' depends on '{name}', but no preset provides it")]
  UnknownDependency { preset: String, name: String },

  #[error("preset '{preset}' modifies '{name}', but no preset provides it")]
  UnknownModifyTarget { preset: String, name: String },

  #[error("dependency cycle among presets: {}", members.join(", "))]
  Cycle { members: Vec<String> },

  #[error("cannot schedule presets:\n{0}")]
  Unresolvable(String),
}

/// Errors surfaced by the assembly entry point.
#[derive(Debug, Error)]
pub enum AssembleError {
  #[error(transparent)]
  Schedule(#[from] ScheduleError),

  #[error(transparent)]
  Build(#[from] BuildError),

  /// A preset's `apply` failed.
  #[error("error applying preset '{preset}': {source}")]
  Preset {
    preset: String,
    #[source]
    source: BuildError,
  },

  /// A customization emitted by a preset failed.
  #[error("error applying customization '{customization}' from preset '{preset}': {source}")]
  Customization {
    customization: String,
    preset: String,
    #[source]
    source: BuildError,
  },

  /// A caller-supplied customization failed.
  #[error("error applying user customization '{customization}': {source}")]
  UserCustomization {
    customization: String,
    #[source]
    source: BuildError,
  },
}
