//! The customization protocol and the generic mutation catalog.
//!
//! A customization is a single named mutation applied exactly once against
//! the builder, either emitted by a preset or supplied directly by the
//! caller. The catalog here covers the engine-level commands: declaring and
//! extending composites, sequences, maps, constants, modules, files and
//! exports. Domain-specific customizations implement the same trait.

mod collections;
mod composite;
mod export;
mod module;

pub use collections::{AddConstant, AddMap, AddSequence, AddToMap, AppendToSequence};
pub use composite::{AddBaseFragments, AddComposite, AddMixins};
pub use export::AddExport;
pub use module::{AddFile, AddFileToModule, AddJsonFile, AddModule, AddToModule, PatchJsonFile};

use forge_core::ModelInfo;

use crate::builder::ModelBuilder;
use crate::error::BuildError;

pub trait Customization {
  /// Key of the artifact this customization targets.
  fn name(&self) -> &str;

  /// Identity used when wrapping application errors.
  fn describe(&self) -> String {
    self.name().to_string()
  }

  /// Apply the mutation. Expected to raise a descriptive error on failure
  /// rather than failing silently; the driver wraps it with the offending
  /// preset and customization identity.
  fn apply(&self, builder: &mut ModelBuilder, model: &ModelInfo) -> Result<(), BuildError>;
}
