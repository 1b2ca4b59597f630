//! Customizations targeting composite-type partials.

use forge_core::{FragmentRef, ModelInfo};

use crate::builder::ModelBuilder;
use crate::error::BuildError;

use super::Customization;

/// Declare a composite-type partial, optionally seeded with one base
/// fragment.
pub struct AddComposite {
  name: String,
  base: Option<FragmentRef>,
  exists_ok: bool,
}

impl AddComposite {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      base: None,
      exists_ok: false,
    }
  }

  pub fn with_base(mut self, base: FragmentRef) -> Self {
    self.base = Some(base);
    self
  }

  pub fn exists_ok(mut self) -> Self {
    self.exists_ok = true;
    self
  }
}

impl Customization for AddComposite {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddComposite({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.add_composite(&self.name, self.base.clone(), self.exists_ok)?;
    Ok(())
  }
}

/// Append base fragments to an existing composite.
pub struct AddBaseFragments {
  name: String,
  fragments: Vec<FragmentRef>,
}

impl AddBaseFragments {
  pub fn new(name: &str, fragments: Vec<FragmentRef>) -> Self {
    Self {
      name: name.to_string(),
      fragments,
    }
  }
}

impl Customization for AddBaseFragments {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddBaseFragments({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder
      .get_composite(&self.name)?
      .add_base_fragments(&self.fragments)
  }
}

/// Prepend mixins to an existing composite, keeping the most recently added
/// mixins the most specific.
pub struct AddMixins {
  name: String,
  fragments: Vec<FragmentRef>,
}

impl AddMixins {
  pub fn new(name: &str, fragments: Vec<FragmentRef>) -> Self {
    Self {
      name: name.to_string(),
      fragments,
    }
  }
}

impl Customization for AddMixins {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddMixins({})", self.name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.get_composite(&self.name)?.add_mixins(&self.fragments)
  }
}
