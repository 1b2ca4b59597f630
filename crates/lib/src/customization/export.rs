//! Export-point customization.

use forge_core::ModelInfo;

use crate::builder::ModelBuilder;
use crate::error::BuildError;

use super::Customization;

/// Register an export point on the builder. The target is namespaced with
/// the model's base name and the configured separator.
pub struct AddExport {
  group: String,
  export_name: String,
  value: String,
  separator: String,
  overwrite: bool,
  name: String,
}

impl AddExport {
  pub fn new(group: &str, export_name: &str, value: &str) -> Self {
    Self {
      group: group.to_string(),
      export_name: export_name.to_string(),
      value: value.to_string(),
      separator: ":".to_string(),
      overwrite: false,
      name: format!("{group}::{export_name}::{value}"),
    }
  }

  pub fn with_separator(mut self, separator: &str) -> Self {
    self.separator = separator.to_string();
    self
  }

  pub fn overwrite(mut self) -> Self {
    self.overwrite = true;
    self
  }
}

impl Customization for AddExport {
  fn name(&self) -> &str {
    &self.name
  }

  fn describe(&self) -> String {
    format!("AddExport({}:{})", self.group, self.export_name)
  }

  fn apply(&self, builder: &mut ModelBuilder, _model: &ModelInfo) -> Result<(), BuildError> {
    builder.add_export(
      &self.group,
      &self.export_name,
      &self.value,
      &self.separator,
      self.overwrite,
    )
  }
}
