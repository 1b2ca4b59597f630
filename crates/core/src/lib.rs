//! forge-core: value model and pure algorithms for modelforge
//!
//! This crate provides the fundamental types used throughout modelforge:
//! - `Value`: the uniform artifact value flowing through the builder
//! - `Fragment`: a capability fragment with declared precedence over its bases
//! - `Composite`: the built form of a composite-type artifact
//! - `ModelInfo`: the model descriptor (name, version, configuration)
//! - `Namespace`: the finalized, immutable mapping from artifact name to value
//!
//! The linearization repair algorithm lives in [`linearize`]; it is a pure
//! function over fragment sequences with no dependency on the builder.

pub mod composite;
pub mod error;
pub mod fragment;
pub mod linearize;
pub mod model;
pub mod namespace;
pub mod value;

pub use composite::Composite;
pub use error::{BindingError, LinearizeError};
pub use fragment::{Fragment, FragmentRef};
pub use model::{Binding, ModelInfo, RuntimeDependencies};
pub use namespace::{ExportPoint, Namespace};
pub use value::{FileContent, Module, Value};
