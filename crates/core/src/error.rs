//! Error types for forge-core

use thiserror::Error;

/// Errors raised while linearizing fragment sequences
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinearizeError {
    #[error("fragment '{name}' has inconsistent bases [{}]", bases.join(", "))]
    InconsistentBases { name: String, bases: Vec<String> },

    #[error("cannot merge bases: no consistent order exists for [{}]", sequence.join(", "))]
    CannotMergeBases { sequence: Vec<String> },
}

/// Errors raised while resolving deferred or runtime-bound values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("runtime dependencies are not bound yet")]
    Unbound,

    #[error("namespace has no artifact named '{0}'")]
    MissingDependency(String),
}
