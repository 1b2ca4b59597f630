//! modelforge-lib: the model-assembly engine
//!
//! Given an ordered collection of presets (reusable units of capability) and
//! ad-hoc customizations (point mutations), the engine synthesizes a coherent
//! bundle of artifacts:
//! - `schedule`: orders presets by their provides/depends_on/modifies relations
//! - `builder`: the partial-build registry that lazily and idempotently
//!   materializes named artifacts from composable fragments
//! - `customization`: the generic mutation commands applied against the builder
//! - `assemble`: the driver tying scheduling, application and finalization
//!   together into a single synchronous entry point

pub mod assemble;
pub mod builder;
pub mod customization;
pub mod error;
pub mod preset;
pub mod schedule;
