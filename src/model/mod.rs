//! Workflow Model Module
//!
//! Turns a flat annotation sequence into a nested model of programs,
//! functions and one top-level workflow, with channels inferred between
//! ports that share a binding.
//!
//! # Structure
//!
//! - [`types`]: Data model (Port, Channel, Program, Function, Workflow, Model)
//! - [`resolver`]: Binding resolution and channel inference
//! - [`builder`]: Single-pass scope stack resolution
//! - [`validator`]: Internal invariant checks
//! - [`modeler`]: Configured build with optional fact export

pub mod builder;
pub mod modeler;
pub mod resolver;
mod scope;
pub mod types;
pub mod validator;

pub use builder::build;
pub use modeler::Modeler;
pub use resolver::{infer_channels, resolve_binding};
pub use types::{
    AsProgram, Channel, Function, Model, Port, PortId, PortKind, Program, ScopeId, Workflow,
};
pub use validator::validate_model;
