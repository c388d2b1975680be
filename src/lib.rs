//! YesWorkflow - Workflow Models from Script Comments
//!
//! Recovers the computational structure of a script from YesWorkflow
//! directives embedded in its comments. A flat sequence of `@begin`, `@end`,
//! `@in`, `@out`, `@param` and `@return` annotations becomes a nested model
//! of programs, reusable functions and one top-level workflow, with data-flow
//! channels inferred between ports that share a binding.
//!
//! # Architecture
//!
//! - [`annotations`]: Annotation records and listing loaders
//! - [`model`]: Data model, channel inference and the model builder
//! - [`facts`]: Logic-fact export of a finished model
//! - [`config`]: Model configuration from YAML and `name=value` options
//! - [`error`]: Markup, configuration and I/O errors
//!
//! # Example
//!
//! ```rust
//! use yesworkflow::annotations::Annotation;
//! use yesworkflow::model::build;
//!
//! let annotations = vec![
//!     Annotation::begin("main"),
//!     Annotation::begin("load"),
//!     Annotation::output("table"),
//!     Annotation::end("load"),
//!     Annotation::begin("plot"),
//!     Annotation::input("table"),
//!     Annotation::end("plot"),
//!     Annotation::end("main"),
//! ];
//!
//! let model = build(&annotations, None).unwrap();
//! let main = model.top_program().unwrap();
//! assert_eq!(main.programs.len(), 2);
//! assert_eq!(main.channels.len(), 1);
//! ```

pub mod annotations;
pub mod config;
pub mod error;
pub mod facts;
pub mod model;

// Re-export commonly used types
pub use annotations::{load_annotations, Annotation, AnnotationKind};
pub use config::{LogicLanguage, ModelConfig};
pub use error::{ConfigError, Error, MarkupError, Result};
pub use model::{build, Model, Modeler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "YesWorkflow";
