//! Error Types
//!
//! Markup errors describe problems in the annotations themselves and are
//! meant to be shown to the script author. Configuration errors come from
//! the YAML file or `name=value` overrides. Everything else is wrapped in
//! the crate-level [`Error`].

use std::io;

use thiserror::Error;

use crate::annotations::SourceLocation;

/// Crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// Problems with the structure of the annotation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("No annotations found: cannot build a workflow model from an empty annotation sequence")]
    NoAnnotations,

    #[error("@{tag} '{name}' at {location} is declared outside any @begin/@end block")]
    PortOutsideScope {
        tag: String,
        name: String,
        location: SourceLocation,
    },

    #[error("@end '{name}' at {location} has no matching @begin")]
    UnmatchedEnd { name: String, location: SourceLocation },

    /// Names of every scope still open at end of input, innermost first.
    #[error("{}", unclosed_message(.0))]
    UnclosedScopes(Vec<String>),

    #[error("No workflow named '{0}' found in source")]
    WorkflowNotFound(String),

    #[error("No program or functions found in annotations")]
    NothingExtracted,

    #[error("Function '{name}' declares {count} return ports, at most one is allowed")]
    MultipleReturns { name: String, count: usize },

    #[error("Unrecognized annotation tag '{tag}' at {location}")]
    UnknownTag { tag: String, location: SourceLocation },

    #[error("@{tag} at {location} is missing a name")]
    MissingName { tag: String, location: SourceLocation },
}

fn unclosed_message(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("No matching end comment for scope '{}'", name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Problems with model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Malformed configuration option '{0}', expected name=value")]
    MalformedOption(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A defect in the model builder itself, never caused by user markup.
    #[error("Internal model invariant violated:\n{0}")]
    Invariant(String),
}

impl Error {
    /// Wraps an I/O failure with the path involved.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
