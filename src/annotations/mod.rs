//! YesWorkflow Annotations
//!
//! Typed records for the directives found in script comments. An annotation
//! sequence is produced upstream by an extractor; this module only defines
//! the record and knows how to read one directive from a comment line.
//!
//! # Comment Format
//!
//! ```text
//! @begin clean_data Remove outliers from the raw samples
//! @in raw_samples @as samples
//! @param threshold
//! @out cleaned
//! @end clean_data
//! ```

pub mod listing;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MarkupError;

pub use listing::{load_annotations, parse_listing};

/// The six directive kinds understood by the model builder.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Begin,
    End,
    In,
    Out,
    Param,
    Return,
}

impl AnnotationKind {
    /// Parses a comment tag such as `@begin` (case-insensitive, `@` optional).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.strip_prefix('@').unwrap_or(tag);
        match tag.to_ascii_lowercase().as_str() {
            "begin" => Some(Self::Begin),
            "end" => Some(Self::End),
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            "param" => Some(Self::Param),
            "return" => Some(Self::Return),
            _ => None,
        }
    }

    /// Tag text without the leading `@`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::End => "end",
            Self::In => "in",
            Self::Out => "out",
            Self::Param => "param",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.tag())
    }
}

/// Where an annotation was found.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// 1-based line number (0 when unknown)
    #[serde(default)]
    pub line: usize,
}

impl SourceLocation {
    /// A location with a line number only.
    pub fn line(line: usize) -> Self {
        Self { source: None, line }
    }

    /// A location within a named source file.
    pub fn in_source(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: Some(source.into()),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}", source, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// A single directive taken from a source comment.
///
/// Annotations are immutable once produced; rebinding via `@as` is carried
/// in [`alias`](Self::alias) and resolved into a [`Qualification`] when a
/// port is created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Directive kind
    pub kind: AnnotationKind,

    /// Declared name (scope name for begin/end, data name for ports)
    #[serde(default)]
    pub name: String,

    /// Local alias given with `@as`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Position in the source
    #[serde(default)]
    pub location: SourceLocation,

    /// Free text following the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Annotation {
    /// Creates an annotation with no location, alias or description.
    ///
    /// # Example
    ///
    /// ```
    /// use yesworkflow::annotations::{Annotation, AnnotationKind};
    ///
    /// let ann = Annotation::new(AnnotationKind::In, "reads").with_alias("samples");
    /// assert_eq!(ann.alias.as_deref(), Some("samples"));
    /// ```
    pub fn new(kind: AnnotationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into().trim().to_string(),
            alias: None,
            location: SourceLocation::default(),
            description: None,
        }
    }

    pub fn begin(name: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Begin, name)
    }

    pub fn end(name: impl Into<String>) -> Self {
        Self::new(AnnotationKind::End, name)
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(AnnotationKind::In, name)
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Out, name)
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Param, name)
    }

    pub fn returns(name: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Return, name)
    }

    /// Sets the `@as` alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the source location.
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Sets the free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parses one YW comment, e.g. `@in raw @as samples Raw sample table`.
    ///
    /// The name is optional only for `@end`.
    pub fn parse_comment(comment: &str, location: SourceLocation) -> Result<Self, MarkupError> {
        let mut tokens = comment.split_whitespace().peekable();

        let tag = tokens.next().unwrap_or_default();
        let kind = AnnotationKind::from_tag(tag).ok_or_else(|| MarkupError::UnknownTag {
            tag: tag.to_string(),
            location: location.clone(),
        })?;

        let name = match tokens.next() {
            Some(name) => name.to_string(),
            None if kind == AnnotationKind::End => String::new(),
            None => {
                return Err(MarkupError::MissingName {
                    tag: kind.tag().to_string(),
                    location,
                })
            }
        };

        let mut alias = None;
        if tokens.peek().is_some_and(|t| t.eq_ignore_ascii_case("@as")) {
            tokens.next();
            alias = tokens.next().map(str::to_string);
        }

        let description = tokens.collect::<Vec<_>>().join(" ");

        Ok(Self {
            kind,
            name,
            alias,
            location,
            description: (!description.is_empty()).then_some(description),
        })
    }
}

/// Rebinding context applied to a port's declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualification {
    pub alias: Option<String>,
}

impl Qualification {
    /// The qualification an annotation carries, read without modifying it.
    pub fn of(annotation: &Annotation) -> Self {
        Self {
            alias: annotation
                .alias
                .as_ref()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        }
    }
}
