//! Model Configuration
//!
//! Settings are read from the `model` section of a YAML file and may be
//! overridden with `model.<key>=<value>` options.
//!
//! # Example YAML Format
//!
//! ```yaml
//! model:
//!   workflow: main
//!   factsfile: model_facts.P
//!   logic: prolog
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{ConfigError, Error, Result};

/// Default configuration file looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "yw.yaml";

/// Section of the configuration file read by the modeler.
pub const MODEL_SECTION: &str = "model";

/// Dialect used for fact export.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogicLanguage {
    #[default]
    Prolog,
    Datalog,
}

impl FromStr for LogicLanguage {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prolog" => Ok(Self::Prolog),
            "datalog" => Ok(Self::Datalog),
            other => Err(ConfigError::InvalidValue {
                key: "model.logic".to_string(),
                reason: format!("unknown logic language '{}'", other),
            }),
        }
    }
}

/// Settings consumed by [`Modeler`](crate::model::Modeler).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelConfig {
    /// Name of the outermost scope to use as the workflow
    pub workflow: Option<String>,

    /// Where to write facts; empty or `-` means standard output
    pub facts_file: Option<String>,

    /// Fact dialect
    pub logic: LogicLanguage,
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, name: impl Into<String>) -> Self {
        self.workflow = Some(name.into());
        self
    }

    pub fn with_facts_file(mut self, path: impl Into<String>) -> Self {
        self.facts_file = Some(path.into());
        self
    }

    pub fn with_logic(mut self, logic: LogicLanguage) -> Self {
        self.logic = logic;
        self
    }

    /// Parses configuration from YAML text.
    ///
    /// Sections other than `model` belong to other tools and are ignored.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(yaml)?;
        let mut config = Self::default();

        let Some(section) = root.get(MODEL_SECTION) else {
            debug!("No '{}' section in configuration", MODEL_SECTION);
            return Ok(config);
        };

        let Value::Mapping(entries) = section else {
            if section.is_null() {
                return Ok(config);
            }
            return Err(ConfigError::InvalidValue {
                key: MODEL_SECTION.to_string(),
                reason: "expected a mapping".to_string(),
            }
            .into());
        };

        for (key, value) in entries {
            let key = key.as_str().ok_or_else(|| ConfigError::InvalidValue {
                key: MODEL_SECTION.to_string(),
                reason: "keys must be strings".to_string(),
            })?;
            config.set_value(key, value)?;
        }

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_yaml_str(&content)?;
        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Loads the file if it exists, defaults otherwise.
    pub fn from_optional_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_yaml_file(path)
        } else {
            debug!("Configuration file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Applies a `name=value` override such as `model.workflow=main`.
    ///
    /// The `model.` prefix is optional and a bare `name` sets an empty
    /// value. Options for other sections are ignored.
    pub fn apply_option(&mut self, option: &str) -> std::result::Result<(), ConfigError> {
        let (name, value) = option.split_once('=').unwrap_or((option, ""));

        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MalformedOption(option.to_string()));
        }
        let key = match name.split_once('.') {
            Some((section, key)) if section.eq_ignore_ascii_case(MODEL_SECTION) => key,
            Some((section, _)) => {
                debug!("Ignoring option for section '{}'", section);
                return Ok(());
            }
            None => name,
        };

        self.set_value(key, &Value::String(value.trim().to_string()))
    }

    fn set_value(&mut self, key: &str, value: &Value) -> std::result::Result<(), ConfigError> {
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            "workflow" => self.workflow = optional_string(&key, value)?,
            "factsfile" => self.facts_file = facts_destination(&key, value)?,
            "logic" => {
                self.logic = match optional_string(&key, value)? {
                    Some(name) => name.parse()?,
                    None => LogicLanguage::default(),
                }
            }
            _ => return Err(ConfigError::UnknownKey(format!("{}.{}", MODEL_SECTION, key))),
        }
        Ok(())
    }
}

/// A string setting; null or empty means unset.
fn optional_string(key: &str, value: &Value) -> std::result::Result<Option<String>, ConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        _ => Err(ConfigError::InvalidValue {
            key: format!("{}.{}", MODEL_SECTION, key),
            reason: "expected a string".to_string(),
        }),
    }
}

/// The facts path; an empty string is kept since it selects standard output.
fn facts_destination(
    key: &str,
    value: &Value,
) -> std::result::Result<Option<String>, ConfigError> {
    match value {
        Value::String(s) => Ok(Some(s.trim().to_string())),
        _ => optional_string(key, value),
    }
}
