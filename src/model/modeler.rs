//! Modeler
//!
//! Runs a configured build: constructs the model, checks its invariants and
//! exports facts when a facts file is configured.

use log::info;

use super::builder::build;
use super::types::Model;
use super::validator::validate_model;
use crate::annotations::Annotation;
use crate::config::{LogicLanguage, ModelConfig};
use crate::error::Result;
use crate::facts::{FactsTarget, ModelFacts};

/// Configured model builder.
///
/// # Example
///
/// ```
/// use yesworkflow::annotations::Annotation;
/// use yesworkflow::config::ModelConfig;
/// use yesworkflow::model::Modeler;
///
/// let modeler = Modeler::new(ModelConfig::new().with_workflow("main"));
/// let model = modeler
///     .model(&[Annotation::begin("main"), Annotation::end("main")])
///     .unwrap();
/// assert_eq!(model.workflow.unwrap().name(), "main");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Modeler {
    config: ModelConfig,
}

impl Modeler {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Sets the name of the workflow to select.
    pub fn set_workflow(&mut self, name: impl Into<String>) {
        self.config.workflow = Some(name.into());
    }

    /// Sets the facts destination (empty or `-` for standard output).
    pub fn set_facts_file(&mut self, path: impl Into<String>) {
        self.config.facts_file = Some(path.into());
    }

    pub fn set_logic(&mut self, logic: LogicLanguage) {
        self.config.logic = logic;
    }

    /// Builds and validates the model, then exports facts if configured.
    pub fn model(&self, annotations: &[Annotation]) -> Result<Model> {
        info!("Modeling {} annotations", annotations.len());

        let model = build(annotations, self.config.workflow.as_deref())?;
        validate_model(&model)?;

        if let Some(target) = self.facts_target() {
            target.write(&self.facts(&model))?;
        }

        Ok(model)
    }

    /// Destination for exported facts, if any is configured.
    pub fn facts_target(&self) -> Option<FactsTarget> {
        self.config.facts_file.as_deref().map(FactsTarget::from_path)
    }

    /// Renders the model's facts in the configured dialect.
    pub fn facts(&self, model: &Model) -> String {
        ModelFacts::new(self.config.logic, model).build()
    }
}
