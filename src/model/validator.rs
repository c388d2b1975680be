//! Model Validation
//!
//! Checks the internal invariants a correctly operating builder guarantees:
//! - Unique scope and port ids
//! - Channel ends share a binding
//! - Channels run from a producing port to a consuming port
//! - No channel connects a scope to itself
//! - Function references resolve to the registry
//!
//! A violation here is a defect in the builder, not a markup problem.

use std::collections::HashSet;

use log::{debug, info};

use super::types::{Channel, Model, PortId, PortKind, Program, ScopeId};
use crate::error::{Error, Result};

/// Internal invariant violations.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    DuplicateScopeId(ScopeId),
    DuplicatePortId(PortId),
    BindingMismatch { scope: String, source: String, sink: String },
    WrongDirection { scope: String, binding: String },
    SelfLoop { scope: String, binding: String },
    UnknownFunction { scope: String, function: ScopeId },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateScopeId(id) => write!(f, "Duplicate scope id: {}", id),
            Self::DuplicatePortId(id) => write!(f, "Duplicate port id: {}", id),
            Self::BindingMismatch { scope, source, sink } => write!(
                f,
                "Scope '{}' has a channel from '{}' to '{}' with different bindings",
                scope, source, sink
            ),
            Self::WrongDirection { scope, binding } => write!(
                f,
                "Scope '{}' has a channel for '{}' that does not run from producer to consumer",
                scope, binding
            ),
            Self::SelfLoop { scope, binding } => {
                write!(f, "Scope '{}' has a self-loop channel for '{}'", scope, binding)
            }
            Self::UnknownFunction { scope, function } => write!(
                f,
                "Scope '{}' references unregistered function #{}",
                scope, function
            ),
        }
    }
}

fn check_channel(program: &Program, channel: &Channel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let (source, sink) = (&channel.source, &channel.sink);

    if source.binding != sink.binding {
        violations.push(InvariantViolation::BindingMismatch {
            scope: program.name.clone(),
            source: source.binding.clone(),
            sink: sink.binding.clone(),
        });
    }

    if source.scope == sink.scope {
        violations.push(InvariantViolation::SelfLoop {
            scope: program.name.clone(),
            binding: source.binding.clone(),
        });
    }

    // Outward pass-through ends on the parent's own output.
    let outward = sink.scope == program.id && sink.kind.is_producer();
    let directed = match (source.kind, sink.kind) {
        (_, PortKind::Out | PortKind::Return) => outward && source.kind.is_producer(),
        (PortKind::In | PortKind::Param, _) => source.scope == program.id,
        _ => true,
    };
    if !directed || channel.is_param != (sink.kind == PortKind::Param) {
        violations.push(InvariantViolation::WrongDirection {
            scope: program.name.clone(),
            binding: source.binding.clone(),
        });
    }

    violations
}

/// Collects every invariant violation in a model.
pub fn check_model(model: &Model) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut scope_ids: HashSet<ScopeId> = HashSet::new();
    let mut port_ids: HashSet<PortId> = HashSet::new();
    let function_ids: HashSet<ScopeId> = model.functions.iter().map(|f| f.id()).collect();

    for program in model.programs() {
        if !scope_ids.insert(program.id) {
            violations.push(InvariantViolation::DuplicateScopeId(program.id));
        }

        for port in program.in_ports.iter().chain(program.out_ports.iter()) {
            if !port_ids.insert(port.id) {
                violations.push(InvariantViolation::DuplicatePortId(port.id));
            }
        }

        for channel in &program.channels {
            violations.extend(check_channel(program, channel));
        }

        for function in &program.functions {
            if !function_ids.contains(function) {
                violations.push(InvariantViolation::UnknownFunction {
                    scope: program.name.clone(),
                    function: *function,
                });
            }
        }
    }

    debug!("Checked {} scopes, {} ports", scope_ids.len(), port_ids.len());
    violations
}

/// Validates a built model, joining all violations into one error.
pub fn validate_model(model: &Model) -> Result<()> {
    let violations = check_model(model);

    if !violations.is_empty() {
        let messages: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        return Err(Error::Invariant(messages.join("\n")));
    }

    info!("Model validated: {} scopes", model.scope_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotation;
    use crate::model::build;

    fn sample_model() -> Model {
        build(
            &[
                Annotation::begin("main"),
                Annotation::input("raw"),
                Annotation::param("t"),
                Annotation::begin("filter"),
                Annotation::input("raw"),
                Annotation::param("t"),
                Annotation::output("kept"),
                Annotation::end("filter"),
                Annotation::begin("count"),
                Annotation::input("kept"),
                Annotation::returns("n"),
                Annotation::end("count"),
                Annotation::output("kept"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_built_model_is_valid() {
        let model = sample_model();
        assert!(check_model(&model).is_empty());
        assert!(validate_model(&model).is_ok());
    }

    #[test]
    fn test_binding_mismatch_detected() {
        let mut model = sample_model();
        let main = &mut model.workflow.as_mut().unwrap().program;
        main.channels[0].sink.binding = "other".to_string();

        let violations = check_model(&model);
        assert!(violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::BindingMismatch { .. })));
    }

    #[test]
    fn test_duplicate_port_id_detected() {
        let mut model = sample_model();
        let main = &mut model.workflow.as_mut().unwrap().program;
        let duplicate = main.in_ports[0].id;
        main.out_ports[0].id = duplicate;

        let violations = check_model(&model);
        assert!(violations.contains(&InvariantViolation::DuplicatePortId(duplicate)));
    }

    #[test]
    fn test_unknown_function_detected() {
        let mut model = sample_model();
        model.functions.clear();

        let result = validate_model(&model);
        assert!(matches!(result, Err(Error::Invariant(ref m)) if m.contains("unregistered")));
    }

    #[test]
    fn test_self_loop_detected() {
        let mut model = sample_model();
        let main = &mut model.workflow.as_mut().unwrap().program;
        let sink = main.channels[0].sink.clone();
        main.channels[0].source.scope = sink.scope;

        let violations = check_model(&model);
        assert!(violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::SelfLoop { .. })));
    }

    #[test]
    fn test_violation_display() {
        let v = InvariantViolation::DuplicatePortId(PortId(7));
        assert_eq!(v.to_string(), "Duplicate port id: 7");

        let v = InvariantViolation::SelfLoop {
            scope: "main".to_string(),
            binding: "x".to_string(),
        };
        assert!(v.to_string().contains("self-loop"));
    }
}
