//! Model Builder
//!
//! Single forward pass over an annotation sequence. Open scopes live in an
//! arena addressed by index, with an explicit stack of indices for the
//! current nesting. When a scope closes its record is replaced by a frozen
//! [`Program`] that moves into the parent's child list, into the function
//! registry, or becomes the workflow.
//!
//! The build is all-or-nothing: the first structural error aborts the pass
//! and nothing partially built escapes.

use log::{debug, info, warn};

use super::resolver::resolve_binding;
use super::scope::ScopeAccumulator;
use super::types::{Function, Model, Port, PortId, PortKind, Program, ScopeId, Workflow};
use crate::annotations::{Annotation, AnnotationKind, Qualification};
use crate::error::MarkupError;

/// Builds a model from an ordered annotation sequence.
///
/// With `workflow_name` set, the outermost scope of that name becomes the
/// workflow; otherwise the first outermost scope does. Other outermost
/// scopes, and nested scopes declaring a Return port, go to the function
/// registry.
///
/// # Example
///
/// ```
/// use yesworkflow::annotations::Annotation;
/// use yesworkflow::model::build;
///
/// let annotations = vec![
///     Annotation::begin("main"),
///     Annotation::output("x"),
///     Annotation::end("main"),
/// ];
///
/// let model = build(&annotations, None).unwrap();
/// let workflow = model.workflow.unwrap();
/// assert_eq!(workflow.name(), "main");
/// assert_eq!(workflow.program.out_ports.len(), 1);
/// ```
pub fn build(annotations: &[Annotation], workflow_name: Option<&str>) -> Result<Model, MarkupError> {
    if annotations.is_empty() {
        return Err(MarkupError::NoAnnotations);
    }

    let mut state = BuildState::new(workflow_name);
    for annotation in annotations {
        state.apply(annotation)?;
    }
    let model = state.finish()?;

    info!(
        "Built model: workflow {}, {} functions, {} scopes",
        model
            .workflow
            .as_ref()
            .map(|w| format!("'{}'", w.name()))
            .unwrap_or_else(|| "absent".to_string()),
        model.functions.len(),
        model.scope_count()
    );

    Ok(model)
}

enum ScopeRecord {
    Open(ScopeAccumulator),
    Closed,
}

struct BuildState<'a> {
    requested: Option<&'a str>,
    arena: Vec<ScopeRecord>,
    stack: Vec<usize>,
    next_scope_id: u32,
    next_port_id: u32,
    workflow: Option<Workflow>,
    functions: Vec<Function>,
}

impl<'a> BuildState<'a> {
    fn new(requested: Option<&'a str>) -> Self {
        Self {
            requested,
            arena: Vec::new(),
            stack: Vec::new(),
            next_scope_id: 1,
            next_port_id: 1,
            workflow: None,
            functions: Vec::new(),
        }
    }

    fn open(&self, index: usize) -> &ScopeAccumulator {
        match &self.arena[index] {
            ScopeRecord::Open(acc) => acc,
            ScopeRecord::Closed => unreachable!("scope stack refers to closed scope #{}", index),
        }
    }

    fn open_mut(&mut self, index: usize) -> &mut ScopeAccumulator {
        match &mut self.arena[index] {
            ScopeRecord::Open(acc) => acc,
            ScopeRecord::Closed => unreachable!("scope stack refers to closed scope #{}", index),
        }
    }

    fn apply(&mut self, annotation: &Annotation) -> Result<(), MarkupError> {
        match annotation.kind {
            AnnotationKind::Begin => {
                self.begin(annotation);
                Ok(())
            }
            AnnotationKind::End => self.end(annotation),
            AnnotationKind::In => self.port(annotation, PortKind::In),
            AnnotationKind::Out => self.port(annotation, PortKind::Out),
            AnnotationKind::Param => self.port(annotation, PortKind::Param),
            AnnotationKind::Return => self.port(annotation, PortKind::Return),
        }
    }

    fn begin(&mut self, annotation: &Annotation) {
        let id = ScopeId(self.next_scope_id);
        self.next_scope_id += 1;

        let parent = self.stack.last().copied();
        let index = self.arena.len();
        self.arena.push(ScopeRecord::Open(ScopeAccumulator::new(
            id,
            parent,
            annotation.clone(),
        )));
        self.stack.push(index);

        debug!(
            "Opened scope '{}' (#{}, depth {})",
            annotation.name,
            id,
            self.stack.len()
        );
    }

    fn port(&mut self, annotation: &Annotation, kind: PortKind) -> Result<(), MarkupError> {
        let Some(&top) = self.stack.last() else {
            return Err(MarkupError::PortOutsideScope {
                tag: annotation.kind.tag().to_string(),
                name: annotation.name.clone(),
                location: annotation.location.clone(),
            });
        };

        let id = PortId(self.next_port_id);
        self.next_port_id += 1;

        let current = self.open_mut(top);
        let port = Port {
            id,
            kind,
            name: annotation.name.clone(),
            binding: resolve_binding(&annotation.name, &Qualification::of(annotation)),
            scope: current.id,
            annotation: annotation.clone(),
        };
        let parent = current.parent;
        current.add_port(port.clone());

        if let Some(parent) = parent {
            self.open_mut(parent).add_nested_port(port);
        }
        Ok(())
    }

    fn end(&mut self, annotation: &Annotation) -> Result<(), MarkupError> {
        let index = self.stack.pop().ok_or_else(|| MarkupError::UnmatchedEnd {
            name: annotation.name.clone(),
            location: annotation.location.clone(),
        })?;

        let acc = match std::mem::replace(&mut self.arena[index], ScopeRecord::Closed) {
            ScopeRecord::Open(acc) => acc,
            ScopeRecord::Closed => unreachable!("scope #{} closed twice", index),
        };

        if !annotation.name.is_empty() && annotation.name != acc.name() {
            warn!(
                "@end '{}' at {} closes scope '{}'",
                annotation.name,
                annotation.location,
                acc.name()
            );
        }

        let returns = acc.return_count();
        let program = acc.finish(annotation.clone());
        debug!(
            "Closed scope '{}' (#{}) with {} channels",
            program.name,
            program.id,
            program.channels.len()
        );

        match self.stack.last().copied() {
            None => self.finish_outermost(program, returns),
            Some(parent) if returns > 0 => {
                let id = program.id;
                self.register_function(program, returns)?;
                self.open_mut(parent).nest_function(id);
                Ok(())
            }
            Some(parent) => {
                self.open_mut(parent).nest_program(program);
                Ok(())
            }
        }
    }

    fn finish_outermost(&mut self, program: Program, returns: usize) -> Result<(), MarkupError> {
        let selected = self.workflow.is_none()
            && self.requested.map_or(true, |name| name == program.name);

        if selected {
            info!("Selected '{}' as the workflow", program.name);
            self.workflow = Some(Workflow::new(program));
            Ok(())
        } else {
            self.register_function(program, returns)
        }
    }

    fn register_function(&mut self, program: Program, returns: usize) -> Result<(), MarkupError> {
        if returns > 1 {
            return Err(MarkupError::MultipleReturns {
                name: program.name,
                count: returns,
            });
        }
        debug!("Registered function '{}' (#{})", program.name, program.id);
        self.functions.push(Function { program });
        Ok(())
    }

    fn finish(self) -> Result<Model, MarkupError> {
        if !self.stack.is_empty() {
            let names = self
                .stack
                .iter()
                .rev()
                .map(|&index| self.open(index).name().to_string())
                .collect();
            return Err(MarkupError::UnclosedScopes(names));
        }

        if self.workflow.is_none() {
            if let Some(name) = self.requested {
                return Err(MarkupError::WorkflowNotFound(name.to_string()));
            }
            if self.functions.is_empty() {
                return Err(MarkupError::NothingExtracted);
            }
        }

        Ok(Model::new(self.workflow, self.functions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::SourceLocation;

    fn names(programs: &[Program]) -> Vec<&str> {
        programs.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_single_scope_with_output() {
        let model = build(
            &[
                Annotation::begin("A"),
                Annotation::output("x"),
                Annotation::end("A"),
            ],
            None,
        )
        .unwrap();

        let workflow = model.workflow.as_ref().unwrap();
        assert_eq!(workflow.name(), "A");
        assert_eq!(workflow.program.out_ports.len(), 1);
        assert_eq!(workflow.program.out_ports[0].binding, "x");
        assert!(workflow.program.channels.is_empty());
        assert!(model.functions.is_empty());
    }

    #[test]
    fn test_parent_output_links_to_nested_input() {
        let model = build(
            &[
                Annotation::begin("A"),
                Annotation::begin("B"),
                Annotation::input("x"),
                Annotation::end("B"),
                Annotation::output("x"),
                Annotation::end("A"),
            ],
            None,
        )
        .unwrap();

        let a = model.top_program().unwrap();
        assert_eq!(names(&a.programs), vec!["B"]);
        assert_eq!(a.channels.len(), 1);

        let channel = &a.channels[0];
        assert_eq!(channel.source.scope, a.id);
        assert_eq!(channel.source.kind, PortKind::Out);
        assert_eq!(channel.sink.scope, a.programs[0].id);
        assert_eq!(channel.sink.kind, PortKind::In);
        assert!(!channel.is_param);
    }

    #[test]
    fn test_sibling_channel() {
        let model = build(
            &[
                Annotation::begin("A"),
                Annotation::begin("P1"),
                Annotation::output("y"),
                Annotation::end("P1"),
                Annotation::begin("P2"),
                Annotation::input("y"),
                Annotation::end("P2"),
                Annotation::end("A"),
            ],
            None,
        )
        .unwrap();

        let a = model.top_program().unwrap();
        assert_eq!(a.channels.len(), 1);
        assert_eq!(a.channels[0].source.scope, a.programs[0].id);
        assert_eq!(a.channels[0].sink.scope, a.programs[1].id);
        assert_eq!(a.channels[0].binding(), "y");
    }

    #[test]
    fn test_unclosed_scope_is_named() {
        let err = build(&[Annotation::begin("A"), Annotation::output("x")], None).unwrap_err();
        assert_eq!(err, MarkupError::UnclosedScopes(vec!["A".to_string()]));
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn test_unclosed_scopes_listed_innermost_first() {
        let err = build(
            &[
                Annotation::begin("outer"),
                Annotation::begin("done"),
                Annotation::end("done"),
                Annotation::begin("middle"),
                Annotation::begin("inner"),
            ],
            None,
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "No matching end comment for scope 'inner'\n\
             No matching end comment for scope 'middle'\n\
             No matching end comment for scope 'outer'"
        );
    }

    #[test]
    fn test_empty_input() {
        let err = build(&[], None).unwrap_err();
        assert_eq!(err, MarkupError::NoAnnotations);
        assert!(err.to_string().contains("No annotations"));
    }

    #[test]
    fn test_port_outside_scope() {
        let err = build(
            &[
                Annotation::begin("A"),
                Annotation::end("A"),
                Annotation::input("late").at(SourceLocation::line(12)),
            ],
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            MarkupError::PortOutsideScope { ref name, ref location, .. }
                if name == "late" && location.line == 12
        ));
    }

    #[test]
    fn test_end_without_begin() {
        let err = build(&[Annotation::end("A")], None).unwrap_err();
        assert!(matches!(err, MarkupError::UnmatchedEnd { .. }));
    }

    #[test]
    fn test_nested_return_scope_becomes_function() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("square"),
                Annotation::input("n"),
                Annotation::returns("sq"),
                Annotation::end("square"),
                Annotation::begin("report"),
                Annotation::input("sq"),
                Annotation::end("report"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap();

        let main = model.top_program().unwrap();
        assert_eq!(names(&main.programs), vec!["report"]);
        assert_eq!(main.functions, vec![ScopeId(2)]);
        assert_eq!(model.functions.len(), 1);
        assert_eq!(model.functions[0].name(), "square");
        assert_eq!(model.functions[0].return_port().unwrap().binding, "sq");

        // The function's return still feeds its sibling at the call site.
        assert_eq!(main.channels.len(), 1);
        assert_eq!(main.channels[0].source.kind, PortKind::Return);
    }

    #[test]
    fn test_functions_hoisted_from_any_depth() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("stage"),
                Annotation::begin("helper"),
                Annotation::returns("r"),
                Annotation::end("helper"),
                Annotation::end("stage"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap();

        let stage = model.find_program("stage").unwrap();
        assert!(stage.programs.is_empty());
        assert_eq!(stage.functions.len(), 1);
        assert_eq!(model.functions[0].name(), "helper");
        assert_eq!(model.scope_count(), 3);
    }

    #[test]
    fn test_second_outermost_scope_is_function() {
        let model = build(
            &[
                Annotation::begin("first"),
                Annotation::end("first"),
                Annotation::begin("second"),
                Annotation::end("second"),
            ],
            None,
        )
        .unwrap();

        assert_eq!(model.workflow.as_ref().unwrap().name(), "first");
        assert_eq!(model.functions.len(), 1);
        assert_eq!(model.functions[0].name(), "second");
    }

    #[test]
    fn test_requested_workflow_selected_by_name() {
        let model = build(
            &[
                Annotation::begin("util"),
                Annotation::end("util"),
                Annotation::begin("main"),
                Annotation::end("main"),
            ],
            Some("main"),
        )
        .unwrap();

        assert_eq!(model.workflow.as_ref().unwrap().name(), "main");
        assert_eq!(model.functions[0].name(), "util");
    }

    #[test]
    fn test_requested_workflow_must_be_outermost() {
        let err = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("inner"),
                Annotation::end("inner"),
                Annotation::end("main"),
            ],
            Some("inner"),
        )
        .unwrap_err();

        assert_eq!(err, MarkupError::WorkflowNotFound("inner".to_string()));
    }

    #[test]
    fn test_multiple_returns_rejected() {
        let err = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("f"),
                Annotation::returns("a"),
                Annotation::returns("b"),
                Annotation::end("f"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap_err();

        assert_eq!(
            err,
            MarkupError::MultipleReturns {
                name: "f".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_aliases_rebind_ports() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("load"),
                Annotation::output("table").with_alias("raw"),
                Annotation::end("load"),
                Annotation::begin("clean"),
                Annotation::input("data").with_alias("raw"),
                Annotation::end("clean"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap();

        let main = model.top_program().unwrap();
        assert_eq!(main.channels.len(), 1);
        assert_eq!(main.channels[0].source.name, "table");
        assert_eq!(main.channels[0].sink.name, "data");
        assert_eq!(main.channels[0].binding(), "raw");
    }

    #[test]
    fn test_ports_only_registered_with_direct_parent() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("stage"),
                Annotation::begin("deep"),
                Annotation::output("x"),
                Annotation::end("deep"),
                Annotation::end("stage"),
                Annotation::begin("sink"),
                Annotation::input("x"),
                Annotation::end("sink"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap();

        // 'deep' is not a direct child of 'main', and 'stage' never
        // re-exports 'x', so nothing connects at the top level.
        assert!(model.top_program().unwrap().channels.is_empty());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::input("a"),
                Annotation::begin("child"),
                Annotation::input("a"),
                Annotation::output("b"),
                Annotation::end("child"),
                Annotation::output("b"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap();

        let main = model.top_program().unwrap();
        let child = &main.programs[0];
        assert_eq!(main.id, ScopeId(1));
        assert_eq!(child.id, ScopeId(2));
        assert_eq!(main.in_ports[0].id, PortId(1));
        assert_eq!(child.in_ports[0].id, PortId(2));
        assert_eq!(child.out_ports[0].id, PortId(3));
        assert_eq!(main.out_ports[0].id, PortId(4));

        // a: main.in -> child.in, b: child.out -> main.out
        assert_eq!(main.channels.len(), 2);
    }

    #[test]
    fn test_mismatched_end_name_closes_innermost() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::begin("inner"),
                Annotation::end("main"),
                Annotation::end("inner"),
            ],
            None,
        )
        .unwrap();

        assert_eq!(names(&model.top_program().unwrap().programs), vec!["inner"]);
    }

    #[test]
    fn test_scope_count_matches_begin_end_pairs() {
        let annotations = vec![
            Annotation::begin("main"),
            Annotation::begin("a"),
            Annotation::begin("a1"),
            Annotation::end("a1"),
            Annotation::returns("ra"),
            Annotation::end("a"),
            Annotation::begin("b"),
            Annotation::end("b"),
            Annotation::end("main"),
            Annotation::begin("lib"),
            Annotation::begin("lib_inner"),
            Annotation::end("lib_inner"),
            Annotation::end("lib"),
        ];
        let pairs = annotations
            .iter()
            .filter(|a| a.kind == AnnotationKind::Begin)
            .count();

        let model = build(&annotations, None).unwrap();
        assert_eq!(model.scope_count(), pairs);
    }

    #[test]
    fn test_every_channel_shares_binding() {
        let model = build(
            &[
                Annotation::begin("main"),
                Annotation::param("t"),
                Annotation::input("raw"),
                Annotation::begin("filter"),
                Annotation::param("t"),
                Annotation::input("raw"),
                Annotation::output("kept"),
                Annotation::end("filter"),
                Annotation::begin("count"),
                Annotation::input("kept"),
                Annotation::output("n"),
                Annotation::end("count"),
                Annotation::output("n"),
                Annotation::end("main"),
            ],
            None,
        )
        .unwrap();

        let channels: Vec<_> = model
            .programs()
            .into_iter()
            .flat_map(|p| p.channels.iter())
            .collect();
        assert_eq!(channels.len(), 4);
        assert!(channels.iter().all(|c| c.source.binding == c.sink.binding));
        assert_eq!(channels.iter().filter(|c| c.is_param).count(), 1);
    }

    #[test]
    fn test_build_is_deterministic() {
        let annotations = vec![
            Annotation::begin("main"),
            Annotation::begin("p"),
            Annotation::output("x"),
            Annotation::end("p"),
            Annotation::begin("q"),
            Annotation::input("x"),
            Annotation::returns("y"),
            Annotation::end("q"),
            Annotation::end("main"),
        ];

        let first = build(&annotations, None).unwrap();
        let second = build(&annotations, None).unwrap();
        assert_eq!(first, second);
    }
}
