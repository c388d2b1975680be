//! Workflow Data Model
//!
//! Immutable results of a model build: ports, channels, programs, the
//! function registry and the top-level workflow.
//!
//! # Example Annotations
//!
//! ```text
//! @begin main
//!   @param threshold
//!   @out summary
//!   @begin clean_data
//!     @in threshold
//!     @out cleaned
//!   @end clean_data
//!   @begin summarize
//!     @in cleaned
//!     @out summary
//!   @end summarize
//! @end main
//! ```

use std::fmt;

use serde::Serialize;

use crate::annotations::Annotation;

/// Identifier of a scope, assigned in Begin order starting at 1.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// Identifier of a port, assigned in declaration order starting at 1.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction and role of a port.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    In,
    Out,
    Param,
    Return,
}

impl PortKind {
    /// Out and Return ports produce data for other scopes.
    pub fn is_producer(&self) -> bool {
        matches!(self, Self::Out | Self::Return)
    }

    /// In and Param ports consume data from other scopes.
    pub fn is_consumer(&self) -> bool {
        matches!(self, Self::In | Self::Param)
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Param => "param",
            Self::Return => "return",
        }
    }
}

/// A named access point declared within a scope.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: PortId,
    pub kind: PortKind,

    /// Name as declared in the annotation
    pub name: String,

    /// Name used for channel matching (the alias, if one was given)
    pub binding: String,

    /// Scope that declared the port
    pub scope: ScopeId,

    /// Annotation the port was created from
    pub annotation: Annotation,
}

/// An inferred data link between two ports sharing a binding.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub source: Port,
    pub sink: Port,
    pub is_param: bool,
}

impl Channel {
    /// Binding shared by both ends.
    pub fn binding(&self) -> &str {
        &self.source.binding
    }
}

/// One begin/end-delimited scope.
///
/// `in_ports` holds In and Param ports, `out_ports` holds Out and Return
/// ports, each in declaration order. Functions invoked inside the scope are
/// referenced by id in `functions`; their definitions live in the model's
/// flat registry.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub id: ScopeId,
    pub name: String,
    pub begin: Annotation,
    pub end: Annotation,
    pub in_ports: Vec<Port>,
    pub out_ports: Vec<Port>,
    pub programs: Vec<Program>,
    pub functions: Vec<ScopeId>,
    pub channels: Vec<Channel>,
}

impl Program {
    /// Free-text description from the begin annotation.
    pub fn description(&self) -> Option<&str> {
        self.begin.description.as_deref()
    }

    /// The Return port, if the scope declares one.
    pub fn return_port(&self) -> Option<&Port> {
        self.out_ports.iter().find(|p| p.kind == PortKind::Return)
    }

    pub fn param_ports(&self) -> impl Iterator<Item = &Port> {
        self.in_ports.iter().filter(|p| p.kind.is_param())
    }

    /// Bindings of Param ports.
    pub fn outer_param_bindings(&self) -> Vec<&str> {
        self.param_ports().map(|p| p.binding.as_str()).collect()
    }

    /// Bindings of non-Param inputs followed by all outputs.
    pub fn outer_data_bindings(&self) -> Vec<&str> {
        self.in_ports
            .iter()
            .filter(|p| !p.kind.is_param())
            .chain(self.out_ports.iter())
            .map(|p| p.binding.as_str())
            .collect()
    }

    /// Bindings of all inputs followed by all outputs.
    pub fn outer_bindings(&self) -> Vec<&str> {
        self.in_ports
            .iter()
            .chain(self.out_ports.iter())
            .map(|p| p.binding.as_str())
            .collect()
    }

    pub fn inner_param_channels(&self) -> Vec<&Channel> {
        self.channels.iter().filter(|c| c.is_param).collect()
    }

    pub fn inner_data_channels(&self) -> Vec<&Channel> {
        self.channels.iter().filter(|c| !c.is_param).collect()
    }

    /// True if some channel in this scope carries `binding`.
    pub fn has_channel_for_binding(&self, binding: &str) -> bool {
        self.channels.iter().any(|c| c.binding() == binding)
    }

    /// Number of scopes in this program's nested tree, itself included.
    ///
    /// Functions are counted where they are registered, not here.
    pub fn scope_count(&self) -> usize {
        1 + self.programs.iter().map(Program::scope_count).sum::<usize>()
    }

    /// Finds a program by name in this tree, depth first.
    pub fn find_program(&self, name: &str) -> Option<&Program> {
        if self.name == name {
            return Some(self);
        }
        self.programs.iter().find_map(|p| p.find_program(name))
    }

    /// Visits this program and every nested program, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Program)) {
        visit(self);
        for program in &self.programs {
            program.walk(visit);
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Anything that can be viewed as a [`Program`].
pub trait AsProgram {
    fn as_program(&self) -> &Program;

    fn is_workflow(&self) -> bool {
        false
    }

    fn is_function(&self) -> bool {
        false
    }
}

impl AsProgram for Program {
    fn as_program(&self) -> &Program {
        self
    }
}

/// A reusable scope hoisted into the model's flat registry.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub program: Program,
}

impl Function {
    pub fn id(&self) -> ScopeId {
        self.program.id
    }

    pub fn name(&self) -> &str {
        &self.program.name
    }

    pub fn return_port(&self) -> Option<&Port> {
        self.program.return_port()
    }
}

impl AsProgram for Function {
    fn as_program(&self) -> &Program {
        &self.program
    }

    fn is_function(&self) -> bool {
        true
    }
}

/// The program selected as the model's entry point.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub program: Program,
}

impl Workflow {
    pub fn new(program: Program) -> Self {
        Self { program }
    }

    pub fn name(&self) -> &str {
        &self.program.name
    }
}

impl AsProgram for Workflow {
    fn as_program(&self) -> &Program {
        &self.program
    }

    fn is_workflow(&self) -> bool {
        true
    }
}

/// Root aggregate of a successful build.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub workflow: Option<Workflow>,
    pub functions: Vec<Function>,
}

impl Model {
    pub fn new(workflow: Option<Workflow>, functions: Vec<Function>) -> Self {
        Self {
            workflow,
            functions,
        }
    }

    /// The workflow's program, if one was selected.
    pub fn top_program(&self) -> Option<&Program> {
        self.workflow.as_ref().map(|w| &w.program)
    }

    /// Looks up a registered function by id.
    pub fn function(&self, id: ScopeId) -> Option<&Function> {
        self.functions.iter().find(|f| f.id() == id)
    }

    /// Total scopes in the model: workflow tree plus every function tree.
    pub fn scope_count(&self) -> usize {
        self.programs().len()
    }

    /// Every program in the model, depth first: workflow tree, then functions.
    pub fn programs(&self) -> Vec<&Program> {
        let mut programs = Vec::new();
        let roots = self
            .top_program()
            .into_iter()
            .chain(self.functions.iter().map(|f| &f.program));
        for root in roots {
            root.walk(&mut |p| programs.push(p));
        }
        programs
    }

    /// Finds a program by name anywhere in the model.
    pub fn find_program(&self, name: &str) -> Option<&Program> {
        self.programs().into_iter().find(|p| p.name == name)
    }
}
