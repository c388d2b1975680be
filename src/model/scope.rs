//! Scope Accumulator
//!
//! Mutable builder for one begin/end block. It collects the block's own
//! ports, the boundary ports of its direct children, and the children that
//! have already closed, then freezes into an immutable [`Program`].

use super::resolver::infer_channels;
use super::types::{Port, PortKind, Program, ScopeId};
use crate::annotations::Annotation;

#[derive(Debug)]
pub(crate) struct ScopeAccumulator {
    pub id: ScopeId,
    /// Arena index of the enclosing scope
    pub parent: Option<usize>,
    begin: Annotation,
    in_ports: Vec<Port>,
    out_ports: Vec<Port>,
    nested_ports: Vec<Port>,
    programs: Vec<Program>,
    functions: Vec<ScopeId>,
}

impl ScopeAccumulator {
    pub fn new(id: ScopeId, parent: Option<usize>, begin: Annotation) -> Self {
        Self {
            id,
            parent,
            begin,
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            nested_ports: Vec::new(),
            programs: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.begin.name
    }

    /// Attaches a port declared directly in this scope.
    pub fn add_port(&mut self, port: Port) {
        match port.kind {
            PortKind::In | PortKind::Param => self.in_ports.push(port),
            PortKind::Out | PortKind::Return => self.out_ports.push(port),
        }
    }

    /// Registers a port declared by a direct child.
    pub fn add_nested_port(&mut self, port: Port) {
        self.nested_ports.push(port);
    }

    pub fn return_count(&self) -> usize {
        self.out_ports
            .iter()
            .filter(|p| p.kind == PortKind::Return)
            .count()
    }

    pub fn nest_program(&mut self, program: Program) {
        self.programs.push(program);
    }

    pub fn nest_function(&mut self, id: ScopeId) {
        self.functions.push(id);
    }

    /// Resolves channels and freezes the scope.
    pub fn finish(self, end: Annotation) -> Program {
        let channels = infer_channels(&self.in_ports, &self.out_ports, &self.nested_ports);
        Program {
            id: self.id,
            name: self.begin.name.clone(),
            begin: self.begin,
            end,
            in_ports: self.in_ports,
            out_ports: self.out_ports,
            programs: self.programs,
            functions: self.functions,
            channels,
        }
    }
}
