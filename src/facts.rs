//! Model Facts
//!
//! Renders a model as logic facts, one relation per line, for querying with
//! Prolog or a Datalog engine. Each relation is introduced by a `% FACT:`
//! comment giving its signature.
//!
//! ```text
//! % FACT: program(program_id, program_name).
//! program(1, 'main').
//! program(2, 'clean').
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};

use log::info;

use crate::config::LogicLanguage;
use crate::error::{Error, Result};
use crate::model::{Channel, Model, Program};

/// Builds the fact text for a model.
pub struct ModelFacts<'a> {
    logic: LogicLanguage,
    model: &'a Model,
    text: String,
}

impl<'a> ModelFacts<'a> {
    pub fn new(logic: LogicLanguage, model: &'a Model) -> Self {
        Self {
            logic,
            model,
            text: String::new(),
        }
    }

    fn quote(&self, atom: &str) -> String {
        match self.logic {
            LogicLanguage::Prolog => {
                format!("'{}'", atom.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            LogicLanguage::Datalog => {
                format!("\"{}\"", atom.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }

    fn signature(&mut self, signature: &str) {
        let _ = writeln!(self.text, "\n% FACT: {}.", signature);
    }

    fn fact(&mut self, relation: &str, args: &[String]) {
        let _ = writeln!(self.text, "{}({}).", relation, args.join(", "));
    }

    /// Renders every relation.
    pub fn build(mut self) -> String {
        let model = self.model;
        let programs = model.programs();
        let channels: Vec<(&Program, &Channel)> = programs
            .iter()
            .flat_map(|p| p.channels.iter().map(move |c| (*p, c)))
            .collect();

        self.signature("program(program_id, program_name)");
        for program in &programs {
            let name = self.quote(&program.name);
            self.fact("program", &[program.id.to_string(), name]);
        }

        self.signature("workflow(program_id)");
        if let Some(top) = model.top_program() {
            self.fact("workflow", &[top.id.to_string()]);
        }

        self.signature("function(program_id)");
        for function in &model.functions {
            self.fact("function", &[function.id().to_string()]);
        }

        self.signature("has_subprogram(program_id, subprogram_id)");
        for program in &programs {
            let children = program
                .programs
                .iter()
                .map(|p| p.id)
                .chain(program.functions.iter().copied());
            for child in children {
                self.fact("has_subprogram", &[program.id.to_string(), child.to_string()]);
            }
        }

        self.signature("port(port_id, port_type, port_name, binding)");
        for program in &programs {
            for port in program.in_ports.iter().chain(program.out_ports.iter()) {
                let args = [
                    port.id.to_string(),
                    self.quote(port.kind.as_str()),
                    self.quote(&port.name),
                    self.quote(&port.binding),
                ];
                self.fact("port", &args);
            }
        }

        self.signature("has_in_port(program_id, port_id)");
        for program in &programs {
            for port in &program.in_ports {
                self.fact("has_in_port", &[program.id.to_string(), port.id.to_string()]);
            }
        }

        self.signature("has_out_port(program_id, port_id)");
        for program in &programs {
            for port in &program.out_ports {
                self.fact("has_out_port", &[program.id.to_string(), port.id.to_string()]);
            }
        }

        self.signature("channel(channel_id, binding, is_param)");
        for (index, (_, channel)) in channels.iter().enumerate() {
            let args = [
                (index + 1).to_string(),
                self.quote(channel.binding()),
                channel.is_param.to_string(),
            ];
            self.fact("channel", &args);
        }

        self.signature("port_connects_to_channel(port_id, channel_id)");
        for (index, (_, channel)) in channels.iter().enumerate() {
            let id = (index + 1).to_string();
            self.fact("port_connects_to_channel", &[channel.source.id.to_string(), id.clone()]);
            self.fact("port_connects_to_channel", &[channel.sink.id.to_string(), id]);
        }

        self.signature("has_channel(program_id, channel_id)");
        for (index, (program, _)) in channels.iter().enumerate() {
            self.fact("has_channel", &[program.id.to_string(), (index + 1).to_string()]);
        }

        self.text
    }
}

/// Where exported facts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactsTarget {
    Stdout,
    File(String),
}

impl FactsTarget {
    /// An empty path or `-` selects standard output.
    pub fn from_path(path: &str) -> Self {
        match path.trim() {
            "" | "-" => Self::Stdout,
            path => Self::File(path.to_string()),
        }
    }

    pub fn write(&self, text: &str) -> Result<()> {
        match self {
            Self::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(text.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|e| Error::io("<stdout>", e))
            }
            Self::File(path) => {
                fs::write(path, text).map_err(|e| Error::io(path, e))?;
                info!("Facts written to: {}", path);
                Ok(())
            }
        }
    }
}
