//! # Engine: Owner of a Built Graph
//!
//! The `Engine` owns one immutable [`Graph`] and hands out executors that
//! borrow it. Any number of runs can be made from one engine; each run owns
//! its cursors and environments exclusively.
//!
//! "The graph is the program, the executor is one run of it."

use crate::config::ExecutorConfig;
use crate::error::RunError;
use crate::executor::{Executor, RunReport};
use blockflow_core::{BuildOptions, Graph, GraphBuildError, Program, Schematic};

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    name: String,
    description: Option<String>,
    graph: Graph,
}

impl Engine {
    pub fn new(name: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            description: None,
            graph,
        }
    }

    /// Build the program's graph with the given options.
    pub fn from_program(program: &Program, options: BuildOptions) -> Result<Self, GraphBuildError> {
        let graph = program.build_with(options)?;
        tracing::info!(
            program = %program.name,
            blocks = graph.len(),
            "engine ready"
        );
        Ok(Self {
            name: program.name.clone(),
            description: program.description.clone(),
            graph,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Start a run. The executor borrows the graph for its lifetime.
    pub fn executor(&self, config: ExecutorConfig) -> Executor<'_> {
        Executor::new(&self.name, &self.graph, config)
    }

    /// Run to completion; the first failed continuation is the error.
    pub fn run(&self, config: ExecutorConfig) -> Result<RunReport, RunError> {
        self.executor(config).run_to_completion()
    }

    /// Get the Schematic (structural view) of the program.
    pub fn schematic(&self) -> Schematic {
        let schematic = self.graph.schematic(self.name.clone());
        match &self.description {
            Some(description) => schematic.with_description(description.clone()),
            None => schematic,
        }
    }
}
