//! Control-flow graphs and concrete-path coloring for a small JavaScript subset.
//!
//! [`analyze`] turns the single function in a source text into a
//! [`ControlFlowGraph`]. [`classify_lines`] runs that function on concrete
//! arguments and reports executed and skipped source lines. An [`Analyzer`]
//! with `highlight` set does both and marks the nodes on the path taken.

pub mod ast;
pub mod colorer;
pub mod config;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod formatters;
pub mod graph_builder;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod types;
pub mod utils;

use log::info;

pub use colorer::LineClassification;
pub use config::AnalyzerConfig;
pub use error::{Error, Result};
pub use types::{ArgumentVector, ControlFlowGraph, Edge, EdgeKind, GraphNode, NodeColor, NodeId, NodeShape};

use crate::ast::Program;
use crate::evaluator::substitute;
use crate::graph_builder::build_cfg;
use crate::parser::parse;

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Analyzer { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Builds the graph and, when highlighting is on, colors the path taken for `args`.
    pub fn analyze(&self, source: &str, args: &ArgumentVector) -> Result<ControlFlowGraph> {
        let program = parse(source)?;
        let classification = if self.config.highlight {
            Some(colorer::classify_program(&program, args)?)
        } else {
            None
        };
        self.build(&program, classification.as_ref())
    }

    /// Builds the graph without running the function.
    pub fn analyze_uncolored(&self, source: &str) -> Result<ControlFlowGraph> {
        let program = parse(source)?;
        self.build(&program, None)
    }

    pub fn classify_lines(&self, source: &str, args: &ArgumentVector) -> Result<LineClassification> {
        colorer::classify_lines(source, args)
    }

    fn build(
        &self,
        program: &Program,
        classification: Option<&LineClassification>,
    ) -> Result<ControlFlowGraph> {
        let cfg = if self.config.fold_labels {
            let mut folded = program.clone();
            substitute(&mut folded)?;
            let func = folded.expect_single_function()?;
            build_cfg(&func.body, self.config.first_id, classification)?
        } else {
            let func = program.expect_single_function()?;
            build_cfg(&func.body, self.config.first_id, classification)?
        };

        info!(
            "Built graph with {} nodes and {} edges",
            cfg.nodes.len(),
            cfg.edges().count()
        );
        Ok(cfg)
    }
}

/// Builds the graph of the single function in `source`.
///
/// This is [`Analyzer::analyze`] with the default configuration, where
/// highlighting is off: the graph is the same for every argument vector, so
/// `args` only matters once an [`Analyzer`] is created with
/// `AnalyzerConfig { highlight: true, .. }`. Use [`classify_lines`] for the
/// path those arguments take.
pub fn analyze(source: &str, args: &ArgumentVector) -> Result<ControlFlowGraph> {
    Analyzer::default().analyze(source, args)
}

pub fn classify_lines(source: &str, args: &ArgumentVector) -> Result<LineClassification> {
    colorer::classify_lines(source, args)
}
