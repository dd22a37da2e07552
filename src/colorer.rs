//! Concrete-execution line classification.
//!
//! The function body is cloned and folded with every parameter bound to its
//! concrete value, which turns each reachable `if` test into a literal. The
//! folded clone and the pristine original are then walked side by side and
//! the original's lines are sorted into executed and skipped. Loop bodies
//! are never entered.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde::Serialize;

use crate::ast::*;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::evaluator::fold_statements;
use crate::parser::parse;
use crate::render::render_expression;
use crate::types::ArgumentVector;
use crate::utils::{branch_statements, statement_lines};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineClassification {
    pub executed: BTreeSet<usize>,
    pub skipped: BTreeSet<usize>,
}

pub fn classify_lines(source: &str, args: &ArgumentVector) -> Result<LineClassification> {
    let program = parse(source)?;
    classify_program(&program, args)
}

pub fn classify_program(program: &Program, args: &ArgumentVector) -> Result<LineClassification> {
    let func = program.expect_single_function()?;

    let mut env = Environment::new();
    for param in &func.params {
        let value = args.get(param).ok_or_else(|| Error::UnboundVariable {
            name: param.clone(),
            line: func.body_line,
        })?;
        env.bind_literal(param, value.clone(), func.body_line);
    }
    for name in args.names() {
        if !func.params.iter().any(|p| p == name) {
            warn!("Ignoring argument `{}`: not a parameter of `{}`", name, func.name);
        }
    }

    let mut folded = func.body.clone();
    fold_statements(&mut folded, &mut env)?;

    let mut colorer = Colorer::default();
    colorer.sequence(&folded, &func.body)?;
    debug!(
        "executed lines {:?}, skipped lines {:?}",
        colorer.result.executed, colorer.result.skipped
    );
    Ok(colorer.result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Returned,
}

#[derive(Default)]
struct Colorer {
    result: LineClassification,
}

impl Colorer {
    fn sequence(&mut self, folded: &[Stmt], original: &[Stmt]) -> Result<Flow> {
        for (i, (f, o)) in folded.iter().zip(original).enumerate() {
            if self.statement(f, o)? == Flow::Returned {
                for unreachable in &original[i + 1..] {
                    self.skip(unreachable);
                }
                return Ok(Flow::Returned);
            }
        }
        Ok(Flow::Continue)
    }

    fn statement(&mut self, folded: &Stmt, original: &Stmt) -> Result<Flow> {
        match (&folded.kind, &original.kind) {
            (StmtKind::If(f), StmtKind::If(o)) => self.conditional(f, o, original.line),
            (StmtKind::Block(f), StmtKind::Block(o)) => self.sequence(f, o),
            (_, StmtKind::While(o)) => {
                self.result.executed.insert(o.test.line);
                Ok(Flow::Continue)
            }
            (_, StmtKind::Return(_)) => {
                self.result.executed.insert(original.line);
                Ok(Flow::Returned)
            }
            (_, StmtKind::Function(_)) => Err(Error::unsupported(
                original.line,
                "nested function declaration",
            )),
            _ => {
                self.result.executed.insert(original.line);
                Ok(Flow::Continue)
            }
        }
    }

    /// `line` is where the `if` statement itself starts.
    fn conditional(&mut self, folded: &IfStmt, original: &IfStmt, line: usize) -> Result<Flow> {
        self.result.executed.insert(original.test.line);

        if is_taken(&folded.test)? {
            self.result.executed.insert(original.consequent.line);
            let flow = self.branch(&folded.consequent, &original.consequent)?;
            if let Some(alternate) = &original.alternate {
                self.skip_chain(alternate);
            }
            return Ok(flow);
        }

        self.skip(&original.consequent);
        match (&folded.alternate, &original.alternate) {
            (Some(f), Some(o)) => match (&f.kind, &o.kind) {
                (StmtKind::If(f), StmtKind::If(inner)) => self.conditional(f, inner, o.line),
                _ => {
                    self.result.executed.insert(o.line);
                    self.branch(f, o)
                }
            },
            _ => {
                self.result.skipped.insert(line);
                Ok(Flow::Continue)
            }
        }
    }

    fn branch(&mut self, folded: &Stmt, original: &Stmt) -> Result<Flow> {
        self.sequence(branch_statements(folded), branch_statements(original))
    }

    /// Skips every body left in an else chain; later tests are never evaluated.
    fn skip_chain(&mut self, alternate: &Stmt) {
        match &alternate.kind {
            StmtKind::If(if_stmt) => {
                self.skip(&if_stmt.consequent);
                if let Some(next) = &if_stmt.alternate {
                    self.skip_chain(next);
                }
            }
            _ => self.skip(alternate),
        }
    }

    fn skip(&mut self, stmt: &Stmt) {
        let mut lines = Vec::new();
        statement_lines(stmt, &mut lines);
        self.result.skipped.extend(lines);
    }
}

fn is_taken(test: &Expr) -> Result<bool> {
    match test.as_literal() {
        Some(lit) => Ok(lit.is_truthy()),
        None => Err(Error::unsupported(
            test.line,
            format!(
                "condition `{}` does not reduce to a constant",
                render_expression(test)
            ),
        )),
    }
}
