use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Stmt, StmtKind};
use crate::types::NodeId;

static DECLARATION_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:let|var|const)\s+").unwrap());

/// Strips rendered source down to a node label: newlines, braces and
/// declaration keywords go, every `;` becomes a line break.
pub fn clean_label(text: &str) -> String {
    let text = text.replace(['\n', '{', '}'], " ");
    let text = DECLARATION_KEYWORD.replace_all(&text, "");
    text.split(';')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Statement nodes are prefixed with their number, as in `3: a = 1`.
pub fn number_label(id: NodeId, text: &str) -> String {
    match id {
        NodeId::Statement(n) if n > 0 => format!("{}: {}", n, text),
        _ => text.to_string(),
    }
}

/// Line of the first statement a body runs, or of the body itself when empty.
pub fn first_line(stmt: &Stmt) -> usize {
    match &stmt.kind {
        StmtKind::Block(body) => body.first().map(first_line).unwrap_or(stmt.line),
        _ => stmt.line,
    }
}

/// The statements a branch body runs.
pub fn branch_statements(stmt: &Stmt) -> &[Stmt] {
    match &stmt.kind {
        StmtKind::Block(body) => body,
        _ => std::slice::from_ref(stmt),
    }
}

/// Lines of every statement nested in `stmt`, including `stmt` itself
/// unless it is a bare block.
pub fn statement_lines(stmt: &Stmt, lines: &mut Vec<usize>) {
    match &stmt.kind {
        StmtKind::Block(body) => {
            for inner in body {
                statement_lines(inner, lines);
            }
        }
        StmtKind::If(if_stmt) => {
            lines.push(stmt.line);
            statement_lines(&if_stmt.consequent, lines);
            if let Some(alternate) = &if_stmt.alternate {
                statement_lines(alternate, lines);
            }
        }
        StmtKind::While(while_stmt) => {
            lines.push(stmt.line);
            statement_lines(&while_stmt.body, lines);
        }
        StmtKind::Function(func) => {
            lines.push(stmt.line);
            for inner in &func.body {
                statement_lines(inner, lines);
            }
        }
        StmtKind::Expression(_) | StmtKind::Variable(_) | StmtKind::Return(_) => {
            lines.push(stmt.line)
        }
    }
}
