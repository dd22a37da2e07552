//! Tree-to-text rendering.
//!
//! Output follows the usual JavaScript code-generator layout: four-space
//! indentation, `} else {` on one line, and parentheses only where operator
//! precedence requires them.

use crate::ast::*;

const INDENT: &str = "    ";

pub fn render_program(program: &Program) -> String {
    program
        .body
        .iter()
        .map(render_statement)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_statement(stmt: &Stmt) -> String {
    let mut printer = Printer::default();
    printer.stmt(stmt);
    printer.out
}

pub fn render_expression(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Function(func) => {
                self.out.push_str("function ");
                self.out.push_str(&func.name);
                self.out.push('(');
                self.out.push_str(&func.params.join(", "));
                self.out.push_str(") ");
                self.block(&func.body);
            }
            StmtKind::Block(body) => self.block(body),
            StmtKind::Expression(expr) => {
                write_expr(expr, &mut self.out);
                self.out.push(';');
            }
            StmtKind::Variable(decl) => {
                self.out.push_str(decl.keyword.as_str());
                self.out.push(' ');
                for (i, declarator) in decl.declarators.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&declarator.name);
                    if let Some(init) = &declarator.init {
                        self.out.push_str(" = ");
                        write_expr(init, &mut self.out);
                    }
                }
                self.out.push(';');
            }
            StmtKind::If(if_stmt) => {
                self.out.push_str("if (");
                write_expr(&if_stmt.test, &mut self.out);
                self.out.push(')');
                let braced = self.substatement(&if_stmt.consequent);
                if let Some(alternate) = &if_stmt.alternate {
                    if braced {
                        self.out.push_str(" else");
                    } else {
                        self.out.push('\n');
                        self.pad();
                        self.out.push_str("else");
                    }
                    if matches!(alternate.kind, StmtKind::If(_)) {
                        self.out.push(' ');
                        self.stmt(alternate);
                    } else {
                        self.substatement(alternate);
                    }
                }
            }
            StmtKind::While(while_stmt) => {
                self.out.push_str("while (");
                write_expr(&while_stmt.test, &mut self.out);
                self.out.push(')');
                self.substatement(&while_stmt.body);
            }
            StmtKind::Return(argument) => {
                self.out.push_str("return");
                if let Some(argument) = argument {
                    self.out.push(' ');
                    write_expr(argument, &mut self.out);
                }
                self.out.push(';');
            }
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        if body.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in body {
            self.pad();
            self.stmt(stmt);
            self.out.push('\n');
        }
        self.indent -= 1;
        self.pad();
        self.out.push('}');
    }

    /// Body of an `if`/`while`; returns whether it was a braced block.
    fn substatement(&mut self, stmt: &Stmt) -> bool {
        if matches!(stmt.kind, StmtKind::Block(_)) {
            self.out.push(' ');
            self.stmt(stmt);
            true
        } else {
            self.out.push('\n');
            self.indent += 1;
            self.pad();
            self.stmt(stmt);
            self.indent -= 1;
            false
        }
    }
}

const UNARY_PRECEDENCE: u8 = 7;
const PRIMARY_PRECEDENCE: u8 = 9;

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Assignment { .. } => 0,
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Unary { .. } => UNARY_PRECEDENCE,
        ExprKind::Literal(Literal::Number(n)) if n.is_sign_negative() && *n != 0.0 => {
            UNARY_PRECEDENCE
        }
        ExprKind::Update { .. } => 8,
        ExprKind::Literal(_) | ExprKind::Identifier(_) => PRIMARY_PRECEDENCE,
    }
}

fn write_operand(expr: &Expr, wrap: bool, out: &mut String) {
    if wrap {
        out.push('(');
        write_expr(expr, out);
        out.push(')');
    } else {
        write_expr(expr, out);
    }
}

fn write_expr(expr: &Expr, out: &mut String) {
    match &expr.kind {
        ExprKind::Literal(lit) => out.push_str(&lit.to_string()),
        ExprKind::Identifier(name) => out.push_str(name),
        ExprKind::Unary { op, operand } => {
            out.push_str(op.as_str());
            let mut inner = String::new();
            write_operand(operand, precedence(operand) < UNARY_PRECEDENCE, &mut inner);
            // `- -1` must not collapse into a decrement
            if inner.starts_with(op.as_str()) && *op != UnaryOp::Not {
                out.push(' ');
            }
            out.push_str(&inner);
        }
        ExprKind::Binary { op, left, right } => {
            write_operand(left, precedence(left) < op.precedence(), out);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_operand(right, precedence(right) <= op.precedence(), out);
        }
        ExprKind::Assignment { op, target, value } => {
            out.push_str(target);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_expr(value, out);
        }
        ExprKind::Update { op, prefix, target } => {
            if *prefix {
                out.push_str(op.as_str());
                out.push_str(target);
            } else {
                out.push_str(target);
                out.push_str(op.as_str());
            }
        }
    }
}
