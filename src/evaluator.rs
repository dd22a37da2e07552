//! Partial evaluation of expressions and in-place folding of statements.
//!
//! Expressions are folded against an [`Environment`]: identifiers are
//! replaced by their bound value, and operators whose operands are all
//! foldable literals collapse into a single literal. Anything that cannot
//! be computed is kept, partially folded, as an expression.

use log::debug;

use crate::ast::*;
use crate::env::Environment;
use crate::error::{Error, Result};

/// Folds `expr` against `env`, returning the simplified expression.
pub fn fold_expr(expr: &Expr, env: &Environment) -> Result<Expr> {
    match &expr.kind {
        ExprKind::Literal(_) => Ok(expr.clone()),
        ExprKind::Identifier(name) => match env.get(name) {
            Some(bound) => Ok(Expr {
                line: expr.line,
                ..bound.clone()
            }),
            None => Err(Error::UnboundVariable {
                name: name.clone(),
                line: expr.line,
            }),
        },
        ExprKind::Unary { op, operand } => {
            let operand = fold_expr(operand, env)?;
            match operand.as_literal() {
                Some(lit) if lit.is_foldable() => {
                    Ok(Expr::literal(apply_unary(*op, lit), expr.line))
                }
                _ => Ok(Expr::new(
                    ExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    expr.line,
                )),
            }
        }
        ExprKind::Binary { op, left, right } => {
            let left = fold_expr(left, env)?;
            let right = fold_expr(right, env)?;
            match (left.as_literal(), right.as_literal()) {
                (Some(l), Some(r)) if l.is_foldable() && r.is_foldable() => {
                    Ok(Expr::literal(apply_binary(*op, l, r), expr.line))
                }
                _ => Ok(Expr::new(
                    ExprKind::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    expr.line,
                )),
            }
        }
        ExprKind::Assignment { .. } | ExprKind::Update { .. } => Err(Error::unsupported(
            expr.line,
            "assignment used as a value",
        )),
    }
}

pub fn apply_unary(op: UnaryOp, operand: &Literal) -> Literal {
    match op {
        UnaryOp::Neg => Literal::Number(-operand.to_number()),
        UnaryOp::Plus => Literal::Number(operand.to_number()),
        UnaryOp::Not => Literal::Bool(!operand.is_truthy()),
    }
}

pub fn apply_binary(op: BinaryOp, left: &Literal, right: &Literal) -> Literal {
    let (l, r) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Add => Literal::Number(l + r),
        BinaryOp::Sub => Literal::Number(l - r),
        BinaryOp::Mul => Literal::Number(l * r),
        BinaryOp::Div => Literal::Number(l / r),
        BinaryOp::Rem => Literal::Number(l % r),
        BinaryOp::Lt => Literal::Bool(l < r),
        BinaryOp::Le => Literal::Bool(l <= r),
        BinaryOp::Gt => Literal::Bool(l > r),
        BinaryOp::Ge => Literal::Bool(l >= r),
        BinaryOp::Eq => Literal::Bool(l == r),
        BinaryOp::Ne => Literal::Bool(l != r),
        BinaryOp::StrictEq => Literal::Bool(same_type(left, right) && l == r),
        BinaryOp::StrictNe => Literal::Bool(!(same_type(left, right) && l == r)),
        BinaryOp::And => {
            if left.is_truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinaryOp::Or => {
            if left.is_truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
    }
}

fn same_type(left: &Literal, right: &Literal) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right)
}

/// Folds a statement in place, updating `env` along straight-line code.
pub fn fold_statement(stmt: &mut Stmt, env: &mut Environment) -> Result<()> {
    match &mut stmt.kind {
        StmtKind::Function(func) => fold_function(func, env),
        StmtKind::Block(body) => fold_statements(body, env),
        StmtKind::Variable(decl) => {
            for declarator in &mut decl.declarators {
                match &mut declarator.init {
                    Some(init) => {
                        *init = fold_expr(init, env)?;
                        env.bind(declarator.name.clone(), init.clone());
                    }
                    None => env.bind_placeholder(&declarator.name, declarator.line),
                }
            }
            Ok(())
        }
        StmtKind::Expression(expr) => fold_expression_statement(expr, env),
        StmtKind::Return(argument) => {
            if let Some(argument) = argument {
                *argument = fold_expr(argument, env)?;
            }
            Ok(())
        }
        StmtKind::If(if_stmt) => {
            if_stmt.test = fold_expr(&if_stmt.test, env)?;
            debug!(
                "line {}: if test folded to {:?}",
                stmt.line, if_stmt.test.kind
            );
            fold_statement(&mut if_stmt.consequent, &mut env.clone())?;
            if let Some(alternate) = &mut if_stmt.alternate {
                fold_statement(alternate, &mut env.clone())?;
            }
            Ok(())
        }
        StmtKind::While(while_stmt) => {
            // The test changes across iterations, so it is only checked for bindings.
            fold_expr(&while_stmt.test, env)?;
            fold_statement(&mut while_stmt.body, &mut env.clone())
        }
    }
}

pub fn fold_statements(body: &mut [Stmt], env: &mut Environment) -> Result<()> {
    for stmt in body {
        fold_statement(stmt, env)?;
    }
    Ok(())
}

/// Binds the parameters to placeholders and folds the body symbolically.
pub fn fold_function(func: &mut FunctionDecl, env: &mut Environment) -> Result<()> {
    for param in &func.params {
        env.bind_placeholder(param, func.body_line);
    }
    fold_statements(&mut func.body, env)
}

fn fold_expression_statement(expr: &mut Expr, env: &mut Environment) -> Result<()> {
    let line = expr.line;
    match &mut expr.kind {
        ExprKind::Assignment { op, target, value } => {
            **value = fold_expr(value, env)?;
            let bound = match op.binary() {
                None => (**value).clone(),
                Some(binary) => fold_expr(
                    &Expr::new(
                        ExprKind::Binary {
                            op: binary,
                            left: Box::new(Expr::identifier(target.clone(), line)),
                            right: value.clone(),
                        },
                        line,
                    ),
                    env,
                )?,
            };
            debug!("line {}: {} bound to {:?}", line, target, bound.kind);
            env.bind(target.clone(), bound);
            Ok(())
        }
        ExprKind::Update { .. } => Ok(()),
        _ => {
            *expr = fold_expr(expr, env)?;
            Ok(())
        }
    }
}

/// Symbolic substitution of a whole program from an empty environment.
pub fn substitute(program: &mut Program) -> Result<()> {
    let mut env = Environment::new();
    fold_statements(&mut program.body, &mut env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::render::{render_expression, render_program};

    use test_log::test;

    fn env_with(bindings: &[(&str, f64)]) -> Environment {
        let mut env = Environment::new();
        for (name, value) in bindings {
            env.bind_literal(name, Literal::Number(*value), 1);
        }
        env
    }

    fn expr(source: &str) -> Expr {
        let program = parse(&format!("function f() {{ return {}; }}", source)).unwrap();
        match &program.single_function().unwrap().body[0].kind {
            StmtKind::Return(Some(e)) => e.clone(),
            other => panic!("Expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_fold_arithmetic() {
        let folded = fold_expr(&expr("x * 2 + 1"), &env_with(&[("x", 5.0)])).unwrap();
        assert_eq!(folded.kind, ExprKind::Literal(Literal::Number(11.0)));
    }

    #[test]
    fn test_fold_comparison_to_bool() {
        let folded = fold_expr(&expr("x > 0"), &env_with(&[("x", -3.0)])).unwrap();
        assert_eq!(folded.kind, ExprKind::Literal(Literal::Bool(false)));
    }

    #[test]
    fn test_partial_fold_keeps_symbolic_operand() {
        let mut env = env_with(&[("y", 2.0)]);
        env.bind_placeholder("x", 1);
        let folded = fold_expr(&expr("x + y * 3"), &env).unwrap();
        assert_eq!(render_expression(&folded), "x + 6");
    }

    #[test]
    fn test_folded_literal_carries_replaced_line() {
        let program = parse("function f(x) {\n\n  return x + 1;\n}").unwrap();
        let StmtKind::Return(Some(e)) = &program.single_function().unwrap().body[0].kind else {
            panic!("Expected return");
        };
        let folded = fold_expr(e, &env_with(&[("x", 1.0)])).unwrap();
        assert_eq!(folded.line, 3);
    }

    #[test]
    fn test_resolved_identifier_takes_use_site_line() {
        let program = parse("function f(x) {\n\n\n  return x;\n}").unwrap();
        let StmtKind::Return(Some(e)) = &program.single_function().unwrap().body[0].kind else {
            panic!("Expected return");
        };
        let mut env = Environment::new();
        env.bind_literal("x", Literal::Number(1.0), 1);
        let folded = fold_expr(e, &env).unwrap();
        assert_eq!(folded.line, 4);
        assert_eq!(folded.as_literal(), Some(&Literal::Number(1.0)));
    }

    #[test]
    fn test_unbound_identifier_fails() {
        let err = fold_expr(&expr("z + 1"), &Environment::new()).unwrap_err();
        assert_eq!(
            err,
            Error::UnboundVariable {
                name: "z".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        let folded = fold_expr(&expr("1 / 0"), &Environment::new()).unwrap();
        assert_eq!(folded.kind, ExprKind::Literal(Literal::Number(f64::INFINITY)));
        let folded = fold_expr(&expr("0 / 0"), &Environment::new()).unwrap();
        assert!(matches!(folded.kind, ExprKind::Literal(Literal::Number(n)) if n.is_nan()));
    }

    #[test]
    fn test_nan_operand_stops_folding() {
        let folded = fold_expr(&expr("0 / 0 + 1"), &Environment::new()).unwrap();
        assert!(matches!(folded.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_strict_and_loose_equality() {
        let env = Environment::new();
        let loose = fold_expr(&expr("true == 1"), &env).unwrap();
        assert_eq!(loose.kind, ExprKind::Literal(Literal::Bool(true)));
        let strict = fold_expr(&expr("true === 1"), &env).unwrap();
        assert_eq!(strict.kind, ExprKind::Literal(Literal::Bool(false)));
    }

    #[test]
    fn test_logical_operators_select_operand() {
        let env = Environment::new();
        let folded = fold_expr(&expr("0 || 7"), &env).unwrap();
        assert_eq!(folded.kind, ExprKind::Literal(Literal::Number(7.0)));
        let folded = fold_expr(&expr("0 && 7"), &env).unwrap();
        assert_eq!(folded.kind, ExprKind::Literal(Literal::Number(0.0)));
    }

    #[test]
    fn test_string_literals_do_not_fold() {
        let folded = fold_expr(&expr("'a' + 1"), &Environment::new()).unwrap();
        assert!(matches!(folded.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_folding_is_a_fixed_point() {
        let mut env = env_with(&[("a", 4.0)]);
        env.bind_placeholder("b", 1);
        let once = fold_expr(&expr("a * 2 - b + (3 - 1)"), &env).unwrap();
        let twice = fold_expr(&once, &env).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_symbolic_substitution_inlines_locals() {
        let mut program = parse(
            "function foo(x, y) {\n\
             let a = x + 1;\n\
             let b = a + y;\n\
             if (b < 3) {\n\
             return b;\n\
             }\n\
             return a;\n\
             }",
        )
        .unwrap();
        substitute(&mut program).unwrap();
        let text = render_program(&program);
        assert!(text.contains("if (x + 1 + y < 3)"), "{}", text);
        assert!(text.contains("return x + 1 + y;"), "{}", text);
        assert!(text.contains("return x + 1;"), "{}", text);
    }

    #[test]
    fn test_branch_bindings_do_not_leak() {
        let mut program = parse(
            "function f(x) {\n\
             let a = 1;\n\
             if (x > 0) { a = 5; } else { a = 7; }\n\
             return a;\n\
             }",
        )
        .unwrap();
        substitute(&mut program).unwrap();
        let body = &program.single_function().unwrap().body;
        let StmtKind::Return(Some(value)) = &body[2].kind else {
            panic!("Expected return");
        };
        assert_eq!(value.kind, ExprKind::Literal(Literal::Number(1.0)));
    }

    #[test]
    fn test_compound_assignment_binds_result() {
        let mut program = parse("function f() { let a = 2; a *= 3; return a; }").unwrap();
        substitute(&mut program).unwrap();
        let body = &program.single_function().unwrap().body;
        let StmtKind::Return(Some(value)) = &body[2].kind else {
            panic!("Expected return");
        };
        assert_eq!(value.kind, ExprKind::Literal(Literal::Number(6.0)));
    }

    #[test]
    fn test_while_test_is_left_unfolded() {
        let mut program =
            parse("function f() { let i = 0; while (i < 3) { i = i + 1; } return i; }").unwrap();
        substitute(&mut program).unwrap();
        let text = render_program(&program);
        assert!(text.contains("while (i < 3)"), "{}", text);
        assert!(text.contains("i = 1;"), "{}", text);
        assert!(text.contains("return 0;"), "{}", text);
    }
}
