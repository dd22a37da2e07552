//! Syntax tree for the analyzed JavaScript subset.
//!
//! Every statement and expression carries the line it starts on. Folding
//! rewrites expressions in place but never touches those lines, so a folded
//! tree and its pristine clone can be walked side by side.

use std::fmt;

use crate::error::{Error, Result};

/// A whole parsed source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    /// The only top-level function declaration, if the program is exactly one.
    pub fn single_function(&self) -> Option<&FunctionDecl> {
        match self.body.as_slice() {
            [Stmt {
                kind: StmtKind::Function(func),
                ..
            }] => Some(func),
            _ => None,
        }
    }

    /// Like [`Program::single_function`], failing for anything but one function.
    pub fn expect_single_function(&self) -> Result<&FunctionDecl> {
        self.single_function().ok_or_else(|| {
            let line = self.body.first().map(|s| s.line).unwrap_or(1);
            Error::unsupported(line, "program must be exactly one function declaration")
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Function(FunctionDecl),
    Block(Vec<Stmt>),
    Expression(Expr),
    Variable(VariableDecl),
    If(IfStmt),
    While(WhileStmt),
    Return(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    /// Statements of the function body block.
    pub body: Vec<Stmt>,
    /// Line of the body's opening brace.
    pub body_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKeyword {
    Let,
    Var,
    Const,
}

impl DeclKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKeyword::Let => "let",
            DeclKeyword::Var => "var",
            DeclKeyword::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub keyword: DeclKeyword,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub test: Expr,
    pub consequent: Box<Stmt>,
    pub alternate: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assignment {
        op: AssignOp,
        target: String,
        value: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: String,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Expr { kind, line }
    }

    pub fn literal(value: Literal, line: usize) -> Self {
        Expr::new(ExprKind::Literal(value), line)
    }

    pub fn identifier(name: impl Into<String>, line: usize) -> Self {
        Expr::new(ExprKind::Identifier(name.into()), line)
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    Str(String),
}

impl Literal {
    /// Numbers (other than NaN) and booleans take part in folding.
    pub fn is_foldable(&self) -> bool {
        match self {
            Literal::Number(n) => !n.is_nan(),
            Literal::Bool(_) => true,
            Literal::Str(_) => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Literal::Number(n) => *n != 0.0 && !n.is_nan(),
            Literal::Bool(b) => *b,
            Literal::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric coercion for arithmetic; booleans count as 0 or 1.
    pub fn to_number(&self) -> f64 {
        match self {
            Literal::Number(n) => *n,
            Literal::Bool(true) => 1.0,
            Literal::Bool(false) => 0.0,
            Literal::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) if n.is_nan() => write!(f, "NaN"),
            Literal::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Str(s) => write!(
                f,
                "'{}'",
                s.replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::StrictEq | BinaryOp::StrictNe => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::RemAssign => "%=",
        }
    }

    /// The arithmetic a compound assignment performs before storing.
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::RemAssign => Some(BinaryOp::Rem),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Literal::Number(2.0).is_truthy());
        assert!(!Literal::Number(0.0).is_truthy());
        assert!(!Literal::Number(f64::NAN).is_truthy());
        assert!(!Literal::Bool(false).is_truthy());
        assert!(Literal::Str("a".to_string()).is_truthy());
        assert!(!Literal::Str(String::new()).is_truthy());
    }

    #[test]
    fn test_nan_and_strings_do_not_fold() {
        assert!(Literal::Number(1.5).is_foldable());
        assert!(Literal::Bool(true).is_foldable());
        assert!(!Literal::Number(f64::NAN).is_foldable());
        assert!(!Literal::Str("1".to_string()).is_foldable());
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Number(5.0).to_string(), "5");
        assert_eq!(Literal::Number(2.5).to_string(), "2.5");
        assert_eq!(Literal::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Literal::Str("it's".to_string()).to_string(), "'it\\'s'");
        assert_eq!(Literal::Str("a\\b\nc".to_string()).to_string(), "'a\\\\b\\nc'");
    }

    #[test]
    fn test_single_function() {
        let func = FunctionDecl {
            name: "f".to_string(),
            params: vec![],
            body: vec![],
            body_line: 1,
        };
        let program = Program {
            body: vec![Stmt {
                kind: StmtKind::Function(func),
                line: 1,
            }],
        };
        assert_eq!(program.single_function().map(|f| f.name.as_str()), Some("f"));
        assert!(Program { body: vec![] }.single_function().is_none());
        assert!(matches!(
            Program { body: vec![] }.expect_single_function(),
            Err(Error::UnsupportedConstruct { line: 1, .. })
        ));
    }
}
