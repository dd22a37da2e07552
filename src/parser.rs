use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::{Spanned, Token, tokenize};

/// Parse source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Spanned>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Program> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let line = self.line();
        match self.peek() {
            Some(Token::Function) => self.parse_function(),
            Some(Token::LeftBrace) => {
                let (body, line) = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(body),
                    line,
                })
            }
            Some(Token::Let) | Some(Token::Var) | Some(Token::Const) => self.parse_variable_decl(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Return) => {
                self.advance();
                let argument = if self.check(&Token::Semicolon) || self.check(&Token::RightBrace) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat(&Token::Semicolon);
                Ok(Stmt {
                    kind: StmtKind::Return(argument),
                    line,
                })
            }
            Some(Token::Reserved(word)) => {
                Err(Error::unsupported(line, format!("`{}` statement", word)))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt {
                    kind: StmtKind::Expression(expr),
                    line,
                })
            }
        }
    }

    fn parse_function(&mut self) -> Result<Stmt> {
        let line = self.line();
        self.expect(Token::Function)?;
        let name = self.expect_identifier()?;
        self.expect(Token::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RightParen)?;

        let (body, body_line) = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::Function(FunctionDecl {
                name,
                params,
                body,
                body_line,
            }),
            line,
        })
    }

    /// Parses `{ stmt* }`, returning the statements and the line of the `{`.
    fn parse_block(&mut self) -> Result<(Vec<Stmt>, usize)> {
        let line = self.line();
        self.expect(Token::LeftBrace)?;

        let mut body = Vec::new();
        while !self.check(&Token::RightBrace) {
            if self.is_at_end() {
                return Err(Error::syntax(self.line(), "Unterminated block"));
            }
            if self.eat(&Token::Semicolon) {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RightBrace)?;

        Ok((body, line))
    }

    fn parse_variable_decl(&mut self) -> Result<Stmt> {
        let line = self.line();
        let keyword = match self.advance() {
            Some(Token::Let) => DeclKeyword::Let,
            Some(Token::Var) => DeclKeyword::Var,
            _ => DeclKeyword::Const,
        };

        let mut declarators = Vec::new();
        loop {
            let decl_line = self.line();
            let name = self.expect_identifier()?;
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                init,
                line: decl_line,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.eat(&Token::Semicolon);

        Ok(Stmt {
            kind: StmtKind::Variable(VariableDecl {
                keyword,
                declarators,
            }),
            line,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let line = self.line();
        self.expect(Token::If)?;
        self.expect(Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If(IfStmt {
                test,
                consequent,
                alternate,
            }),
            line,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let line = self.line();
        self.expect(Token::While)?;
        self.expect(Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt {
            kind: StmtKind::While(WhileStmt { test, body }),
            line,
        })
    }

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        if let (Some(Token::Identifier(name)), Some(next)) = (self.peek(), self.peek_at(1)) {
            let op = match next {
                Token::Assign => Some(AssignOp::Assign),
                Token::PlusAssign => Some(AssignOp::AddAssign),
                Token::MinusAssign => Some(AssignOp::SubAssign),
                Token::StarAssign => Some(AssignOp::MulAssign),
                Token::SlashAssign => Some(AssignOp::DivAssign),
                Token::PercentAssign => Some(AssignOp::RemAssign),
                _ => None,
            };
            if let Some(op) = op {
                let target = name.clone();
                let line = self.line();
                self.advance();
                self.advance();
                let value = self.parse_assignment()?;
                return Ok(Expr::new(
                    ExprKind::Assignment {
                        op,
                        target,
                        value: Box::new(value),
                    },
                    line,
                ));
            }
        }

        self.parse_binary(1)
    }

    /// Precedence climbing over the binary operator levels.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.peek().and_then(binary_op) {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(op.precedence() + 1)?;
            let line = left.line;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let line = self.line();
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                line,
            ));
        }

        let update = match self.peek() {
            Some(Token::PlusPlus) => Some(UpdateOp::Increment),
            Some(Token::MinusMinus) => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let target = self.expect_identifier()?;
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    target,
                },
                line,
            ));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_primary()?;

        let update = match self.peek() {
            Some(Token::PlusPlus) => Some(UpdateOp::Increment),
            Some(Token::MinusMinus) => Some(UpdateOp::Decrement),
            _ => None,
        };
        let Some(op) = update else {
            return Ok(expr);
        };
        let ExprKind::Identifier(name) = &expr.kind else {
            return Err(Error::syntax(
                self.line(),
                "Invalid update target, expected an identifier",
            ));
        };
        let target = name.clone();
        self.advance();
        Ok(Expr::new(
            ExprKind::Update {
                op,
                prefix: false,
                target,
            },
            expr.line,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let line = self.line();
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::literal(Literal::Number(*n), line)),
            Some(Token::Str(s)) => Ok(Expr::literal(Literal::Str(s.clone()), line)),
            Some(Token::True) => Ok(Expr::literal(Literal::Bool(true), line)),
            Some(Token::False) => Ok(Expr::literal(Literal::Bool(false), line)),
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                if self.check(&Token::LeftParen) {
                    return Err(Error::unsupported(line, format!("call to `{}`", name)));
                }
                Ok(Expr::identifier(name, line))
            }
            Some(Token::LeftParen) => {
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::Function) => Err(Error::unsupported(line, "function expression")),
            Some(Token::Reserved(word)) => {
                let word = word.clone();
                Err(Error::unsupported(line, format!("`{}` expression", word)))
            }
            Some(other) => {
                let other = other.clone();
                Err(Error::syntax(
                    line,
                    format!("Expected expression, got {:?}", other),
                ))
            }
            None => Err(Error::syntax(line, "Expected expression, got end of input")),
        }
    }

    // Helper methods
    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset).map(|t| &t.token)
    }

    /// Line of the current token, or of the last token at end of input.
    fn line(&self) -> usize {
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.current += 1;
            self.tokens.get(self.current - 1).map(|t| &t.token)
        } else {
            None
        }
    }

    fn check(&self, token: &Token) -> bool {
        if let Some(t) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.check(&token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::syntax(
                self.line(),
                format!("Expected {:?}, got {:?}", token, self.peek()),
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        let line = self.line();
        match self.advance() {
            Some(Token::Identifier(name)) => Ok(name.clone()),
            other => {
                let other = other.cloned();
                Err(Error::syntax(
                    line,
                    format!("Expected identifier, got {:?}", other),
                ))
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        Token::Percent => Some(BinaryOp::Rem),
        Token::Less => Some(BinaryOp::Lt),
        Token::LessEqual => Some(BinaryOp::Le),
        Token::Greater => Some(BinaryOp::Gt),
        Token::GreaterEqual => Some(BinaryOp::Ge),
        Token::EqualEqual => Some(BinaryOp::Eq),
        Token::BangEqual => Some(BinaryOp::Ne),
        Token::EqualEqualEqual => Some(BinaryOp::StrictEq),
        Token::BangEqualEqual => Some(BinaryOp::StrictNe),
        Token::AndAnd => Some(BinaryOp::And),
        Token::OrOr => Some(BinaryOp::Or),
        _ => None,
    }
}
