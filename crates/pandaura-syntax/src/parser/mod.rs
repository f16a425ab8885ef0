//! Recursive-descent parser for Pandaura Structured Text.
//!
//! Produces the typed AST in [`crate::ast`]. The parser performs no type
//! checking; type errors surface at evaluation.

use smol_str::SmolStr;

use crate::ast::{BinaryOp, CallArg, Expr, Program, Stmt, Target, TypeRef, UnaryOp, VarDecl};
use crate::error::{ParseError, SyntaxError};
use crate::lexer::{self, Token, TokenKind};

/// Parse a full compilation unit.
pub fn parse_program(source: &str) -> Result<Program, SyntaxError> {
    let tokens = lexer::lex(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    Ok(parser.program()?)
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(kind.describe()))
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.peek();
        let got: SmolStr = if token.kind == TokenKind::Eof {
            "end of input".into()
        } else {
            token.text(self.source).into()
        };
        ParseError {
            pos: token.range.start().into(),
            got,
            expected: expected.into(),
        }
    }

    fn ident(&mut self) -> Result<SmolStr, ParseError> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(token.text(self.source).into())
    }

    // =========================================================================
    // Program structure
    // =========================================================================

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut name = None;
        let wrapped = self.eat(TokenKind::KwProgram);
        if wrapped {
            name = Some(self.ident()?);
        }

        let mut decls = Vec::new();
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::KwVar => {
                    self.bump();
                    self.var_block(&mut decls)?;
                }
                TokenKind::KwEndProgram | TokenKind::Eof => break,
                _ => body.push(self.statement()?),
            }
        }

        if wrapped {
            self.expect(TokenKind::KwEndProgram)?;
            self.eat(TokenKind::Semicolon);
        }
        self.expect(TokenKind::Eof)?;
        Ok(Program { name, decls, body })
    }

    fn var_block(&mut self, decls: &mut Vec<VarDecl>) -> Result<(), ParseError> {
        while !self.at(TokenKind::KwEndVar) {
            if self.at(TokenKind::Eof) {
                return Err(self.error("END_VAR"));
            }
            decls.push(self.var_decl()?);
        }
        self.expect(TokenKind::KwEndVar)?;
        self.eat(TokenKind::Semicolon);
        Ok(())
    }

    fn var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let name = self.ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.type_ref()?;
        let init = if self.eat(TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(VarDecl { name, ty, init })
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        match self.peek_kind() {
            TokenKind::KwBool => {
                self.bump();
                Ok(TypeRef::Bool)
            }
            TokenKind::KwInt => {
                self.bump();
                Ok(TypeRef::Int)
            }
            TokenKind::KwDint => {
                self.bump();
                Ok(TypeRef::DInt)
            }
            TokenKind::KwReal => {
                self.bump();
                Ok(TypeRef::Real)
            }
            TokenKind::KwLreal => {
                self.bump();
                Ok(TypeRef::LReal)
            }
            TokenKind::KwString => {
                self.bump();
                Ok(TypeRef::String)
            }
            TokenKind::KwTime => {
                self.bump();
                Ok(TypeRef::Time)
            }
            TokenKind::KwArray => {
                self.bump();
                self.expect(TokenKind::LBracket)?;
                let lo = self.array_bound()?;
                self.expect(TokenKind::DotDot)?;
                let hi = self.array_bound()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::KwOf)?;
                let base = self.type_ref()?;
                Ok(TypeRef::Array {
                    lo,
                    hi,
                    base: Box::new(base),
                })
            }
            TokenKind::Ident => {
                let name = self.ident()?;
                Ok(TypeRef::Named(name))
            }
            _ => Err(self.error("type name")),
        }
    }

    fn array_bound(&mut self) -> Result<i64, ParseError> {
        let negative = self.eat(TokenKind::Minus);
        let token = self.expect(TokenKind::Number)?;
        let text = token.text(self.source);
        let value: i64 = text.parse().map_err(|_| ParseError {
            pos: token.range.start().into(),
            got: text.into(),
            expected: "integer array bound".into(),
        })?;
        Ok(if negative { -value } else { value })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.bump();
                Ok(Stmt::Nop)
            }
            TokenKind::KwIf => self.if_statement(),
            TokenKind::KwWhile => self.while_statement(),
            TokenKind::KwFor => self.for_statement(),
            TokenKind::Ident => self.simple_statement(),
            _ => Err(self.error("statement")),
        }
    }

    fn block_until(&mut self, terminators: &[TokenKind]) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !terminators.contains(&self.peek_kind()) {
            if self.at(TokenKind::Eof) {
                return Err(self.error(terminators[0].describe()));
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::KwIf)?;
        let condition = self.expression()?;
        self.expect(TokenKind::KwThen)?;
        let then_block = self.block_until(&[
            TokenKind::KwElsif,
            TokenKind::KwElse,
            TokenKind::KwEndIf,
        ])?;
        let mut else_if = Vec::new();
        while self.eat(TokenKind::KwElsif) {
            let cond = self.expression()?;
            self.expect(TokenKind::KwThen)?;
            let block = self.block_until(&[
                TokenKind::KwElsif,
                TokenKind::KwElse,
                TokenKind::KwEndIf,
            ])?;
            else_if.push((cond, block));
        }
        let else_block = if self.eat(TokenKind::KwElse) {
            self.block_until(&[TokenKind::KwEndIf])?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::KwEndIf)?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::If {
            condition,
            then_block,
            else_if,
            else_block,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::KwWhile)?;
        let condition = self.expression()?;
        self.expect(TokenKind::KwDo)?;
        let body = self.block_until(&[TokenKind::KwEndWhile])?;
        self.expect(TokenKind::KwEndWhile)?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::KwFor)?;
        let control = self.ident()?;
        self.expect(TokenKind::Assign)?;
        let start = self.expression()?;
        self.expect(TokenKind::KwTo)?;
        let end = self.expression()?;
        let step = if self.eat(TokenKind::KwBy) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(TokenKind::KwDo)?;
        let body = self.block_until(&[TokenKind::KwEndFor])?;
        self.expect(TokenKind::KwEndFor)?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::For {
            control,
            start,
            end,
            step,
            body,
        })
    }

    /// Assignment or call statement; both start with an identifier.
    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let name = self.ident()?;
        match self.peek_kind() {
            TokenKind::LParen => {
                self.bump();
                let args = self.call_args()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Call { name, args })
            }
            TokenKind::LBracket => {
                self.bump();
                let index = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::Assign)?;
                let value = self.expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Assign {
                    target: Target::Index { name, index },
                    value,
                })
            }
            TokenKind::Assign => {
                self.bump();
                let value = self.expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Assign {
                    target: Target::Var(name),
                    value,
                })
            }
            _ => Err(self.error("':=', '[' or '('")),
        }
    }

    fn call_args(&mut self) -> Result<Vec<CallArg>, ParseError> {
        let mut args = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.call_arg()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn call_arg(&mut self) -> Result<CallArg, ParseError> {
        // Keyword argument: `name := expr`. Requires two-token lookahead since
        // a bare identifier is also a valid positional expression.
        if self.at(TokenKind::Ident) && self.tokens[self.pos + 1].kind == TokenKind::Assign {
            let name = self.ident()?;
            self.bump();
            let value = self.expression()?;
            return Ok(CallArg {
                name: Some(name),
                value,
            });
        }
        let value = self.expression()?;
        Ok(CallArg { name: None, value })
    }

    // =========================================================================
    // Expressions, precedence low to high:
    //   OR < AND < NOT < comparison < additive < multiplicative < unary
    // =========================================================================

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(TokenKind::KwOr) {
            let right = self.and_expr()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.eat(TokenKind::KwAnd) {
            let right = self.not_expr()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(TokenKind::KwNot) {
            let expr = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Neq | TokenKind::BangEq => BinaryOp::Neq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent | TokenKind::KwMod => BinaryOp::Mod,
                TokenKind::KwDiv => BinaryOp::IntDiv,
                _ => break,
            };
            self.bump();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Minus => {
                self.bump();
                let expr = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            TokenKind::Plus => {
                self.bump();
                let expr = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Plus,
                    expr: Box::new(expr),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.bump();
                let text = token.text(self.source);
                let value: f64 = text.parse().map_err(|_| ParseError {
                    pos: token.range.start().into(),
                    got: text.into(),
                    expected: "numeric literal".into(),
                })?;
                Ok(Expr::Number(value))
            }
            TokenKind::TimeLiteral => {
                let token = self.bump();
                Ok(Expr::Time(lexer::decode_time_literal(
                    token.text(self.source),
                )))
            }
            TokenKind::StringLiteral => {
                let token = self.bump();
                Ok(Expr::Str(
                    lexer::decode_string_literal(token.text(self.source)).into(),
                ))
            }
            TokenKind::KwTrue => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            TokenKind::KwFalse => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident => {
                let name = self.ident()?;
                match self.peek_kind() {
                    TokenKind::LParen => {
                        self.bump();
                        let args = self.call_args()?;
                        self.expect(TokenKind::RParen)?;
                        Ok(Expr::Call { name, args })
                    }
                    TokenKind::LBracket => {
                        self.bump();
                        let index = self.expression()?;
                        self.expect(TokenKind::RBracket)?;
                        Ok(Expr::Index {
                            name,
                            index: Box::new(index),
                        })
                    }
                    TokenKind::Dot => {
                        let mut expr = Expr::Var(name);
                        while self.eat(TokenKind::Dot) {
                            let field = self.ident()?;
                            expr = Expr::Member {
                                target: Box::new(expr),
                                field,
                            };
                        }
                        Ok(expr)
                    }
                    _ => Ok(Expr::Var(name)),
                }
            }
            _ => Err(self.error("expression")),
        }
    }
}
