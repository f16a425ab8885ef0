//! Typed AST for Pandaura Structured Text.

#![allow(missing_docs)]

use smol_str::SmolStr;

/// A parsed compilation unit: optional `PROGRAM name` wrapper, declarations
/// from all `VAR` blocks in order, and the top-level statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: Option<SmolStr>,
    pub decls: Vec<VarDecl>,
    pub body: Vec<Stmt>,
}

/// One `name : type [:= init];` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: SmolStr,
    pub ty: TypeRef,
    pub init: Option<Expr>,
}

/// Declared type of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Bool,
    Int,
    DInt,
    Real,
    LReal,
    String,
    Time,
    /// `ARRAY[lo..hi] OF base`
    Array {
        lo: i64,
        hi: i64,
        base: Box<TypeRef>,
    },
    /// A user identifier; resolved at load time (function-block type or UDT).
    Named(SmolStr),
}

/// Assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Var(SmolStr),
    /// `name[index]`
    Index { name: SmolStr, index: Expr },
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        target: Target,
        value: Expr,
    },
    /// Call statement: `T1(IN := Start, PT := T#100ms);`
    Call {
        name: SmolStr,
        args: Vec<CallArg>,
    },
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_if: Vec<(Expr, Vec<Stmt>)>,
        else_block: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        control: SmolStr,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    /// Bare `;`
    Nop,
}

/// Positional or keyword call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    /// `name :=` prefix, if present.
    pub name: Option<SmolStr>,
    pub value: Expr,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(SmolStr),
    Bool(bool),
    /// Time literal, milliseconds.
    Time(i64),
    Var(SmolStr),
    /// `target.field`
    Member {
        target: Box<Expr>,
        field: SmolStr,
    },
    /// `name[index]`
    Index {
        name: SmolStr,
        index: Box<Expr>,
    },
    /// Call in expression position: `TO_INT(x)`.
    Call {
        name: SmolStr,
        args: Vec<CallArg>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
}

/// Binary operators, lowest-binding first in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}
