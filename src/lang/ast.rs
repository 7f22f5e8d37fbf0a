use crate::frontend::token::Token;
use crate::lang::value::Value;

/// Expression nodes.
///
/// Operator and name tokens are kept in the tree so later phases can report
/// errors at the original source position.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric or boolean literal; `value` carries the literal kind.
    Literal { value: Value, token: Token },

    /// Variable reference.
    Ident(Token),

    /// Prefix `-` or `!`.
    Unary { op: Token, right: Box<Expr> },

    /// Arithmetic, comparison, or logical operator with two operands.
    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },

    /// `target = value` or a compound form such as `target += value`.
    /// The target is always an identifier or a subscript.
    Assign {
        target: Box<Expr>,
        op: Token,
        value: Box<Expr>,
    },

    /// `++`/`--` applied to an identifier or subscript, before or after it.
    Update {
        op: Token,
        target: Box<Expr>,
        prefix: bool,
    },

    /// `object[index]`.
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// Brace-enclosed expression list; only valid as an array initializer.
    InitList { brace: Token, items: Vec<Expr> },
}

/// How a declarator spells its array size.
#[derive(Debug, Clone, PartialEq)]
pub enum ArraySize {
    /// `name[expr]`
    Explicit(Expr),
    /// `name[]`, length taken from the initializer list
    Inferred,
}

/// One `name [size]? (= init)?` item of a variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: Token,
    pub array: Option<ArraySize>,
    pub init: Option<Expr>,
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),

    /// `{ ... }`; introduces a lexical scope.
    Block(Vec<Stmt>),

    /// A lone `;`.
    Empty,

    /// `int a, b[3] = {1, 2};` and friends. `ty` is the type keyword token.
    VarDecl { ty: Token, decls: Vec<Declarator> },

    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While { cond: Expr, body: Box<Stmt> },

    /// `for (init; cond; step) body`; every header slot is optional.
    /// The initializer is either a variable declaration or an expression
    /// statement.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },

    Break(Token),
    Continue(Token),
}

/// A whole translation unit: the ordered top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
