//! The abstract syntax tree.
//!
//! Shapes mirror the tagged tuples the original grammar actions produced:
//! a sum type per syntactic category instead of untyped tuples
//! discriminated by a leading tag string.

use crate::common::{Id, Line, Set};

#[derive(Debug, Clone)]
pub struct Program {
    pub procedures: Vec<ProcDecl>,
    pub main: MainDecl,
}

/// A declared procedure. Procedures may only call procedures that appear
/// earlier in `procedures` — there is no forward declaration and no
/// recursion.
#[derive(Debug, Clone)]
pub struct ProcDecl {
    pub name: Id,
    pub params: Vec<Param>,
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
    /// Source line of the `IN` keyword that opens this procedure's body.
    pub lineno: Line,
}

#[derive(Debug, Clone)]
pub struct MainDecl {
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
    /// Source line of the `IN` keyword that opens the main program's body.
    pub lineno: Line,
}

/// A procedure's formal parameter. Shape (scalar vs. array-by-reference)
/// is fixed at declaration via the `T` (`TAB`) marker on array parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Scalar(Id),
    Array(Id),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Scalar(Id),
    Array(Id, u32),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Read(LValue),
    Write(RValue),
    Assign(LValue, Expr),
    If {
        cond: Cond,
        body: Vec<Stmt>,
        consts: Set<i64>,
    },
    IfElse {
        cond: Cond,
        tt: Vec<Stmt>,
        ff: Vec<Stmt>,
        consts: Set<i64>,
    },
    While {
        cond: Cond,
        body: Vec<Stmt>,
        consts: Set<i64>,
    },
    Until {
        cond: Cond,
        body: Vec<Stmt>,
    },
    ProcCall {
        name: Id,
        args: Vec<Id>,
        line: Line,
    },
}

/// An assignable location: a bare name, an array element, or an
/// identifier the parser could not resolve (propagated for a later
/// diagnostic rather than failing the parse immediately).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LValue {
    Name(Id),
    ArrayElem(Id, Box<Index>),
    Undeclared(Id),
}

/// An array index: either known at parse time or itself a scalar load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    Const(i64),
    Load(LValue),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RValue {
    Const(i64),
    Load(LValue),
}

/// An arithmetic expression. The distilled grammar only ever nests one
/// level (`value op value`); this tree allows arbitrary nesting so that
/// ordinary precedence-climbing expressions parse, which the lowering
/// rules in `back::expr` already handle generically via recursion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(RValue),
    BinOp {
        op: BOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cond {
    pub rel: RelOp,
    pub lhs: RValue,
    pub rhs: RValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}
