//! Crate-wide error type.
//!
//! Every fatal diagnostic in this compiler names the offending identifier
//! (where one exists) and the source line it was reported against, per the
//! error handling design in the specification.

use crate::common::{Id, Line};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid character {ch:?} at byte offset {pos} (line {line})")]
    Lexer { ch: char, pos: usize, line: Line },

    #[error("parse error: {message} (line {line})")]
    Parse { message: String, line: Line },

    #[error("undeclared name {name} (line {line})")]
    UndeclaredName { name: Id, line: Line },

    #[error("redeclaration of {name} (line {line})")]
    Redeclaration { name: Id, line: Line },

    #[error("array {name} declared with size 0 (line {line})")]
    ZeroSizedArray { name: Id, line: Line },

    #[error("index {index} out of range for array {name} of size {size} (line {line})")]
    ArrayIndexOutOfRange {
        name: Id,
        index: i64,
        size: u32,
        line: Line,
    },

    #[error("use of uninitialized variable {name} (line {line})")]
    UninitializedUse { name: Id, line: Line },

    #[error("{name} used with the wrong shape (array vs. scalar) (line {line})")]
    ShapeMismatch { name: Id, line: Line },

    #[error("assignment to array {name} without an index (line {line})")]
    AssignToArrayWithoutIndex { name: Id, line: Line },

    #[error("call to undeclared procedure {name} (line {line})")]
    UnknownProcedure { name: Id, line: Line },

    #[error("procedure {name} expects {expected} argument(s), got {got} (line {line})")]
    ArgCountMismatch {
        name: Id,
        expected: usize,
        got: usize,
        line: Line,
    },

    #[error("argument {index} ('{arg}') to procedure {name} has the wrong shape (line {line})")]
    ArgKindMismatch {
        name: Id,
        arg: Id,
        index: usize,
        line: Line,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
