//! Compilation-wide state, reified as fields on a context struct instead of
//! process globals so a test process can compile many programs in a row.

use crate::common::{Addr, Line};
use crate::front::TokenKind;

pub struct CompileCtx {
    /// `(token kind, source line)` for the first token on every line that
    /// carries one, in source order. Used only to recover a line number
    /// for diagnostics during code generation.
    program_lines: Vec<(TokenKind, Line)>,
    /// Index into `program_lines` of the next unconsumed entry.
    cursor: usize,
    /// The line a diagnostic raised right now should be blamed on.
    pub current_line: Line,
    /// Next free address in the constants region, shared by every encoder.
    pub consts_address: Addr,
}

impl CompileCtx {
    pub fn new(program_lines: Vec<(TokenKind, Line)>) -> Self {
        CompileCtx { program_lines, cursor: 0, current_line: 1, consts_address: 0 }
    }

    /// Advance `current_line` to the next occurrence of `kind` at or after
    /// the cursor, consuming it. Falls back to leaving the cursor alone
    /// (keeping the last known line) if `kind` never recurs — this only
    /// happens for malformed input that would already have failed parsing.
    pub fn advance_to(&mut self, kind: TokenKind) -> Line {
        if let Some(i) = self.program_lines[self.cursor..]
            .iter()
            .position(|(k, _)| *k == kind)
        {
            let (_, line) = self.program_lines[self.cursor + i];
            self.cursor += i + 1;
            self.current_line = line;
        }
        self.current_line
    }

    pub fn set_line(&mut self, line: Line) {
        self.current_line = line;
    }
}
