//! An encoder is a code-generator instance bound to either the main
//! program or one procedure. Procedures are never generated ahead of
//! time: a procedure's instructions only exist transiently, during the
//! one call currently being inlined, and are cleared immediately after
//! being copied into the caller (see `back::inline`).

use crate::common::{Addr, Line};
use crate::error::Error;
use crate::front::{Decl, MainDecl, Param, ProcDecl, TokenKind};

use super::context::CompileCtx;
use super::instr::{patch, Instr, Sentinel};
use super::symbol::SymbolTable;

pub struct Encoder {
    pub symbols: SymbolTable,
    pub instrs: Vec<Instr>,
    /// Absolute PC of `instrs[0]`. Nonzero while a procedure's body is
    /// being inlined at some position in the caller's stream.
    pub code_offset: Addr,
    /// Depth of `if`/`while`/`repeat` nesting currently being lowered.
    /// Kept as a counter, not a flag, so leaving an inner conditional
    /// doesn't prematurely clear the outer one's relaxed initialization
    /// check.
    loop_depth: u32,
}

impl Encoder {
    pub fn from_procedure(proc: &ProcDecl) -> Result<Self, Error> {
        let mut symbols = SymbolTable::new();
        symbols.name = Some(proc.name);
        symbols.lineno = proc.lineno;
        for param in &proc.params {
            match param {
                Param::Scalar(name) => symbols.add_args_variable(*name),
                Param::Array(name) => symbols.add_args_array(*name),
            }
        }
        for decl in &proc.decls {
            declare(&mut symbols, decl, proc.lineno)?;
        }
        Ok(Encoder { symbols, instrs: Vec::new(), code_offset: 0, loop_depth: 0 })
    }

    pub fn from_main(main: &MainDecl) -> Result<Self, Error> {
        let mut symbols = SymbolTable::new();
        symbols.lineno = main.lineno;
        for decl in &main.decls {
            declare(&mut symbols, decl, main.lineno)?;
        }
        Ok(Encoder { symbols, instrs: Vec::new(), code_offset: 0, loop_depth: 0 })
    }

    pub fn pc(&self) -> Addr {
        self.instrs.len() as Addr + self.code_offset
    }

    pub fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    pub fn patch(&mut self, range: std::ops::Range<usize>, sentinel: Sentinel, pc: Addr) {
        patch(&mut self.instrs[range], sentinel, pc);
    }

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn leave_loop(&mut self) {
        self.loop_depth -= 1;
    }
}

fn declare(symbols: &mut SymbolTable, decl: &Decl, line: Line) -> Result<(), Error> {
    match decl {
        Decl::Scalar(name) => symbols.add_variable(*name, line),
        Decl::Array(name, size) => symbols.add_array(*name, *size, line),
    }
}

/// Generate the whole program and render it to one instruction per line.
pub fn compile(
    procedures: &[ProcDecl],
    main: &MainDecl,
    program_lines: Vec<(TokenKind, Line)>,
) -> Result<Vec<String>, Error> {
    let mut ctx = CompileCtx::new(program_lines);
    let mut proc_encoders: Vec<Encoder> =
        procedures.iter().map(Encoder::from_procedure).collect::<Result<_, _>>()?;
    let mut main_encoder = Encoder::from_main(main)?;

    // Constants live above everything main declared; procedures lay out
    // their own locals starting at address 0 again, mirroring the
    // original compiler's per-frame offset reset (no activation records
    // means each procedure's locals only exist transiently, inlined at
    // the call site, so this never collides with live data).
    ctx.consts_address = main_encoder.symbols.memory_offset + 1;

    main_encoder.compile_block(&main.body, &mut ctx, &mut proc_encoders, procedures)?;
    main_encoder.emit(Instr::Halt);

    Ok(main_encoder.instrs.iter().map(Instr::render).collect())
}
