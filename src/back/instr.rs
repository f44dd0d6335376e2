//! The target instruction set.

use derive_more::Display;

use crate::common::Addr;

/// A VM register. `A` is the accumulator: the only source/sink for
/// `ADD`/`SUB`/`LOAD`/`STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Register {
    #[display("a")]
    A,
    #[display("b")]
    B,
    #[display("c")]
    C,
    #[display("d")]
    D,
    #[display("e")]
    E,
    #[display("f")]
    F,
}

/// A forward jump target that isn't known yet.
///
/// Kept as a structured record rather than a string placeholder: each
/// pending instruction names which labeled region it jumps to, and
/// `Encoder::patch` rewrites matching entries in place once that region's
/// program counter is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Finish,
    BlockStart,
    MidblockStart,
}

/// Where a `JUMP`/`JZERO`/`JPOS` lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Pending(Sentinel),
    Resolved(Addr),
}

impl Target {
    pub fn is_pending(&self, sentinel: Sentinel) -> bool {
        matches!(self, Target::Pending(s) if *s == sentinel)
    }
}

/// One machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Rst(Register),
    Inc(Register),
    Dec(Register),
    Shl(Register),
    Shr(Register),
    Get(Register),
    Put(Register),
    Add(Register),
    Sub(Register),
    Load(Register),
    Store(Register),
    Read,
    Write,
    Jump(Target),
    Jzero(Target),
    Jpos(Target),
    Halt,
}

impl Instr {
    /// Render as the one-instruction-per-line text the VM reads.
    ///
    /// Panics if a sentinel is still pending: by the time the top-level
    /// encoder finishes, every jump must have been patched to an absolute
    /// PC, so reaching this with a `Target::Pending` means a backpatching
    /// bug, not a user-facing error.
    pub fn render(&self) -> String {
        let resolved = |t: &Target| match t {
            Target::Resolved(pc) => *pc,
            Target::Pending(s) => unreachable!("unresolved jump target {s:?} at emission time"),
        };
        match self {
            Instr::Rst(r) => format!("RST {r}"),
            Instr::Inc(r) => format!("INC {r}"),
            Instr::Dec(r) => format!("DEC {r}"),
            Instr::Shl(r) => format!("SHL {r}"),
            Instr::Shr(r) => format!("SHR {r}"),
            Instr::Get(r) => format!("GET {r}"),
            Instr::Put(r) => format!("PUT {r}"),
            Instr::Add(r) => format!("ADD {r}"),
            Instr::Sub(r) => format!("SUB {r}"),
            Instr::Load(r) => format!("LOAD {r}"),
            Instr::Store(r) => format!("STORE {r}"),
            Instr::Read => "READ".to_string(),
            Instr::Write => "WRITE".to_string(),
            Instr::Jump(t) => format!("JUMP {}", resolved(t)),
            Instr::Jzero(t) => format!("JZERO {}", resolved(t)),
            Instr::Jpos(t) => format!("JPOS {}", resolved(t)),
            Instr::Halt => "HALT".to_string(),
        }
    }

    fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Instr::Jump(t) | Instr::Jzero(t) | Instr::Jpos(t) => Some(t),
            _ => None,
        }
    }
}

/// Replace every instruction in `instrs[range]` whose target is pending on
/// `sentinel` with `pc`.
pub fn patch(instrs: &mut [Instr], sentinel: Sentinel, pc: Addr) {
    for instr in instrs {
        if let Some(target) = instr.target_mut() {
            if target.is_pending(sentinel) {
                *target = Target::Resolved(pc);
            }
        }
    }
}
