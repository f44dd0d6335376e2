//! The constant materializer: loading an integer literal into a register
//! via bit-shift construction, and caching literals written out by
//! `WRITE` in the shared constants region so a value repeated inside a
//! loop body is stored once rather than rebuilt every iteration.

use crate::common::Addr;

use super::context::CompileCtx;
use super::encoder::Encoder;
use super::instr::{Instr, Register};

impl Encoder {
    /// `RST reg`, then walk `value`'s bits most-significant first: `INC`
    /// before every `SHL` except the last, which only gets an `INC` if its
    /// bit is set. Cost is `O(log value)` instructions.
    pub fn materialize(&mut self, value: u32, reg: Register) {
        self.emit(Instr::Rst(reg));
        if value == 0 {
            return;
        }
        let bits = 32 - value.leading_zeros();
        for i in (1..bits).rev() {
            if (value >> i) & 1 == 1 {
                self.emit(Instr::Inc(reg));
            }
            self.emit(Instr::Shl(reg));
        }
        if value & 1 == 1 {
            self.emit(Instr::Inc(reg));
        }
    }

    /// Ensure `value` has a memory cell in the constants region holding
    /// it, allocating one and emitting the one-time store if this is the
    /// first time it's seen. Returns the cell's address either way.
    pub fn cache_const(&mut self, value: i64, ctx: &mut CompileCtx) -> Addr {
        if let Some(addr) = self.symbols.get_const(value) {
            return addr;
        }
        let addr = self.symbols.add_const(value, &mut ctx.consts_address);
        self.materialize(addr, Register::B);
        self.materialize(value.max(0) as u32, Register::C);
        self.emit(Instr::Get(Register::C));
        self.emit(Instr::Store(Register::B));
        addr
    }
}
