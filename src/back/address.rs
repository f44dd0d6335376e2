//! The address resolver: placing the absolute memory address — or, when
//! dereferenced, the value — of a named variable or array element into a
//! register.

use crate::common::{Id, Line};
use crate::error::Error;
use crate::front::{Index, LValue};

use super::encoder::Encoder;
use super::instr::{Instr, Register};

impl Encoder {
    pub fn address_of_scalar(&mut self, name: Id, reg: Register, line: Line) -> Result<(), Error> {
        let addr = self.symbols.address_of_scalar(name, line)?;
        self.materialize(addr, reg);
        Ok(())
    }

    /// `reg1` receives the element's address. `reg2` is scratch, used only
    /// when the index itself has to be loaded from a variable.
    pub fn address_of_array_element(
        &mut self,
        array: Id,
        index: &Index,
        reg1: Register,
        reg2: Register,
        line: Line,
    ) -> Result<(), Error> {
        match index {
            Index::Const(i) => {
                let addr = self.symbols.address_of_array_elem(array, *i, line)?;
                self.materialize(addr, reg1);
            }
            Index::Load(lvalue) => {
                let idx_name = scalar_name(lvalue, line)?;
                self.require_initialized(idx_name, line)?;
                self.address_of_scalar(idx_name, reg1, line)?;
                self.emit(Instr::Load(reg1));
                self.emit(Instr::Put(reg1));
                let (base, _size) = self.symbols.array_layout(array, line)?;
                self.materialize(base, reg2);
                self.emit(Instr::Get(reg1));
                self.emit(Instr::Add(reg2));
                self.emit(Instr::Put(reg1));
            }
        }
        Ok(())
    }

    pub fn address_of_lvalue(
        &mut self,
        lvalue: &LValue,
        reg1: Register,
        reg2: Register,
        line: Line,
    ) -> Result<(), Error> {
        match lvalue {
            LValue::Name(name) => self.address_of_scalar(*name, reg1, line),
            LValue::ArrayElem(array, index) => {
                self.address_of_array_element(*array, index, reg1, reg2, line)
            }
            LValue::Undeclared(name) => Err(Error::UndeclaredName { name: *name, line }),
        }
    }

    /// Address plus dereference: `reg1` ends up holding the value, not the
    /// address. Used by `read`-free loads (expression leaves, `write`).
    pub fn load_lvalue(
        &mut self,
        lvalue: &LValue,
        reg1: Register,
        reg2: Register,
        line: Line,
    ) -> Result<(), Error> {
        if let LValue::Name(name) = lvalue {
            self.require_initialized(*name, line)?;
        }
        self.address_of_lvalue(lvalue, reg1, reg2, line)?;
        self.emit(Instr::Load(reg1));
        self.emit(Instr::Put(reg1));
        Ok(())
    }

    /// A scalar target used outside an index position (plain `PID`)
    /// assigned to must not actually name an array.
    pub fn check_not_array(&self, name: Id, line: Line) -> Result<(), Error> {
        if let Some(sym) = self.symbols.symbol(name) {
            if sym.is_array() {
                return Err(Error::AssignToArrayWithoutIndex { name, line });
            }
        }
        Ok(())
    }

    /// Using an uninitialized scalar is fatal outside a loop/conditional
    /// body and a warning inside one (an assignment on one path may have
    /// initialized it for the next iteration).
    pub fn require_initialized(&self, name: Id, line: Line) -> Result<(), Error> {
        if let Some(sym) = self.symbols.symbol(name) {
            if !sym.is_initialized() {
                if self.in_loop() {
                    tracing::warn!(%name, line, "variable may not have been initialized");
                } else {
                    return Err(Error::UninitializedUse { name, line });
                }
            }
        }
        Ok(())
    }
}

fn scalar_name(lvalue: &LValue, line: Line) -> Result<Id, Error> {
    match lvalue {
        LValue::Name(name) => Ok(*name),
        LValue::Undeclared(name) => Err(Error::UndeclaredName { name: *name, line }),
        LValue::ArrayElem(name, _) => Err(Error::ShapeMismatch { name: *name, line }),
    }
}
