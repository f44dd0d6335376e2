//! The condition lowerer. Lowered code's contract: fall through when the
//! condition is true, jump to the pending `finish` sentinel when false —
//! so a caller that wants "run this body when true" just emits the body
//! right after and later patches `finish` to land past it.

use crate::front::{Cond, RValue, RelOp};

use super::context::CompileCtx;
use super::encoder::Encoder;
use super::instr::{Instr, Register, Sentinel, Target};

/// Result of compile-time simplification.
pub enum Simplified {
    Bool(bool),
    Runtime(Cond),
}

/// `simplify_condition`: fold what can be decided without emitting any
/// code. Relies on the target VM never holding a negative number.
pub fn simplify(cond: &Cond) -> Simplified {
    use RelOp::*;

    if let (RValue::Const(a), RValue::Const(b)) = (&cond.lhs, &cond.rhs) {
        let result = match cond.rel {
            Le => a <= b,
            Ge => a >= b,
            Lt => a < b,
            Gt => a > b,
            Eq => a == b,
            Ne => a != b,
        };
        return Simplified::Bool(result);
    }

    if let RValue::Const(0) = cond.lhs {
        match cond.rel {
            Le => return Simplified::Bool(true),
            Gt => return Simplified::Bool(false),
            _ => {}
        }
    }

    if let RValue::Const(0) = cond.rhs {
        match cond.rel {
            Ge => return Simplified::Bool(true),
            Lt => return Simplified::Bool(false),
            _ => {}
        }
    }

    if cond.lhs == cond.rhs {
        let result = matches!(cond.rel, Ge | Le | Eq);
        return Simplified::Bool(result);
    }

    Simplified::Runtime(cond.clone())
}

const FIRST: Register = Register::B;
const SECOND: Register = Register::C;
const THIRD: Register = Register::D;

impl Encoder {
    /// Emit the runtime-checked form of a condition that `simplify`
    /// couldn't fold away. Every emitted jump targets either an absolute
    /// PC already known (a two- or four-instruction hop forward in this
    /// same sequence) or the pending `Finish` sentinel, patched later by
    /// the statement lowerer once it knows where the guarded body ends.
    pub fn lower_condition(&mut self, cond: &Cond, ctx: &mut CompileCtx) {
        use RelOp::*;

        if let RValue::Const(0) = cond.lhs {
            self.lower_expr(&as_expr(&cond.rhs), FIRST, ctx);
            self.emit(Instr::Get(FIRST));
            match cond.rel {
                Ge | Eq => self.jump_finish_unless_zero(),
                Lt | Ne => self.jump_finish_if_zero(),
                _ => unreachable!("0 {:?} rhs should have been simplified away", cond.rel),
            }
            return;
        }

        if let RValue::Const(0) = cond.rhs {
            self.lower_expr(&as_expr(&cond.lhs), FIRST, ctx);
            self.emit(Instr::Get(FIRST));
            match cond.rel {
                Le | Eq => self.jump_finish_unless_zero(),
                Gt | Ne => self.jump_finish_if_zero(),
                _ => unreachable!("lhs {:?} 0 should have been simplified away", cond.rel),
            }
            return;
        }

        // Both operands get their own internal scratch need pinned to
        // `THIRD`, never `SECOND` — the right-hand side's target register.
        // Reusing `SECOND` here would let the right-hand side's own
        // subexpression (e.g. an array index computation) clobber itself
        // the moment `target == scratch`.
        self.lower_expr_scoped(&as_expr(&cond.lhs), FIRST, THIRD, ctx);
        self.lower_expr_scoped(&as_expr(&cond.rhs), SECOND, THIRD, ctx);

        match cond.rel {
            // first - second (saturating): zero iff first <= second.
            Le => {
                self.emit(Instr::Get(FIRST));
                self.emit(Instr::Sub(SECOND));
                self.jump_finish_unless_zero();
            }
            // second - first: zero iff first >= second.
            Ge => {
                self.emit(Instr::Get(SECOND));
                self.emit(Instr::Sub(FIRST));
                self.jump_finish_unless_zero();
            }
            // second - first: zero iff first >= second, i.e. not (first < second).
            Lt => {
                self.emit(Instr::Get(SECOND));
                self.emit(Instr::Sub(FIRST));
                self.jump_finish_if_zero();
            }
            Gt => {
                self.emit(Instr::Get(FIRST));
                self.emit(Instr::Sub(SECOND));
                self.jump_finish_if_zero();
            }
            Eq => {
                self.emit(Instr::Get(FIRST));
                self.emit(Instr::Sub(SECOND));
                self.jump_finish_unless_zero();
                self.emit(Instr::Get(SECOND));
                self.emit(Instr::Sub(FIRST));
                self.jump_finish_unless_zero();
            }
            Ne => {
                self.emit(Instr::Get(FIRST));
                self.emit(Instr::Sub(SECOND));
                // Nonzero already proves inequality: skip the symmetric
                // check entirely and fall through as true.
                let jzero_pc = self.pc();
                self.emit(Instr::Jzero(Target::Resolved(jzero_pc + 2)));
                let jump_pc = self.pc();
                self.emit(Instr::Jump(Target::Resolved(jump_pc + 4)));
                self.emit(Instr::Get(SECOND));
                self.emit(Instr::Sub(FIRST));
                self.jump_finish_if_zero();
            }
        }
    }

    /// The accumulator holds a value that should fall through (continue)
    /// when zero and jump to `finish` otherwise.
    fn jump_finish_unless_zero(&mut self) {
        let skip_to = self.pc() + 2;
        self.emit(Instr::Jzero(Target::Resolved(skip_to)));
        self.emit(Instr::Jump(Target::Pending(Sentinel::Finish)));
    }

    /// The accumulator holds a value that should jump to `finish` when
    /// zero and fall through otherwise.
    fn jump_finish_if_zero(&mut self) {
        self.emit(Instr::Jzero(Target::Pending(Sentinel::Finish)));
    }
}

fn as_expr(rvalue: &RValue) -> crate::front::Expr {
    crate::front::Expr::Leaf(rvalue.clone())
}
