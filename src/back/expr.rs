//! The expression lowerer. Lowers `const`/`load`/`add`/`sub`/`mul`/`div`/
//! `mod` into instructions that leave the result in a designated target
//! register, applying constant folding and the strength reductions the
//! peephole rules describe before falling back to the general case.

use crate::front::{BOp, Expr, RValue};

use super::context::CompileCtx;
use super::encoder::Encoder;
use super::instr::{Instr, Register, Sentinel, Target};

const SECOND: Register = Register::C;
const THIRD: Register = Register::D;
const FOURTH: Register = Register::E;
const FIFTH: Register = Register::F;

impl Encoder {
    /// Lowers `expr` into `target`, free to clobber the module's default
    /// scratch register (`SECOND`) along the way. Use
    /// [`Encoder::lower_expr_scoped`] instead when the caller has already
    /// committed a live value to `SECOND` — a condition's right-hand side,
    /// computed after its left-hand side already occupies it, is exactly
    /// that case.
    pub fn lower_expr(&mut self, expr: &Expr, target: Register, ctx: &mut CompileCtx) {
        self.lower_expr_scoped(expr, target, SECOND, ctx);
    }

    /// Like `lower_expr`, but the caller names the register this call (and
    /// anything it recurses into) may use as its own scratch. Threading a
    /// distinct scratch register through each recursive call — rather than
    /// always reaching for the same fixed register — is what keeps a
    /// nested subexpression's own arithmetic from clobbering a value a
    /// sibling subexpression is still holding onto.
    pub fn lower_expr_scoped(&mut self, expr: &Expr, target: Register, scratch: Register, ctx: &mut CompileCtx) {
        match expr {
            Expr::Leaf(RValue::Const(n)) => {
                self.materialize(clamp(*n), target);
            }
            Expr::Leaf(RValue::Load(lvalue)) => {
                // A bare expression leaf load can't fail validation here:
                // the parser already resolved the lvalue's shape, and
                // `UndeclaredName`/`ShapeMismatch` would have surfaced as
                // a hard parse-time error for anything reaching this
                // point as the operand of an arithmetic expression.
                let line = ctx.current_line;
                let _ = self.load_lvalue(lvalue, target, scratch, line);
            }
            Expr::BinOp { op, lhs, rhs } => self.lower_binop(*op, lhs, rhs, target, scratch, ctx),
        }
    }

    fn lower_binop(
        &mut self,
        op: BOp,
        lhs: &Expr,
        rhs: &Expr,
        target: Register,
        scratch: Register,
        ctx: &mut CompileCtx,
    ) {
        if let (Some(a), Some(b)) = (const_value(lhs), const_value(rhs)) {
            let folded = match op {
                BOp::Add => a + b,
                BOp::Sub => (a - b).max(0),
                BOp::Mul => a * b,
                BOp::Div => if b > 0 { a / b } else { 0 },
                BOp::Mod => if b > 0 { a % b } else { 0 },
            };
            self.materialize(clamp(folded), target);
            return;
        }

        if lhs == rhs {
            match op {
                BOp::Add => {
                    self.lower_expr_scoped(lhs, target, scratch, ctx);
                    self.emit(Instr::Shl(target));
                }
                BOp::Sub => self.emit(Instr::Rst(target)),
                BOp::Mul => {
                    self.lower_expr_scoped(lhs, SECOND, target, ctx);
                    self.emit(Instr::Get(SECOND));
                    self.emit(Instr::Put(THIRD));
                    self.multiply(target, SECOND, THIRD);
                }
                BOp::Div => {
                    self.lower_expr_scoped(lhs, THIRD, scratch, ctx);
                    self.emit(Instr::Rst(target));
                    self.emit(Instr::Get(THIRD));
                    let skip = self.pc() + 2;
                    self.emit(Instr::Jzero(Target::Resolved(skip)));
                    self.emit(Instr::Inc(target));
                }
                BOp::Mod => self.emit(Instr::Rst(target)),
            }
            return;
        }

        // `(op, small constant, other)` shortcuts.
        let small_const = match (const_value(lhs), const_value(rhs)) {
            (Some(a), _) => Some((a, rhs, true)),
            (_, Some(b)) => Some((b, lhs, false)),
            _ => None,
        };

        if let Some((k, other, const_on_left)) = small_const {
            if self.lower_binop_with_const(op, k, other, const_on_left, target, scratch, ctx) {
                return;
            }
        }

        match op {
            BOp::Add => {
                self.lower_expr_scoped(lhs, target, scratch, ctx);
                self.lower_expr_scoped(rhs, scratch, THIRD, ctx);
                self.emit(Instr::Get(target));
                self.emit(Instr::Add(scratch));
                self.emit(Instr::Put(target));
            }
            BOp::Sub => {
                self.lower_expr_scoped(lhs, target, scratch, ctx);
                self.lower_expr_scoped(rhs, scratch, THIRD, ctx);
                self.emit(Instr::Get(target));
                self.emit(Instr::Sub(scratch));
                self.emit(Instr::Put(target));
            }
            BOp::Mul => {
                self.lower_expr_scoped(lhs, scratch, target, ctx);
                self.lower_expr_scoped(rhs, THIRD, target, ctx);
                self.multiply(target, scratch, THIRD);
            }
            BOp::Div => {
                self.lower_expr_scoped(lhs, THIRD, scratch, ctx);
                self.lower_expr_scoped(rhs, FOURTH, scratch, ctx);
                self.divide(target, scratch, THIRD, FOURTH);
            }
            BOp::Mod => {
                self.lower_expr_scoped(lhs, THIRD, scratch, ctx);
                self.lower_expr_scoped(rhs, FOURTH, scratch, ctx);
                self.divide(scratch, target, THIRD, FOURTH);
            }
        }
    }

    /// Returns `true` if it fully handled the operation.
    fn lower_binop_with_const(
        &mut self,
        op: BOp,
        k: i64,
        other: &Expr,
        const_on_left: bool,
        target: Register,
        scratch: Register,
        ctx: &mut CompileCtx,
    ) -> bool {
        match op {
            BOp::Add if k < 14 => {
                self.lower_expr_scoped(other, target, scratch, ctx);
                for _ in 0..k {
                    self.emit(Instr::Inc(target));
                }
                true
            }
            BOp::Sub if !const_on_left && k < 14 => {
                self.lower_expr_scoped(other, target, scratch, ctx);
                for _ in 0..k {
                    self.emit(Instr::Dec(target));
                }
                true
            }
            BOp::Sub if const_on_left && k == 0 => {
                self.emit(Instr::Rst(target));
                true
            }
            BOp::Mul if k == 0 => {
                self.emit(Instr::Rst(target));
                true
            }
            BOp::Mul if k == 1 => {
                self.lower_expr_scoped(other, target, scratch, ctx);
                true
            }
            BOp::Mul if is_power_of_two(k) => {
                self.lower_expr_scoped(other, target, scratch, ctx);
                for _ in 0..k.trailing_zeros() {
                    self.emit(Instr::Shl(target));
                }
                true
            }
            BOp::Div if const_on_left && k == 0 => {
                self.emit(Instr::Rst(target));
                true
            }
            BOp::Div if !const_on_left && k == 0 => {
                self.emit(Instr::Rst(target));
                true
            }
            BOp::Div if !const_on_left && k == 1 => {
                self.lower_expr_scoped(other, target, scratch, ctx);
                true
            }
            BOp::Div if !const_on_left && is_power_of_two(k) => {
                self.lower_expr_scoped(other, target, scratch, ctx);
                for _ in 0..k.trailing_zeros() {
                    self.emit(Instr::Shr(target));
                }
                true
            }
            BOp::Mod if const_on_left && k == 0 => {
                self.emit(Instr::Rst(target));
                true
            }
            BOp::Mod if !const_on_left && (k == 0 || k == 1) => {
                self.emit(Instr::Rst(target));
                true
            }
            BOp::Mod if !const_on_left && k == 2 => {
                self.lower_expr_scoped(other, scratch, target, ctx);
                self.emit(Instr::Rst(target));
                self.emit(Instr::Get(scratch));
                self.emit(Instr::Shr(scratch));
                self.emit(Instr::Shl(scratch));
                self.emit(Instr::Sub(scratch));
                let to_inc = self.pc() + 2;
                self.emit(Instr::Jpos(Target::Resolved(to_inc)));
                let to_end = self.pc() + 2;
                self.emit(Instr::Jump(Target::Resolved(to_end)));
                self.emit(Instr::Inc(target));
                true
            }
            _ => false,
        }
    }

    /// Shift-and-add multiplication. `a`/`b` already hold the two operand
    /// values; `target` receives the product. Either operand being zero
    /// short-circuits to a plain reset; otherwise the larger operand is
    /// picked as the running addend and the smaller as the down-counter,
    /// halved every iteration while the addend doubles.
    fn multiply(&mut self, target: Register, a: Register, b: Register) {
        self.emit(Instr::Get(a));
        let jz_a = self.reserve();
        self.emit(Instr::Get(b));
        let jz_b = self.reserve();

        self.emit(Instr::Get(a));
        self.emit(Instr::Sub(b));
        let jz_a_le_b = self.reserve();

        // a > b: a is the addend, b the counter.
        self.emit(Instr::Rst(target));
        self.run_shift_add_loop(target, a, b);
        let jump_past_second = self.reserve();

        let second_branch = self.pc();
        self.emit(Instr::Rst(target));
        self.run_shift_add_loop(target, b, a);
        let jump_past_zero = self.reserve();

        let zero_branch = self.pc();
        self.emit(Instr::Rst(target));
        let end = self.pc();

        self.patch_jump_at(jz_a, Instr::Jzero(Target::Resolved(zero_branch)));
        self.patch_jump_at(jz_b, Instr::Jzero(Target::Resolved(zero_branch)));
        self.patch_jump_at(jz_a_le_b, Instr::Jzero(Target::Resolved(second_branch)));
        self.patch_jump_at(jump_past_second, Instr::Jump(Target::Resolved(end)));
        self.patch_jump_at(jump_past_zero, Instr::Jump(Target::Resolved(end)));
    }

    /// Reserves a slot for a jump instruction whose target isn't known
    /// yet, returning its local index for `patch_jump_at`.
    fn reserve(&mut self) -> usize {
        let idx = self.instrs.len();
        self.emit(Instr::Halt);
        idx
    }

    fn patch_jump_at(&mut self, idx: usize, instr: Instr) {
        self.instrs[idx] = instr;
    }

    /// `acc` is doubled and `counter` halved each iteration; while
    /// `counter` is odd, `target` accumulates `acc`. Runs until `counter`
    /// reaches zero.
    fn run_shift_add_loop(&mut self, target: Register, acc: Register, counter: Register) {
        let top = self.pc();
        self.emit(Instr::Get(counter));
        let jz_done = self.reserve();

        self.emit(Instr::Put(FIFTH));
        self.emit(Instr::Shr(counter));
        self.emit(Instr::Shl(counter));
        self.emit(Instr::Sub(counter));
        let jpos_odd = self.reserve();
        let jump_even = self.reserve();

        let odd_branch = self.pc();
        self.emit(Instr::Get(target));
        self.emit(Instr::Add(acc));
        self.emit(Instr::Put(target));
        let even_branch = self.pc();
        self.emit(Instr::Get(FIFTH));
        self.emit(Instr::Put(counter));
        self.emit(Instr::Shr(counter));
        self.emit(Instr::Shl(acc));
        self.emit(Instr::Rst(Register::A));
        self.emit(Instr::Jump(Target::Resolved(top)));
        let exit = self.pc();

        self.patch_jump_at(jz_done, Instr::Jzero(Target::Resolved(exit)));
        self.patch_jump_at(jpos_odd, Instr::Jpos(Target::Resolved(odd_branch)));
        self.patch_jump_at(jump_even, Instr::Jump(Target::Resolved(even_branch)));
    }

    /// Long division/modulus: emits the `start`/`block_start`/
    /// `midblock_start`/`finish` routine and resolves all three sentinels
    /// before returning. `finish` here is local to this routine, unlike a
    /// condition's `finish`, and never escapes to the caller.
    fn divide(&mut self, q: Register, r: Register, n: Register, d: Register) {
        use Register::A;

        let start = self.instrs.len();
        self.emit(Instr::Rst(q));
        self.emit(Instr::Rst(r));
        self.emit(Instr::Get(d));
        self.emit(Instr::Jzero(Target::Pending(Sentinel::Finish)));
        self.emit(Instr::Get(r));
        self.emit(Instr::Add(n));
        self.emit(Instr::Put(r));
        self.emit(Instr::Rst(A));
        self.emit(Instr::Add(d));
        self.emit(Instr::Put(n));
        self.emit(Instr::Rst(A));
        self.emit(Instr::Add(r));
        self.emit(Instr::Sub(n));
        self.emit(Instr::Jzero(Target::Pending(Sentinel::BlockStart)));

        let ramp_start = self.pc();
        self.emit(Instr::Rst(A));
        self.emit(Instr::Add(n));
        self.emit(Instr::Sub(r));
        let k = self.pc();
        self.emit(Instr::Jzero(Target::Resolved(k + 3)));
        self.emit(Instr::Shr(n));
        let k2 = self.pc();
        self.emit(Instr::Jump(Target::Resolved(k2 + 3)));
        self.emit(Instr::Shl(n));
        let k3 = self.pc();
        self.emit(Instr::Jump(Target::Resolved(k3 - 7)));
        let _ = ramp_start;

        let block_start_pc = self.pc();
        self.emit(Instr::Rst(A));
        self.emit(Instr::Add(n));
        self.emit(Instr::Sub(r));
        let k4 = self.pc();
        self.emit(Instr::Jzero(Target::Resolved(k4 + 2)));
        self.emit(Instr::Jump(Target::Pending(Sentinel::Finish)));
        self.emit(Instr::Get(r));
        self.emit(Instr::Sub(n));
        self.emit(Instr::Put(r));
        self.emit(Instr::Inc(q));

        let midblock_start_pc = self.pc();
        self.emit(Instr::Rst(A));
        self.emit(Instr::Add(n));
        self.emit(Instr::Sub(r));
        self.emit(Instr::Jzero(Target::Pending(Sentinel::BlockStart)));
        self.emit(Instr::Shr(n));
        self.emit(Instr::Rst(A));
        self.emit(Instr::Add(d));
        self.emit(Instr::Sub(n));
        let k5 = self.pc();
        self.emit(Instr::Jzero(Target::Resolved(k5 + 2)));
        self.emit(Instr::Jump(Target::Pending(Sentinel::Finish)));
        self.emit(Instr::Shl(q));
        self.emit(Instr::Jump(Target::Resolved(midblock_start_pc)));

        let end = self.instrs.len();
        let finish_pc = self.pc();
        self.patch(start..end, Sentinel::BlockStart, block_start_pc);
        self.patch(start..end, Sentinel::MidblockStart, midblock_start_pc);
        self.patch(start..end, Sentinel::Finish, finish_pc);
    }
}

fn const_value(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Leaf(RValue::Const(n)) => Some(*n),
        _ => None,
    }
}

fn is_power_of_two(k: i64) -> bool {
    k > 0 && (k & (k - 1)) == 0
}

fn clamp(n: i64) -> u32 {
    n.max(0) as u32
}
