//! The statement lowerer: walks a parsed body and emits one statement at
//! a time, threading line tracking and loop-depth bookkeeping through
//! nested conditionals and loops.

use crate::common::Set;
use crate::error::Error;
use crate::front::{LValue, ProcDecl, RValue, Stmt, TokenKind};

use super::cond::{simplify, Simplified};
use super::context::CompileCtx;
use super::encoder::Encoder;
use super::instr::{Instr, Register, Sentinel, Target};

const FIRST: Register = Register::B;
const SECOND: Register = Register::C;
const THIRD: Register = Register::D;

impl Encoder {
    pub fn compile_block(
        &mut self,
        stmts: &[Stmt],
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        for stmt in stmts {
            self.compile_stmt(stmt, ctx, visible, proc_bodies)?;
        }
        Ok(())
    }

    fn compile_stmt(
        &mut self,
        stmt: &Stmt,
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        match stmt {
            Stmt::Write(rvalue) => self.compile_write(rvalue, ctx),
            Stmt::Read(lvalue) => self.compile_read(lvalue, ctx),
            Stmt::Assign(lvalue, expr) => self.compile_assign(lvalue, expr, ctx),
            Stmt::If { cond, body, consts } => {
                ctx.advance_to(TokenKind::If);
                self.enter_loop();
                let result = self.compile_if(cond, body, consts, ctx, visible, proc_bodies);
                self.leave_loop();
                result
            }
            Stmt::IfElse { cond, tt, ff, consts } => {
                ctx.advance_to(TokenKind::If);
                self.enter_loop();
                let result = self.compile_ifelse(cond, tt, ff, consts, ctx, visible, proc_bodies);
                self.leave_loop();
                result
            }
            Stmt::While { cond, body, consts } => {
                ctx.advance_to(TokenKind::While);
                self.enter_loop();
                let result = self.compile_while(cond, body, consts, ctx, visible, proc_bodies);
                self.leave_loop();
                result
            }
            Stmt::Until { cond, body } => {
                ctx.advance_to(TokenKind::Repeat);
                self.enter_loop();
                let result = self.compile_until(cond, body, ctx, visible, proc_bodies);
                self.leave_loop();
                result
            }
            Stmt::ProcCall { name, args, line } => {
                self.compile_proc_call(*name, args, *line, ctx, visible, proc_bodies)
            }
        }
    }

    fn compile_write(&mut self, rvalue: &RValue, ctx: &mut CompileCtx) -> Result<(), Error> {
        let line = ctx.advance_to(TokenKind::Write);
        match rvalue {
            RValue::Const(value) => {
                let addr = self.cache_const(*value, ctx);
                self.materialize(addr, FIRST);
                self.emit(Instr::Load(FIRST));
            }
            RValue::Load(lvalue) => {
                self.load_lvalue(lvalue, FIRST, SECOND, line)?;
            }
        }
        self.emit(Instr::Write);
        Ok(())
    }

    fn compile_read(&mut self, lvalue: &LValue, ctx: &mut CompileCtx) -> Result<(), Error> {
        let line = ctx.advance_to(TokenKind::Read);
        self.address_of_lvalue(lvalue, FIRST, SECOND, line)?;
        self.emit(Instr::Read);
        self.emit(Instr::Store(FIRST));
        if let LValue::Name(name) = lvalue {
            self.symbols.mark_initialized(*name);
        }
        Ok(())
    }

    fn compile_assign(
        &mut self,
        lvalue: &LValue,
        expr: &crate::front::Expr,
        ctx: &mut CompileCtx,
    ) -> Result<(), Error> {
        let line = ctx.advance_to(TokenKind::Pid);
        self.lower_expr(expr, FIRST, ctx);
        match lvalue {
            LValue::Name(name) => {
                self.check_not_array(*name, line)?;
                self.address_of_scalar(*name, SECOND, line)?;
                self.symbols.mark_initialized(*name);
            }
            LValue::ArrayElem(array, index) => {
                self.address_of_array_element(*array, index, SECOND, THIRD, line)?;
            }
            LValue::Undeclared(name) => {
                return Err(Error::UndeclaredName { name: *name, line });
            }
        }
        self.emit(Instr::Get(FIRST));
        self.emit(Instr::Store(SECOND));
        Ok(())
    }

    fn compile_if(
        &mut self,
        cond: &crate::front::Cond,
        body: &[Stmt],
        consts: &Set<i64>,
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        match simplify(cond) {
            Simplified::Bool(true) => self.compile_block(body, ctx, visible, proc_bodies),
            Simplified::Bool(false) => Ok(()),
            Simplified::Runtime(cond) => {
                self.prepare_consts_before_block(consts, ctx);
                let condition_start = self.instrs.len();
                self.lower_condition(&cond, ctx);
                let command_start = self.instrs.len();
                self.compile_block(body, ctx, visible, proc_bodies)?;
                let command_end = self.pc();
                self.patch(condition_start..command_start, Sentinel::Finish, command_end);
                Ok(())
            }
        }
    }

    fn compile_ifelse(
        &mut self,
        cond: &crate::front::Cond,
        tt: &[Stmt],
        ff: &[Stmt],
        consts: &Set<i64>,
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        match simplify(cond) {
            Simplified::Bool(true) => self.compile_block(tt, ctx, visible, proc_bodies),
            Simplified::Bool(false) => self.compile_block(ff, ctx, visible, proc_bodies),
            Simplified::Runtime(cond) => {
                self.prepare_consts_before_block(consts, ctx);
                let condition_start = self.instrs.len();
                self.lower_condition(&cond, ctx);
                let if_start = self.instrs.len();
                self.compile_block(tt, ctx, visible, proc_bodies)?;
                let skip_else = self.instrs.len();
                self.emit(Instr::Jump(Target::Pending(Sentinel::Finish)));
                let else_start = self.pc();
                self.compile_block(ff, ctx, visible, proc_bodies)?;
                let command_end = self.pc();
                self.patch(skip_else..skip_else + 1, Sentinel::Finish, command_end);
                self.patch(condition_start..if_start, Sentinel::Finish, else_start);
                Ok(())
            }
        }
    }

    fn compile_while(
        &mut self,
        cond: &crate::front::Cond,
        body: &[Stmt],
        consts: &Set<i64>,
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        match simplify(cond) {
            Simplified::Bool(true) => {
                self.prepare_consts_before_block(consts, ctx);
                let loop_start = self.pc();
                self.compile_block(body, ctx, visible, proc_bodies)?;
                self.emit(Instr::Jump(Target::Resolved(loop_start)));
                Ok(())
            }
            Simplified::Bool(false) => Ok(()),
            Simplified::Runtime(cond) => {
                self.prepare_consts_before_block(consts, ctx);
                let condition_start = self.instrs.len();
                let condition_start_pc = self.pc();
                self.lower_condition(&cond, ctx);
                let loop_start = self.instrs.len();
                self.compile_block(body, ctx, visible, proc_bodies)?;
                self.emit(Instr::Jump(Target::Resolved(condition_start_pc)));
                let loop_end = self.pc();
                self.patch(condition_start..loop_start, Sentinel::Finish, loop_end);
                Ok(())
            }
        }
    }

    /// Unlike `if`/`while`, the original never constant-folds a
    /// `repeat ... until` condition — preserved here rather than
    /// "fixed", since nothing depends on the asymmetry being wrong.
    fn compile_until(
        &mut self,
        cond: &crate::front::Cond,
        body: &[Stmt],
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        let loop_start = self.pc();
        self.compile_block(body, ctx, visible, proc_bodies)?;
        let condition_start = self.instrs.len();
        self.lower_condition(cond, ctx);
        let condition_end = self.instrs.len();
        self.patch(condition_start..condition_end, Sentinel::Finish, loop_start);
        Ok(())
    }

    fn prepare_consts_before_block(&mut self, consts: &Set<i64>, ctx: &mut CompileCtx) {
        for value in consts {
            self.cache_const(*value, ctx);
        }
    }
}
