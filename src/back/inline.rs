//! The procedure inliner: instead of a call stack, every call re-emits
//! the callee's body in place, rebinding its by-reference parameters to
//! the caller's argument addresses first. A callee's instruction buffer
//! only exists for the duration of one call — it's drained into the
//! caller immediately after and left empty.

use crate::common::{Id, Line};
use crate::error::Error;
use crate::front::ProcDecl;

use super::context::CompileCtx;
use super::encoder::Encoder;

impl Encoder {
    /// `visible`/`proc_bodies` are parallel slices of every procedure
    /// declared strictly before the one currently being compiled (the
    /// language has no forward declarations and no recursion, so this is
    /// always enough to resolve a call).
    pub fn compile_proc_call(
        &mut self,
        name: Id,
        args: &[Id],
        line: Line,
        ctx: &mut CompileCtx,
        visible: &mut [Encoder],
        proc_bodies: &[ProcDecl],
    ) -> Result<(), Error> {
        let index = proc_bodies
            .iter()
            .position(|p| p.name == name)
            .ok_or(Error::UnknownProcedure { name, line })?;

        for (i, arg_name) in args.iter().enumerate() {
            let caller_is_array = self
                .symbols
                .symbol(*arg_name)
                .ok_or(Error::UndeclaredName { name: *arg_name, line })?
                .is_array();
            let callee_param = visible[index].symbols.args[i];
            let callee_is_array = visible[index]
                .symbols
                .symbol(callee_param)
                .expect("procedure parameters are registered when its encoder is built")
                .is_array();
            if caller_is_array != callee_is_array {
                return Err(Error::ArgKindMismatch { name, arg: *arg_name, index: i, line });
            }
            if caller_is_array {
                let (addr, size) = self.symbols.array_layout(*arg_name, line)?;
                visible[index].symbols.set_args_array_address_and_size(i, addr, size);
            } else {
                let addr = self.symbols.address_of_scalar(*arg_name, line)?;
                visible[index].symbols.set_args_variable_address(i, addr);
            }
        }

        let caller_line = ctx.current_line;
        ctx.set_line(proc_bodies[index].lineno);

        visible[index].code_offset = self.pc();
        let (earlier, rest) = visible.split_at_mut(index);
        let callee = &mut rest[0];
        callee.compile_block(&proc_bodies[index].body, ctx, earlier, &proc_bodies[..index])?;

        // A scalar argument the caller hadn't initialized yet might have
        // been initialized by the callee (e.g. an out-parameter): thread
        // that back so code after the call doesn't warn or fail.
        for (i, arg_name) in args.iter().enumerate() {
            let callee_param = callee.symbols.args[i];
            if let Some(sym) = callee.symbols.symbol(callee_param) {
                if !sym.is_array() && sym.is_initialized() {
                    self.symbols.mark_initialized(*arg_name);
                }
            }
        }

        self.instrs.extend(callee.instrs.drain(..));
        ctx.set_line(caller_line);
        Ok(())
    }
}
