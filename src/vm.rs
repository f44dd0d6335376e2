//! A small reference machine for the target instruction set.
//!
//! `spec.md` explicitly scopes execution semantics out of the compiler
//! core; this module exists so the compiler's output can actually be run
//! end to end. It parses the *textual* instruction stream the way a
//! standalone VM given only the rendered program file would — no
//! dependency on `back::instr::Instr`.

use std::collections::VecDeque;
use std::io::Write;

use thiserror::Error;

/// Something wrong with the program text or its execution. Distinct from
/// `crate::Error`: this is a runtime/VM-input problem, not a compile-time
/// diagnostic about the source language.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("line {line}: unrecognized instruction {text:?}")]
    BadInstruction { line: usize, text: String },
    #[error("line {line}: invalid jump target {text:?}")]
    BadJumpTarget { line: usize, text: String },
    #[error("ran out of input while executing READ")]
    InputExhausted,
    #[error("malformed integer {text:?} on the input stream")]
    BadInput { text: String },
    #[error("exceeded the instruction budget of {budget} steps")]
    BudgetExceeded { budget: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Registers {
    a: i64,
    b: i64,
    c: i64,
    d: i64,
    e: i64,
    f: i64,
}

impl Registers {
    fn get(&self, name: char) -> i64 {
        match name {
            'a' => self.a,
            'b' => self.b,
            'c' => self.c,
            'd' => self.d,
            'e' => self.e,
            'f' => self.f,
            _ => unreachable!("register name already validated at parse time"),
        }
    }

    fn get_mut(&mut self, name: char) -> &mut i64 {
        match name {
            'a' => &mut self.a,
            'b' => &mut self.b,
            'c' => &mut self.c,
            'd' => &mut self.d,
            'e' => &mut self.e,
            'f' => &mut self.f,
            _ => unreachable!("register name already validated at parse time"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Rst(char),
    Inc(char),
    Dec(char),
    Shl(char),
    Shr(char),
    Get(char),
    Put(char),
    Add(char),
    Sub(char),
    Load(char),
    Store(char),
    Read,
    Write,
    Jump(usize),
    Jzero(usize),
    Jpos(usize),
    Halt,
}

fn parse_program(text: &str) -> Result<Vec<Op>, VmError> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .map(|(line, l)| parse_line(line, l))
        .collect()
}

fn parse_line(line: usize, text: &str) -> Result<Op, VmError> {
    let bad = || VmError::BadInstruction { line, text: text.to_string() };
    let mut parts = text.split_whitespace();
    let mnemonic = parts.next().ok_or_else(bad)?;

    let reg = |parts: &mut std::str::SplitWhitespace| -> Result<char, VmError> {
        let word = parts.next().ok_or_else(bad)?;
        match word.chars().next() {
            Some(ch @ 'a'..='f') if word.len() == 1 => Ok(ch),
            _ => Err(bad()),
        }
    };
    let target = |parts: &mut std::str::SplitWhitespace| -> Result<usize, VmError> {
        let word = parts.next().ok_or_else(bad)?;
        word.parse().map_err(|_| VmError::BadJumpTarget { line, text: word.to_string() })
    };

    let op = match mnemonic {
        "RST" => Op::Rst(reg(&mut parts)?),
        "INC" => Op::Inc(reg(&mut parts)?),
        "DEC" => Op::Dec(reg(&mut parts)?),
        "SHL" => Op::Shl(reg(&mut parts)?),
        "SHR" => Op::Shr(reg(&mut parts)?),
        "GET" => Op::Get(reg(&mut parts)?),
        "PUT" => Op::Put(reg(&mut parts)?),
        "ADD" => Op::Add(reg(&mut parts)?),
        "SUB" => Op::Sub(reg(&mut parts)?),
        "LOAD" => Op::Load(reg(&mut parts)?),
        "STORE" => Op::Store(reg(&mut parts)?),
        "READ" => Op::Read,
        "WRITE" => Op::Write,
        "JUMP" => Op::Jump(target(&mut parts)?),
        "JZERO" => Op::Jzero(target(&mut parts)?),
        "JPOS" => Op::Jpos(target(&mut parts)?),
        "HALT" => Op::Halt,
        _ => return Err(bad()),
    };
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(op)
}

struct Machine {
    regs: Registers,
    memory: Vec<i64>,
}

impl Machine {
    fn load(&self, addr: i64) -> i64 {
        if addr < 0 {
            return 0;
        }
        self.memory.get(addr as usize).copied().unwrap_or(0)
    }

    fn store(&mut self, addr: i64, value: i64) {
        if addr < 0 {
            return;
        }
        let idx = addr as usize;
        if idx >= self.memory.len() {
            self.memory.resize(idx + 1, 0);
        }
        self.memory[idx] = value;
    }
}

/// Run a rendered instruction stream to completion.
///
/// `input` is tokenized once up front on ASCII whitespace: each `READ`
/// consumes the next token. `instruction_budget`, when set, aborts a
/// runaway program instead of looping forever — a test-only guard, not
/// part of the language's own semantics.
pub fn run(
    program_text: &str,
    input: &str,
    output: &mut dyn Write,
    instruction_budget: Option<u64>,
) -> Result<(), VmError> {
    let program = parse_program(program_text)?;
    let mut tokens: VecDeque<&str> = input.split_ascii_whitespace().collect();
    let mut machine = Machine { regs: Registers::default(), memory: Vec::new() };

    let mut pc = 0usize;
    let mut steps = 0u64;
    while let Some(op) = program.get(pc) {
        if let Some(budget) = instruction_budget {
            if steps >= budget {
                return Err(VmError::BudgetExceeded { budget });
            }
        }
        steps += 1;
        tracing::trace!(pc, ?op, "executing");

        let mut next_pc = pc + 1;
        match *op {
            Op::Rst(r) => *machine.regs.get_mut(r) = 0,
            Op::Inc(r) => *machine.regs.get_mut(r) += 1,
            Op::Dec(r) => {
                let v = machine.regs.get_mut(r);
                *v = (*v - 1).max(0);
            }
            Op::Shl(r) => *machine.regs.get_mut(r) *= 2,
            Op::Shr(r) => *machine.regs.get_mut(r) /= 2,
            Op::Get(r) => machine.regs.a = machine.regs.get(r),
            Op::Put(r) => *machine.regs.get_mut(r) = machine.regs.a,
            Op::Add(r) => machine.regs.a += machine.regs.get(r),
            Op::Sub(r) => machine.regs.a = (machine.regs.a - machine.regs.get(r)).max(0),
            Op::Load(r) => machine.regs.a = machine.load(machine.regs.get(r)),
            Op::Store(r) => machine.store(machine.regs.get(r), machine.regs.a),
            Op::Read => {
                let token = tokens.pop_front().ok_or(VmError::InputExhausted)?;
                machine.regs.a =
                    token.parse().map_err(|_| VmError::BadInput { text: token.to_string() })?;
            }
            Op::Write => {
                writeln!(output, "{}", machine.regs.a).expect("writing VM output");
            }
            Op::Jump(target) => next_pc = target,
            Op::Jzero(target) => {
                if machine.regs.a == 0 {
                    next_pc = target;
                }
            }
            Op::Jpos(target) => {
                if machine.regs.a > 0 {
                    next_pc = target;
                }
            }
            Op::Halt => return Ok(()),
        }
        pc = next_pc;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_str(program: &str, input: &str) -> String {
        let mut out = Vec::new();
        run(program, input, &mut out, Some(10_000)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reads_and_writes_a_value_unchanged() {
        let out = run_str("READ\nWRITE\nHALT", "41");
        assert_eq!(out, "41\n");
    }

    #[test]
    fn subtraction_saturates_at_zero() {
        let program = "READ\nPUT b\nRST a\nSUB b\nWRITE\nHALT";
        let out = run_str(program, "5");
        assert_eq!(out, "0\n");
    }

    #[test]
    fn jzero_branches_when_accumulator_is_zero() {
        let program = "RST a\nJZERO 3\nHALT\nINC a\nWRITE\nHALT";
        let out = run_str(program, "");
        assert_eq!(out, "1\n");
    }

    #[test]
    fn store_and_load_round_trip_through_memory() {
        let program = "RST b\nRST a\nINC a\nSTORE b\nRST a\nLOAD b\nWRITE\nHALT";
        let out = run_str(program, "");
        assert_eq!(out, "1\n");
    }

    #[test]
    fn exceeding_the_instruction_budget_is_an_error() {
        let program = "RST a\nJUMP 0";
        let mut out = Vec::new();
        let err = run(program, "", &mut out, Some(100)).unwrap_err();
        assert_eq!(err, VmError::BudgetExceeded { budget: 100 });
    }

    #[test]
    fn reading_past_the_end_of_input_is_an_error() {
        let mut out = Vec::new();
        let err = run("READ\nHALT", "", &mut out, None).unwrap_err();
        assert_eq!(err, VmError::InputExhausted);
    }

    #[test]
    fn rejects_an_unrecognized_mnemonic() {
        let mut out = Vec::new();
        let err = run("FROB a\nHALT", "", &mut out, None).unwrap_err();
        assert!(matches!(err, VmError::BadInstruction { .. }));
    }
}
