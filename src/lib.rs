//! This is the compiler as a library.  See `src/bin` directory for the
//! executable programs using this library.

// Because this is a library, allow dead code to make in-class exercises easier
// to develop.
#![allow(dead_code)]

pub mod back;
pub mod common;
pub mod error;
pub mod front;
pub mod vm;

pub use error::{Error, Result};

/// Parse and lower a whole source program to a rendered instruction
/// stream, one instruction per line.
pub fn compile(source: &str) -> Result<Vec<String>> {
    let (program, program_lines) = front::parse(source)?;
    back::compile(&program.procedures, &program.main, program_lines)
}
