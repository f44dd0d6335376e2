//! Common definitions that are shared between different parts of the compiler.

// Use sorted sets and maps for consistent output
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// Identifiers.
pub type Id = internment::Intern<String>;

/// A memory address (word-granular; the VM's memory is an array of words).
pub type Addr = u32;

/// A source line number, as reported by the lexer's `program_lines` table.
pub type Line = u32;
