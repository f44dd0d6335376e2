//! The front-end of the compiler.

pub mod ast;
pub mod lex;
pub mod parse;

pub use ast::*;
pub use lex::{Lexer, Token, TokenKind};
pub use parse::parse;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Id;

    fn pid(s: &str) -> Id {
        internment::Intern::new(s.to_string())
    }

    #[test]
    fn parses_minimal_program() {
        let src = "PROGRAM IS\nx\nIN\nREAD x;\nWRITE x;\nEND\n";
        let (program, lines) = parse(src).expect("should parse");
        assert!(program.procedures.is_empty());
        assert_eq!(program.main.decls, vec![Decl::Scalar(pid("x"))]);
        assert_eq!(program.main.body.len(), 2);
        assert!(!lines.is_empty());
    }

    #[test]
    fn parses_procedure_and_call() {
        let src = "PROCEDURE inc(x) IS\nIN\nx := x + 1;\nEND\nPROGRAM IS\na\nIN\na := 0;\ninc(a);\nWRITE a;\nEND\n";
        let (program, _) = parse(src).expect("should parse");
        assert_eq!(program.procedures.len(), 1);
        assert_eq!(program.procedures[0].params, vec![Param::Scalar(pid("x"))]);
        match &program.main.body[1] {
            Stmt::ProcCall { name, args, .. } => {
                assert_eq!(*name, pid("inc"));
                assert_eq!(*args, vec![pid("a")]);
            }
            other => panic!("expected a procedure call, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_bare_identifier_is_deferred() {
        let src = "PROGRAM IS\nIN\nx := 1;\nEND\n";
        let (program, _) = parse(src).expect("should parse");
        match &program.main.body[0] {
            Stmt::Assign(LValue::Undeclared(name), _) => assert_eq!(*name, pid("x")),
            other => panic!("expected a deferred undeclared name, got {other:?}"),
        }
    }

    #[test]
    fn array_index_on_undeclared_name_fails_immediately() {
        let src = "PROGRAM IS\nIN\nx[0] := 1;\nEND\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, crate::Error::UndeclaredName { .. }));
    }

    #[test]
    fn array_index_on_scalar_is_a_shape_mismatch() {
        let src = "PROGRAM IS\nx\nIN\nx[0] := 1;\nEND\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, crate::Error::ShapeMismatch { .. }));
    }

    #[test]
    fn unknown_procedure_call_fails_immediately() {
        let src = "PROGRAM IS\na\nIN\nfoo(a);\nEND\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, crate::Error::UnknownProcedure { .. }));
    }

    #[test]
    fn arg_count_mismatch_fails_immediately() {
        let src = "PROCEDURE p(x, y) IS\nIN\nEND\nPROGRAM IS\na\nIN\np(a);\nEND\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, crate::Error::ArgCountMismatch { .. }));
    }
}
