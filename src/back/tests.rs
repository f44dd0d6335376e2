use crate::error::Error;

fn compile(src: &str) -> Vec<String> {
    crate::compile(src).unwrap_or_else(|e| panic!("expected compilation to succeed: {e}"))
}

fn compile_err(src: &str) -> Error {
    crate::compile(src).expect_err("expected compilation to fail")
}

#[test]
fn compiles_a_trivial_program_ending_in_halt() {
    let lines = compile("PROGRAM IS IN write 1; END");
    assert_eq!(lines.last().unwrap(), "HALT");
}

#[test]
fn compilation_is_deterministic() {
    let src = "PROGRAM IS a, b, T t[3] IN
        a := 2 + 3 * 4;
        write a;
        b := t[0];
    END";
    assert_eq!(compile(src), compile(src));
}

#[test]
fn folds_constant_arithmetic_at_compile_time() {
    // Both operands are literal, so this is materialized directly with no
    // runtime add at all.
    let lines = compile("PROGRAM IS a IN a := 2 + 3; write a; END");
    assert!(!lines.iter().any(|l| l.starts_with("ADD") || l.starts_with("SUB")));
}

#[test]
fn subtracting_a_value_from_itself_uses_reset_not_subtraction() {
    let lines = compile("PROGRAM IS a, r IN read a; r := a - a; write r; END");
    assert!(lines.iter().any(|l| l.starts_with("RST")));
    assert!(!lines.iter().any(|l| l.starts_with("SUB")));
}

#[test]
fn adding_a_value_to_itself_doubles_via_shift() {
    let lines = compile("PROGRAM IS a, r IN read a; r := a + a; write r; END");
    assert!(lines.iter().any(|l| l.starts_with("SHL")));
    assert!(!lines.iter().any(|l| l.starts_with("ADD")));
}

#[test]
fn small_constant_addition_uses_increment_chain() {
    let lines = compile("PROGRAM IS a, r IN read a; r := a + 3; write r; END");
    assert!(lines.iter().filter(|l| l.starts_with("INC")).count() >= 3);
    assert!(!lines.iter().any(|l| l.starts_with("ADD")));
}

#[test]
fn power_of_two_multiplication_uses_shift() {
    let lines = compile("PROGRAM IS a, r IN read a; r := a * 8; write r; END");
    assert!(lines.iter().any(|l| l.starts_with("SHL")));
}

#[test]
fn power_of_two_division_uses_shift() {
    let lines = compile("PROGRAM IS a, r IN read a; r := a / 4; write r; END");
    assert!(lines.iter().any(|l| l.starts_with("SHR")));
}

#[test]
fn general_multiplication_falls_back_to_shift_add_loop() {
    let lines = compile("PROGRAM IS a, b, r IN read a; read b; r := a * b; write r; END");
    assert!(lines.iter().any(|l| l.starts_with("JZERO")));
    assert!(lines.iter().any(|l| l.starts_with("ADD")));
}

#[test]
fn general_division_never_leaves_an_unresolved_jump() {
    // render() panics on a Target::Pending; reaching here means every
    // sentinel in the division routine was patched before returning.
    let lines = compile("PROGRAM IS a, b, q IN read a; read b; q := a / b; write q; END");
    assert!(lines.iter().any(|l| l.starts_with("JUMP") || l.starts_with("JZERO")));
}

#[test]
fn if_statement_round_trips_through_compilation() {
    let lines = compile(
        "PROGRAM IS a IN
            read a;
            IF a > 0 THEN
                write a;
            ENDIF
        END",
    );
    assert!(lines.iter().any(|l| l.starts_with("JZERO") || l.starts_with("JPOS")));
}

#[test]
fn ifelse_emits_a_jump_past_the_else_branch() {
    let lines = compile(
        "PROGRAM IS a IN
            read a;
            IF a > 0 THEN
                write 1;
            ELSE
                write 2;
            ENDIF
        END",
    );
    assert!(lines.iter().any(|l| l.starts_with("JUMP")));
}

#[test]
fn while_loop_jumps_backward_to_its_condition() {
    let lines = compile(
        "PROGRAM IS a IN
            a := 0;
            WHILE a < 10 DO
                a := a + 1;
            ENDWHILE
            write a;
        END",
    );
    let back_jump = lines.iter().enumerate().find_map(|(i, l)| {
        l.strip_prefix("JUMP ").and_then(|n| n.parse::<usize>().ok()).filter(|&target| target <= i)
    });
    assert!(back_jump.is_some(), "expected a backward jump closing the loop");
}

#[test]
fn repeat_until_compiles_without_constant_folding_the_condition() {
    let lines = compile(
        "PROGRAM IS a IN
            a := 0;
            REPEAT
                a := a + 1;
            UNTIL a = 1;
            write a;
        END",
    );
    assert!(lines.iter().any(|l| l.starts_with("JZERO") || l.starts_with("JPOS")));
}

#[test]
fn write_literal_inside_a_loop_is_cached_before_the_loop_starts() {
    let lines = compile(
        "PROGRAM IS a IN
            a := 0;
            WHILE a < 5 DO
                write 7;
                a := a + 1;
            ENDWHILE
        END",
    );
    // Caching the literal writes it into its cell with `GET c; STORE b`;
    // that pair should appear exactly once (during the pre-loop cache
    // setup), not once per textual occurrence of `write 7` times anything
    // iteration-related — there's only one `write 7` in the source either
    // way, so this also confirms the cache lookup short-circuits the
    // second (lazy, in-body) call to the same cell rather than re-storing.
    let cache_writes = lines
        .windows(2)
        .filter(|w| w[0] == "GET c" && w[1] == "STORE b")
        .count();
    assert_eq!(cache_writes, 1);

    let cache_write_index = lines
        .windows(2)
        .position(|w| w[0] == "GET c" && w[1] == "STORE b")
        .unwrap();
    let first_cond_jump =
        lines.iter().position(|l| l.starts_with("JZERO") || l.starts_with("JPOS")).unwrap();
    assert!(cache_write_index < first_cond_jump, "literal must be cached before the loop condition");
}

#[test]
fn procedure_call_writes_through_a_scalar_reference_argument() {
    let lines = compile(
        "PROCEDURE setit(x) IS IN
            x := 42;
        END
        PROGRAM IS a IN
            setit(a);
            write a;
        END",
    );
    assert!(lines.last().unwrap() == "HALT");
    assert!(lines.iter().any(|l| l == "WRITE"));
}

#[test]
fn procedure_call_binds_an_array_argument_by_reference() {
    let lines = compile(
        "PROCEDURE fill(T arr, n) IS i IN
            i := 0;
            WHILE i < n DO
                arr[i] := i;
                i := i + 1;
            ENDWHILE
        END
        PROGRAM IS T t[5], five IN
            five := 5;
            fill(t, five);
            write t[0];
        END",
    );
    assert!(!lines.is_empty());
}

#[test]
fn initialization_inferred_through_an_out_parameter_is_usable_after_the_call() {
    // setit initializes its parameter; the caller's argument should count
    // as initialized afterward, so reading it back outside any loop must
    // not raise UninitializedUse.
    let lines = compile(
        "PROCEDURE setit(x) IS IN
            x := 1;
        END
        PROGRAM IS a IN
            setit(a);
            write a;
        END",
    );
    assert!(!lines.is_empty());
}

#[test]
fn rejects_redeclaration() {
    let err = compile_err("PROGRAM IS a, a IN write a; END");
    assert!(matches!(err, Error::Redeclaration { .. }));
}

#[test]
fn rejects_undeclared_name() {
    let err = compile_err("PROGRAM IS IN write a; END");
    assert!(matches!(err, Error::UndeclaredName { .. }));
}

#[test]
fn rejects_zero_sized_array() {
    let err = compile_err("PROGRAM IS T t[0] IN write t[0]; END");
    assert!(matches!(err, Error::ZeroSizedArray { .. }));
}

#[test]
fn rejects_shape_mismatch_when_indexing_a_scalar() {
    let err = compile_err("PROGRAM IS a IN write a[0]; END");
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn rejects_assignment_to_a_bare_array_name() {
    let err = compile_err("PROGRAM IS T t[3] IN t := 1; END");
    assert!(matches!(err, Error::AssignToArrayWithoutIndex { .. }));
}

#[test]
fn rejects_call_to_unknown_procedure() {
    let err = compile_err("PROGRAM IS a IN frobnicate(a); END");
    assert!(matches!(err, Error::UnknownProcedure { .. }));
}

#[test]
fn rejects_wrong_argument_count() {
    let err = compile_err(
        "PROCEDURE p(x) IS IN x := 1; END
         PROGRAM IS a, b IN p(a, b); END",
    );
    assert!(matches!(err, Error::ArgCountMismatch { .. }));
}

#[test]
fn rejects_argument_shape_mismatch() {
    let err = compile_err(
        "PROCEDURE p(T arr) IS IN arr[0] := 1; END
         PROGRAM IS a IN p(a); END",
    );
    assert!(matches!(err, Error::ArgKindMismatch { .. }));
}

#[test]
fn rejects_use_of_an_uninitialized_variable_outside_a_loop() {
    let err = compile_err("PROGRAM IS a, b IN b := a + 1; write b; END");
    assert!(matches!(err, Error::UninitializedUse { .. }));
}

#[test]
fn rejects_an_uninitialized_variable_used_as_an_array_index() {
    let err = compile_err("PROGRAM IS T arr[3], i IN arr[i] := 1; END");
    assert!(matches!(err, Error::UninitializedUse { .. }));
}

#[test]
fn allows_a_possibly_uninitialized_read_inside_a_loop() {
    // Assigned on a prior iteration, read on the next: this is only a
    // warning, not a hard error, once loop_depth is tracked as a counter.
    let lines = compile(
        "PROGRAM IS a, n IN
            n := 3;
            WHILE n > 0 DO
                IF n < 3 THEN
                    write a;
                ENDIF
                a := n;
                n := n - 1;
            ENDWHILE
        END",
    );
    assert!(!lines.is_empty());
}
