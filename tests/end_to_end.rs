//! Source-to-output scenarios: compile a program, then actually run it on
//! the reference VM and check what it prints. These exercise the whole
//! pipeline (`front::parse` + `back::compile` + `vm::run`) as a black box,
//! the way a user invoking `implangc` then `implang-vm` would see it.

fn run(source: &str, input: &str) -> String {
    let lines = implang::compile(source).expect("program should compile");
    let program = lines.join("\n");
    let mut out = Vec::new();
    implang::vm::run(&program, input, &mut out, Some(1_000_000)).expect("program should run");
    String::from_utf8(out).unwrap()
}

#[test]
fn s1_writes_a_literal() {
    let out = run("PROGRAM IS IN write 42; END", "");
    assert_eq!(out, "42\n");
}

#[test]
fn s2_squares_an_input() {
    let out = run(
        "PROGRAM IS n, r IN
            read n;
            r := n * n;
            write r;
        END",
        "7",
    );
    assert_eq!(out, "49\n");
}

#[test]
fn s3_divides_and_mods_two_inputs() {
    let out = run(
        "PROGRAM IS a, b, q, r IN
            read a;
            read b;
            q := a / b;
            r := a % b;
            write q;
            write r;
        END",
        "17 5",
    );
    assert_eq!(out, "3\n2\n");
}

#[test]
fn s4_sums_one_to_n_in_a_while_loop() {
    let out = run(
        "PROGRAM IS n, x, i IN
            read n;
            x := 0;
            i := 1;
            WHILE i <= n DO
                x := x + i;
                i := i + 1;
            ENDWHILE
            write x;
        END",
        "10",
    );
    assert_eq!(out, "55\n");
}

#[test]
fn s5_adds_through_a_procedure_call() {
    let out = run(
        "PROCEDURE p(a, b) IS IN
            a := a + b;
        END
        PROGRAM IS x, y IN
            read x;
            read y;
            p(x, y);
            write x;
        END",
        "3 4",
    );
    assert_eq!(out, "7\n");
}

#[test]
fn s6_echoes_input_until_a_sentinel_zero() {
    let out = run(
        "PROGRAM IS x IN
            REPEAT
                read x;
                write x;
            UNTIL x = 0;
        END",
        "3 1 0",
    );
    assert_eq!(out, "3\n1\n0\n");
}

#[test]
fn determinism_across_independent_runs() {
    let source = "PROGRAM IS n, x, i IN
        read n;
        x := 0;
        i := 1;
        WHILE i <= n DO
            x := x + i * 2;
            i := i + 1;
        ENDWHILE
        write x;
    END";
    assert_eq!(run(source, "12"), run(source, "12"));
}

#[test]
fn constant_folding_matches_the_operator_for_every_arithmetic_op() {
    let cases: &[(&str, &str, i64)] = &[
        ("+", "write 37 + 5;", 42),
        ("-", "write 5 - 37;", 0), // clamped at zero
        ("-", "write 37 - 5;", 32),
        ("*", "write 6 * 7;", 42),
        ("/", "write 17 / 5;", 3),
        ("%", "write 17 % 5;", 2),
    ];
    for (op, stmt, expected) in cases {
        let source = format!("PROGRAM IS IN {stmt} END");
        let out = run(&source, "");
        assert_eq!(out, format!("{expected}\n"), "operator {op}");
    }
}

#[test]
fn subtracting_an_expression_from_itself_is_always_zero() {
    let out = run(
        "PROGRAM IS a, b, r IN
            read a;
            read b;
            r := (a * b + a) - (a * b + a);
            write r;
        END",
        "6 9",
    );
    assert_eq!(out, "0\n");
}

#[test]
fn power_of_two_multiply_and_divide_round_trip() {
    let out = run(
        "PROGRAM IS x, doubled, halved IN
            read x;
            doubled := x * 16;
            halved := doubled / 16;
            write doubled;
            write halved;
        END",
        "9",
    );
    assert_eq!(out, "144\n9\n");
}

#[test]
fn small_constant_inc_dec_rule_matches_runtime_arithmetic() {
    let out = run(
        "PROGRAM IS x, plus, minus IN
            read x;
            plus := x + 7;
            minus := x - 7;
            write plus;
            write minus;
        END",
        "20",
    );
    assert_eq!(out, "27\n13\n");
}

#[test]
fn array_by_reference_mutation_is_visible_to_the_caller() {
    let out = run(
        "PROCEDURE zero_first(T a) IS IN
            a[0] := 1;
        END
        PROGRAM IS T x[3] IN
            x[0] := 9;
            zero_first(x);
            write x[0];
        END",
        "",
    );
    assert_eq!(out, "1\n");
}

#[test]
fn initialization_through_a_call_allows_later_use() {
    let out = run(
        "PROCEDURE setit(x) IS IN
            x := 5;
        END
        PROGRAM IS a, r IN
            setit(a);
            r := a + 1;
            write r;
        END",
        "",
    );
    assert_eq!(out, "6\n");
}

#[test]
fn nested_parenthesized_addition_does_not_clobber_the_inner_operand() {
    // a + (b + c) forces the rhs to be lowered as its own nested BinOp:
    // if the lowerer reuses the same scratch register for both the outer
    // rhs slot and the inner addition's own operand, this computes
    // a + 2*c instead of a + (b + c).
    let out = run(
        "PROGRAM IS a, b, c, r IN
            read a;
            read b;
            read c;
            r := a + (b + c);
            write r;
        END",
        "2 3 4",
    );
    assert_eq!(out, "9\n");
}

#[test]
fn array_element_with_a_variable_index_works_inside_a_condition() {
    // Lowering a condition's right-hand side through an array load forces
    // the index arithmetic (address_of_array_element's Index::Load branch)
    // to run with the rhs's own target register live: if that arithmetic's
    // scratch register collides with the target, the computed address is
    // corrupted and the branch reads garbage.
    let out = run(
        "PROGRAM IS T arr[3], i, x, r IN
            arr[0] := 5;
            arr[1] := 10;
            arr[2] := 15;
            i := 1;
            x := 3;
            IF x < arr[i] THEN
                r := 1;
            ELSE
                r := 0;
            ENDIF
            write r;
        END",
        "",
    );
    assert_eq!(out, "1\n");
}

#[test]
fn declaration_errors_report_the_expected_kind() {
    use implang::Error;

    assert!(matches!(
        implang::compile("PROGRAM IS a, a IN write a; END"),
        Err(Error::Redeclaration { .. })
    ));
    assert!(matches!(
        implang::compile("PROGRAM IS T t[0] IN write t[0]; END"),
        Err(Error::ZeroSizedArray { .. })
    ));
    assert!(matches!(
        implang::compile("PROGRAM IS IN write missing; END"),
        Err(Error::UndeclaredName { .. })
    ));
    assert!(matches!(
        implang::compile("PROGRAM IS a IN undefined_proc(a); END"),
        Err(Error::UnknownProcedure { .. })
    ));
}
