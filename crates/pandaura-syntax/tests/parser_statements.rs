use pandaura_syntax::ast::{BinaryOp, Expr, Stmt, Target, TypeRef};
use pandaura_syntax::parse_program;

#[test]
fn program_wrapper_is_optional() {
    let bare = parse_program("x := 1;").expect("bare parse");
    assert_eq!(bare.name, None);
    assert_eq!(bare.body.len(), 1);

    let wrapped = parse_program("PROGRAM Main x := 1; END_PROGRAM").expect("wrapped parse");
    assert_eq!(wrapped.name.as_deref(), Some("Main"));
    assert_eq!(wrapped.body.len(), 1);
}

#[test]
fn var_blocks_interleave_with_statements() {
    let source = "
        VAR a : INT := 1; END_VAR
        a := a + 1;
        VAR b : BOOL; END_VAR
        b := TRUE;
    ";
    let program = parse_program(source).expect("parse");
    assert_eq!(program.decls.len(), 2);
    assert_eq!(program.body.len(), 2);
    assert_eq!(program.decls[0].name.as_str(), "a");
    assert_eq!(program.decls[1].ty, TypeRef::Bool);
}

#[test]
fn array_declaration() {
    let program = parse_program("VAR buf : ARRAY[0..9] OF INT; END_VAR").expect("parse");
    match &program.decls[0].ty {
        TypeRef::Array { lo, hi, base } => {
            assert_eq!((*lo, *hi), (0, 9));
            assert_eq!(**base, TypeRef::Int);
        }
        other => panic!("expected array type, got {other:?}"),
    }
}

#[test]
fn fb_instance_declaration_uses_named_type() {
    let program = parse_program("VAR T1 : TON; END_VAR").expect("parse");
    assert_eq!(program.decls[0].ty, TypeRef::Named("TON".into()));
}

#[test]
fn call_statement_with_keyword_args() {
    let program = parse_program("T1(IN := Start, PT := T#100ms);").expect("parse");
    match &program.body[0] {
        Stmt::Call { name, args } => {
            assert_eq!(name.as_str(), "T1");
            assert_eq!(args.len(), 2);
            assert_eq!(args[0].name.as_deref(), Some("IN"));
            assert_eq!(args[1].value, Expr::Time(100));
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn if_elsif_else_chain() {
    let source = "
        IF a > 1 THEN x := 1;
        ELSIF a > 0 THEN x := 2;
        ELSE x := 3;
        END_IF;
    ";
    let program = parse_program(source).expect("parse");
    match &program.body[0] {
        Stmt::If {
            else_if,
            else_block,
            ..
        } => {
            assert_eq!(else_if.len(), 1);
            assert_eq!(else_block.len(), 1);
        }
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn while_and_for_loops() {
    let program = parse_program(
        "WHILE n > 0 DO n := n - 1; END_WHILE
         FOR i := 1 TO 10 BY 2 DO s := s + i; END_FOR",
    )
    .expect("parse");
    assert!(matches!(program.body[0], Stmt::While { .. }));
    match &program.body[1] {
        Stmt::For { control, step, .. } => {
            assert_eq!(control.as_str(), "i");
            assert_eq!(*step, Some(Expr::Number(2.0)));
        }
        other => panic!("expected for, got {other:?}"),
    }
}

#[test]
fn array_element_assignment() {
    let program = parse_program("buf[3] := 7;").expect("parse");
    match &program.body[0] {
        Stmt::Assign {
            target: Target::Index { name, index },
            ..
        } => {
            assert_eq!(name.as_str(), "buf");
            assert_eq!(*index, Expr::Number(3.0));
        }
        other => panic!("expected indexed assign, got {other:?}"),
    }
}

#[test]
fn parse_error_carries_expected_and_got() {
    let err = parse_program("x := ;").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("expected"), "got: {text}");
}

#[test]
fn missing_end_if_is_an_error() {
    assert!(parse_program("IF a THEN x := 1;").is_err());
}

#[test]
fn member_access_in_condition() {
    let program = parse_program("IF T1.Q THEN done := TRUE; END_IF").expect("parse");
    match &program.body[0] {
        Stmt::If { condition, .. } => match condition {
            Expr::Member { field, .. } => assert_eq!(field.as_str(), "Q"),
            other => panic!("expected member access, got {other:?}"),
        },
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn mod_and_div_keywords() {
    let program = parse_program("x := a MOD 3 + b DIV 2;").expect("parse");
    match &program.body[0] {
        Stmt::Assign { value, .. } => match value {
            Expr::Binary { op, left, right } => {
                assert_eq!(*op, BinaryOp::Add);
                assert!(matches!(
                    **left,
                    Expr::Binary {
                        op: BinaryOp::Mod,
                        ..
                    }
                ));
                assert!(matches!(
                    **right,
                    Expr::Binary {
                        op: BinaryOp::IntDiv,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        },
        other => panic!("expected assign, got {other:?}"),
    }
}
