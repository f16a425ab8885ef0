use pandaura_syntax::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use pandaura_syntax::parse_program;

fn rhs(source: &str) -> Expr {
    let program = parse_program(source).expect("parse");
    match program.body.into_iter().next() {
        Some(Stmt::Assign { value, .. }) => value,
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn or_binds_weaker_than_and() {
    // a OR b AND c == a OR (b AND c)
    match rhs("x := a OR b AND c;") {
        Expr::Binary { op, right, .. } => {
            assert_eq!(op, BinaryOp::Or);
            assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::And,
                    ..
                }
            ));
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn comparison_binds_weaker_than_additive() {
    match rhs("x := a + 1 > b * 2;") {
        Expr::Binary { op, left, right } => {
            assert_eq!(op, BinaryOp::Gt);
            assert!(matches!(
                *left,
                Expr::Binary {
                    op: BinaryOp::Add,
                    ..
                }
            ));
            assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn not_applies_to_comparison() {
    // NOT a = b parses as NOT (a = b)
    match rhs("x := NOT a = b;") {
        Expr::Unary { op, expr } => {
            assert_eq!(op, UnaryOp::Not);
            assert!(matches!(*expr, Expr::Binary { op: BinaryOp::Eq, .. }));
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn unary_minus_and_parentheses() {
    match rhs("x := -(a + b) * 2;") {
        Expr::Binary { op, left, .. } => {
            assert_eq!(op, BinaryOp::Mul);
            assert!(matches!(*left, Expr::Unary { op: UnaryOp::Neg, .. }));
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn call_expression_with_positional_arg() {
    match rhs("x := TO_INT(3.7);") {
        Expr::Call { name, args } => {
            assert_eq!(name.as_str(), "TO_INT");
            assert_eq!(args.len(), 1);
            assert_eq!(args[0].name, None);
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn indexed_read() {
    match rhs("x := buf[i + 1];") {
        Expr::Index { name, index } => {
            assert_eq!(name.as_str(), "buf");
            assert!(matches!(
                *index,
                Expr::Binary {
                    op: BinaryOp::Add,
                    ..
                }
            ));
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn literal_kinds() {
    assert_eq!(rhs("x := 42;"), Expr::Number(42.0));
    assert_eq!(rhs("x := 3.25;"), Expr::Number(3.25));
    assert_eq!(rhs("x := TRUE;"), Expr::Bool(true));
    assert_eq!(rhs("x := 'hello';"), Expr::Str("hello".into()));
    assert_eq!(rhs("x := T#250ms;"), Expr::Time(250));
}

#[test]
fn chained_comparisons_do_not_associate() {
    // a < b < c is not grammatical; the second `<` must fail.
    assert!(parse_program("x := a < b < c;").is_err());
}
