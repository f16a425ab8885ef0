use pandaura_runtime::engine::{OverflowRange, ScanConfig, ScanEngine};
use pandaura_runtime::{RuntimeError, Value};
use pandaura_syntax::parse_program;

fn quiet_config() -> ScanConfig {
    ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        physics: Vec::new(),
        ..ScanConfig::default()
    }
}

fn run_once(source: &str) -> ScanEngine {
    let program = parse_program(source).expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    engine.execute_cycle(10).expect("cycle");
    engine
}

#[test]
fn defaults_per_type() {
    let engine = run_once(
        "VAR b : BOOL; i : INT; r : REAL; s : STRING; t : TIME; a : ARRAY[1..3] OF INT; END_VAR",
    );
    assert_eq!(engine.read_variable("b"), Some(Value::Bool(false)));
    assert_eq!(engine.read_variable("i"), Some(Value::Int(0)));
    assert_eq!(engine.read_variable("r"), Some(Value::Real(0.0)));
    assert_eq!(engine.read_variable("s"), Some(Value::Str("".into())));
    assert_eq!(engine.read_variable("t"), Some(Value::Time(0)));
    match engine.read_variable("a") {
        Some(Value::Array(array)) => {
            assert_eq!(array.elements.len(), 3);
            assert_eq!(array.elements[0], Value::Int(0));
        }
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn initialisers_see_earlier_declarations() {
    let engine = run_once("VAR a : INT := 4; b : INT := a * 2; END_VAR");
    assert_eq!(engine.read_variable("b"), Some(Value::Int(8)));
}

#[test]
fn assignment_coerces_to_cell_type() {
    let engine = run_once(
        "VAR b : BOOL; i : INT; r : REAL; s : STRING; END_VAR
         b := 3; i := 7.9; r := 2; s := 42;",
    );
    assert_eq!(engine.read_variable("b"), Some(Value::Bool(true)));
    assert_eq!(engine.read_variable("i"), Some(Value::Int(7)), "truncation");
    assert_eq!(engine.read_variable("r"), Some(Value::Real(2.0)));
    assert_eq!(engine.read_variable("s"), Some(Value::Str("42".into())));
}

#[test]
fn if_elsif_else_short_circuit() {
    let engine = run_once(
        "VAR a : INT := 5; x : INT; END_VAR
         IF a > 10 THEN x := 1;
         ELSIF a > 3 THEN x := 2;
         ELSE x := 3;
         END_IF;",
    );
    assert_eq!(engine.read_variable("x"), Some(Value::Int(2)));
}

#[test]
fn for_loop_sees_control_variable() {
    let engine = run_once(
        "VAR i : INT; s : INT; END_VAR
         FOR i := 1 TO 5 DO s := s + i; END_FOR",
    );
    assert_eq!(engine.read_variable("s"), Some(Value::Int(15)));
    assert_eq!(engine.read_variable("i"), Some(Value::Int(5)));
}

#[test]
fn for_loop_with_step() {
    let engine = run_once(
        "VAR i : INT; n : INT; END_VAR
         FOR i := 0 TO 10 BY 2 DO n := n + 1; END_FOR",
    );
    assert_eq!(engine.read_variable("n"), Some(Value::Int(6)));
}

#[test]
fn while_guard_trips_on_infinite_loop() {
    let program = parse_program(
        "VAR x : INT; END_VAR
         WHILE TRUE DO x := x + 0; END_WHILE",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let report = engine.execute_cycle(10).expect("cycle continues");
    assert!(matches!(report.error, Some(RuntimeError::LoopGuard(_))));
}

#[test]
fn division_by_zero_faults_the_cycle() {
    let program = parse_program(
        "VAR x : INT; y : INT; END_VAR
         x := 1 / y;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let report = engine.execute_cycle(10).expect("cycle continues");
    assert_eq!(report.error, Some(RuntimeError::DivisionByZero));
}

#[test]
fn stop_on_error_aborts_the_cycle() {
    let program = parse_program("x := 1;").expect("parse");
    let config = ScanConfig {
        stop_on_error: true,
        ..quiet_config()
    };
    let mut engine = ScanEngine::new(program, config, 0).expect("load");
    let err = engine.execute_cycle(10).unwrap_err();
    assert!(matches!(err, RuntimeError::UndefinedVariable(_)));
}

#[test]
fn div_and_mod_semantics() {
    let engine = run_once(
        "VAR a : INT; b : INT; c : REAL; END_VAR
         a := 7 DIV 2;
         b := 7 MOD 3;
         c := 7.0 / 2.0;",
    );
    assert_eq!(engine.read_variable("a"), Some(Value::Int(3)));
    assert_eq!(engine.read_variable("b"), Some(Value::Int(1)));
    assert_eq!(engine.read_variable("c"), Some(Value::Real(3.5)));
}

#[test]
fn conversions_and_now_ms() {
    let engine = run_once(
        "VAR i : INT; r : REAL; b : BOOL; t : DINT; END_VAR
         i := TO_INT(3.9);
         r := TO_REAL(5);
         b := TO_BOOL(0);
         t := NOW_MS();",
    );
    assert_eq!(engine.read_variable("i"), Some(Value::Int(3)));
    assert_eq!(engine.read_variable("r"), Some(Value::Real(5.0)));
    assert_eq!(engine.read_variable("b"), Some(Value::Bool(false)));
    assert_eq!(engine.read_variable("t"), Some(Value::Int(10)));
}

#[test]
fn array_read_write_and_bounds() {
    let engine = run_once(
        "VAR a : ARRAY[1..3] OF INT; x : INT; END_VAR
         a[2] := 42;
         x := a[2];",
    );
    assert_eq!(engine.read_variable("x"), Some(Value::Int(42)));

    let program = parse_program(
        "VAR a : ARRAY[1..3] OF INT; END_VAR
         a[9] := 1;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let report = engine.execute_cycle(10).expect("cycle");
    assert!(matches!(
        report.error,
        Some(RuntimeError::IndexOutOfBounds { index: 9, .. })
    ));
}

#[test]
fn overflow_range_can_opt_into_dint() {
    let program = parse_program(
        "VAR c : DINT := 40000; END_VAR
         c := c + 1;",
    )
    .expect("parse");
    let config = ScanConfig {
        overflow_range: OverflowRange::Int32,
        ..quiet_config()
    };
    let mut engine = ScanEngine::new(program, config, 0).expect("load");
    let report = engine.execute_cycle(10).expect("cycle");
    assert!(report.overflowed.is_empty(), "40001 fits in DINT range");
    assert_eq!(engine.read_variable("c"), Some(Value::Int(40_001)));
}
