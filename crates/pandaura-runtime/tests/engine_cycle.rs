use pandaura_runtime::engine::{EngineAlert, ScanConfig, ScanEngine};
use pandaura_runtime::Value;
use pandaura_syntax::parse_program;

fn quiet_config() -> ScanConfig {
    ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        physics: Vec::new(),
        ..ScanConfig::default()
    }
}

#[test]
fn system_variables_track_cycles() {
    let program = parse_program("VAR x : INT; END_VAR x := x + 1;").expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    for n in 1..=25i64 {
        engine.execute_cycle(n * 10).expect("cycle");
    }
    assert_eq!(engine.read_variable("ScanCount"), Some(Value::Int(25)));
    assert_eq!(engine.read_variable("ScanTime_ms"), Some(Value::Int(10)));
    assert_eq!(engine.scan_count(), 25);
}

#[test]
fn integer_overflow_wraps_and_records_one_exception() {
    let program = parse_program(
        "VAR Counter : INT := 32000; END_VAR
         Counter := Counter + 1000;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let report = engine.execute_cycle(10).expect("cycle");
    assert_eq!(report.overflowed.len(), 1);
    // 33000 wraps modulo 65536 into the signed 16-bit range.
    assert_eq!(engine.read_variable("Counter"), Some(Value::Int(-32_536)));
    assert_eq!(engine.exceptions().len(), 1);
    assert_eq!(engine.exceptions()[0].tag.as_str(), "Counter");
}

#[test]
fn overflow_wraps_at_int_min_too() {
    let program = parse_program(
        "VAR Counter : INT := -32000; END_VAR
         Counter := Counter - 1000;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    engine.execute_cycle(10).expect("cycle");
    assert_eq!(engine.read_variable("Counter"), Some(Value::Int(32_536)));
}

#[test]
fn watchdog_records_exactly_one_event_per_offending_cycle() {
    let program = parse_program(
        "VAR i : INT; x : INT; END_VAR
         FOR i := 1 TO 500 DO x := x + 1; END_FOR",
    )
    .expect("parse");
    let config = ScanConfig {
        watchdog_limit_ms: 0,
        overflow_range: pandaura_runtime::OverflowRange::Int32,
        ..quiet_config()
    };
    let mut engine = ScanEngine::new(program, config, 0).expect("load");
    for n in 1..=3i64 {
        let report = engine.execute_cycle(n * 10).expect("cycle");
        assert!(report.watchdog, "a 500-iteration loop exceeds a 0ms budget");
    }
    let alerts = engine.take_alerts();
    let watchdogs: Vec<_> = alerts
        .iter()
        .filter(|a| matches!(a, EngineAlert::WatchdogTimeout { .. }))
        .collect();
    assert_eq!(watchdogs.len(), 3, "one event per offending cycle");
    assert_eq!(engine.metrics().watchdog_events, 3);
}

#[test]
fn physics_pass_nudges_process_variables() {
    let program = parse_program(
        "VAR Temperature_PV : REAL := 20.0;
             Heater_Output : REAL := 50.0;
             Tank_Level : REAL := 50.0;
             Pump_Run : BOOL := TRUE;
         END_VAR",
    )
    .expect("parse");
    let config = ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        ..ScanConfig::default()
    };
    let mut engine = ScanEngine::new(program, config, 0).expect("load");
    engine.execute_cycle(10).expect("cycle");
    // 50/100 * 0.3 - 0.05 = +0.10; pump on: +0.5 - 0.15 = +0.35.
    assert_eq!(
        engine.read_variable("Temperature_PV"),
        Some(Value::Real(20.1))
    );
    assert_eq!(engine.read_variable("Tank_Level"), Some(Value::Real(50.35)));
}

#[test]
fn physics_clamps_to_range() {
    let program = parse_program(
        "VAR Tank_Level : REAL := 0.05; Pump_Run : BOOL := FALSE; END_VAR",
    )
    .expect("parse");
    let config = ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        ..ScanConfig::default()
    };
    let mut engine = ScanEngine::new(program, config, 0).expect("load");
    engine.execute_cycle(10).expect("cycle");
    assert_eq!(engine.read_variable("Tank_Level"), Some(Value::Real(0.0)));
}

#[test]
fn engine_writes_round_to_two_decimals() {
    let program = parse_program("VAR Speed : REAL; END_VAR").expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    engine
        .write_variable("Speed", Value::Real(1.23456), 0)
        .expect("write");
    engine.execute_cycle(10).expect("cycle");
    assert_eq!(engine.read_variable("Speed"), Some(Value::Real(1.23)));
}

#[test]
fn reset_reevaluates_initialisers_and_keeps_program() {
    let program = parse_program(
        "VAR x : INT := 5; END_VAR
         x := x + 1;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    engine.execute_cycle(10).expect("cycle");
    engine.execute_cycle(20).expect("cycle");
    assert_eq!(engine.read_variable("x"), Some(Value::Int(7)));

    engine.reset(20).expect("reset");
    assert_eq!(engine.read_variable("x"), Some(Value::Int(5)));
    assert_eq!(engine.scan_count(), 0);

    engine.execute_cycle(30).expect("cycle");
    assert_eq!(engine.read_variable("x"), Some(Value::Int(6)));
}
