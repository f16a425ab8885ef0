use pandaura_runtime::engine::{ScanConfig, ScanEngine};
use pandaura_runtime::events::SUBSCRIBER_CAPACITY;
use pandaura_runtime::Value;
use pandaura_syntax::parse_program;

fn quiet_config() -> ScanConfig {
    ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        physics: Vec::new(),
        overflow_range: pandaura_runtime::OverflowRange::Int32,
        ..ScanConfig::default()
    }
}

#[test]
fn subscribers_see_tick_ordered_updates() {
    let program = parse_program(
        "VAR a : INT; b : INT; END_VAR
         a := a + 1;
         b := a * 2;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let events = engine.subscribe(vec!["a".into(), "b".into()]);

    engine.execute_cycle(10).expect("cycle");

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(received.len(), 2);
    // Intra-tick write order: `a` before `b`.
    assert_eq!(received[0].tag.as_str(), "a");
    assert_eq!(received[0].value, Value::Int(1));
    assert_eq!(received[1].tag.as_str(), "b");
    assert_eq!(received[1].value, Value::Int(2));
    assert_eq!(received[0].timestamp_ms, 10);
}

#[test]
fn multiple_subscribers_see_the_same_view() {
    let program = parse_program("VAR a : INT; END_VAR a := a + 1;").expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let first = engine.subscribe(vec!["a".into()]);
    let second = engine.subscribe(vec!["a".into()]);

    engine.execute_cycle(10).expect("cycle");

    let from_first: Vec<_> = first.try_iter().collect();
    let from_second: Vec<_> = second.try_iter().collect();
    assert_eq!(from_first, from_second);
}

#[test]
fn unfiltered_subscription_receives_system_variables() {
    let program = parse_program("VAR a : INT; END_VAR").expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let events = engine.subscribe(Vec::new());

    engine.execute_cycle(10).expect("cycle");
    let tags: Vec<_> = events.try_iter().map(|e| e.tag).collect();
    assert!(tags.iter().any(|t| t == "ScanCount"));
}

#[test]
fn slow_subscriber_loses_messages_without_stalling() {
    let program = parse_program(
        "VAR n : DINT; END_VAR
         n := n + 1;",
    )
    .expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    // Receiver deliberately never drained.
    let _events = engine.subscribe(vec!["n".into()]);

    for i in 1..=(SUBSCRIBER_CAPACITY as i64 + 50) {
        engine.execute_cycle(i * 10).expect("cycle");
    }
    assert!(engine.status().subscribers >= 1);
}

#[test]
fn disconnected_subscriber_is_dropped() {
    let program = parse_program("VAR a : INT; END_VAR a := a + 1;").expect("parse");
    let mut engine = ScanEngine::new(program, quiet_config(), 0).expect("load");
    let events = engine.subscribe(vec!["a".into()]);
    drop(events);

    engine.execute_cycle(10).expect("cycle");
    assert_eq!(engine.status().subscribers, 0);
}
