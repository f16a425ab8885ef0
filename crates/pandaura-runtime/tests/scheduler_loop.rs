use std::time::Duration;

use pandaura_runtime::engine::{ScanConfig, ScanEngine};
use pandaura_runtime::scheduler::{EngineRunner, EngineState, ManualClock, StdClock};
use pandaura_runtime::Value;
use pandaura_syntax::parse_program;

fn counting_engine() -> ScanEngine {
    let program = parse_program(
        "VAR n : DINT; END_VAR
         n := n + 1;",
    )
    .expect("parse");
    let config = ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        physics: Vec::new(),
        overflow_range: pandaura_runtime::OverflowRange::Int32,
        ..ScanConfig::default()
    };
    ScanEngine::new(program, config, 0).expect("load")
}

#[test]
fn runner_ticks_with_a_manual_clock() {
    let clock = ManualClock::new();
    let mut runner = EngineRunner::new(counting_engine(), clock.clone());
    clock.set_time(10);
    runner.tick().expect("tick");
    clock.set_time(20);
    runner.tick().expect("tick");
    assert_eq!(runner.engine().read_variable("n"), Some(Value::Int(2)));
    assert_eq!(runner.engine().scan_count(), 2);
}

#[test]
fn spawned_loop_runs_and_stops_at_tick_boundary() {
    let clock = StdClock::new();
    let runner = EngineRunner::new(counting_engine(), clock);
    let mut handle = runner.spawn("scan-test").expect("spawn");
    let control = handle.control();

    std::thread::sleep(Duration::from_millis(100));
    let status = control.status().expect("status");
    assert!(status.scan_count > 0, "loop is ticking");

    handle.stop();
    handle.join().expect("join");
    assert_eq!(handle.state(), EngineState::Stopped);
}

#[test]
fn pause_suspends_and_resume_restarts() {
    let clock = StdClock::new();
    let runner = EngineRunner::new(counting_engine(), clock);
    let mut handle = runner.spawn("scan-pause").expect("spawn");
    let control = handle.control();

    control.pause().expect("pause");
    std::thread::sleep(Duration::from_millis(50));
    let paused_count = control.status().expect("status").scan_count;
    std::thread::sleep(Duration::from_millis(50));
    let still_paused = control.status().expect("status").scan_count;
    assert_eq!(paused_count, still_paused, "no cycles while paused");
    assert_eq!(control.state(), EngineState::Paused);

    control.resume().expect("resume");
    std::thread::sleep(Duration::from_millis(60));
    let resumed = control.status().expect("status").scan_count;
    assert!(resumed > still_paused, "cycles resumed");

    handle.stop();
    handle.join().expect("join");
}

#[test]
fn step_runs_exactly_one_cycle_while_paused() {
    let clock = StdClock::new();
    let runner = EngineRunner::new(counting_engine(), clock);
    let mut handle = runner.spawn("scan-step").expect("spawn");
    let control = handle.control();

    control.pause().expect("pause");
    std::thread::sleep(Duration::from_millis(40));
    let before = control.status().expect("status").scan_count;
    control.step().expect("step");
    let after = control.status().expect("status").scan_count;
    assert_eq!(after, before + 1);

    handle.stop();
    handle.join().expect("join");
}

#[test]
fn command_writes_apply_before_the_next_tick() {
    let clock = StdClock::new();
    let program = parse_program(
        "VAR Gate : BOOL; Hits : DINT; END_VAR
         IF Gate THEN Hits := Hits + 1; END_IF",
    )
    .expect("parse");
    let config = ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        physics: Vec::new(),
        overflow_range: pandaura_runtime::OverflowRange::Int32,
        ..ScanConfig::default()
    };
    let engine = ScanEngine::new(program, config, 0).expect("load");
    let runner = EngineRunner::new(engine, clock);
    let mut handle = runner.spawn("scan-write").expect("spawn");
    let control = handle.control();

    control
        .write_variable("Gate", Value::Bool(true))
        .expect("write");
    std::thread::sleep(Duration::from_millis(80));
    let hits = control.read_variable("Hits").expect("read");
    assert!(matches!(hits, Some(Value::Int(n)) if n > 0));

    handle.stop();
    handle.join().expect("join");
}

#[test]
fn reset_clears_state_through_the_control_surface() {
    let clock = StdClock::new();
    let runner = EngineRunner::new(counting_engine(), clock);
    let mut handle = runner.spawn("scan-reset").expect("spawn");
    let control = handle.control();

    std::thread::sleep(Duration::from_millis(60));
    control.pause().expect("pause");
    std::thread::sleep(Duration::from_millis(30));
    control.reset().expect("reset");
    control.step().expect("step");
    let snapshot = control.snapshot().expect("snapshot");
    assert_eq!(snapshot.get("n"), Some(&Value::Int(1)));

    handle.stop();
    handle.join().expect("join");
}
