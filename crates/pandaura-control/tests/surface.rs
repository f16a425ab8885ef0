use std::collections::HashMap;
use std::time::Duration;

use pandaura_control::config::DbProfile;
use pandaura_control::surface::{live_push_advisories, PushTarget, SyncSurface};
use pandaura_control::{ControlError, Event, Settings};
use pandaura_runtime::engine::{ScanConfig, ScanEngine};
use pandaura_runtime::scheduler::{EngineRunner, StdClock};
use pandaura_runtime::Value;
use pandaura_store::rows::{LogicFileRow, ProjectRow, Vendor};
use pandaura_store::Store;
use pandaura_syntax::parse_program;
use pandaura_vault::blob::BlobStore;

fn settings_from(pairs: &[(&str, &str)]) -> Settings {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn settings_defaults_and_overrides() {
    let defaults = settings_from(&[]);
    assert_eq!(defaults.port, 5000);
    assert_eq!(defaults.host.as_str(), "127.0.0.1");
    assert_eq!(defaults.sync_interval_ms, 1000);
    assert_eq!(defaults.db_profile, DbProfile::Development);

    let custom = settings_from(&[
        ("PORT", "8080"),
        ("PANDAURA_HOST", "0.0.0.0"),
        ("LOG_LEVEL", "debug"),
        ("SYNC_INTERVAL", "250"),
        ("NODE_ENV", "production"),
        ("DB_PATH", "/var/lib/pandaura/db.sqlite"),
        ("SOME_UNKNOWN_KEY", "ignored"),
    ]);
    assert_eq!(custom.port, 8080);
    assert_eq!(custom.host.as_str(), "0.0.0.0");
    assert_eq!(custom.log_level.as_str(), "debug");
    assert_eq!(custom.sync_interval_ms, 250);
    assert_eq!(custom.db_profile, DbProfile::Production);
    assert_eq!(
        custom.db_path.to_string_lossy(),
        "/var/lib/pandaura/db.sqlite"
    );
}

#[test]
fn malformed_numeric_env_values_fall_back_to_defaults() {
    let settings = settings_from(&[("PORT", "not-a-port"), ("SYNC_INTERVAL", "-3")]);
    assert_eq!(settings.port, 5000);
    assert_eq!(settings.sync_interval_ms, 1000);
}

#[test]
fn event_json_uses_the_wire_type_names() {
    let event = Event::VariableUpdate {
        tag: "Temperature_PV".into(),
        value: Value::Real(21.5),
        timestamp: 1000,
    };
    let json = event.to_json().expect("json");
    assert!(json.contains(r#""type":"variableUpdate""#), "got: {json}");
    assert!(json.contains(r#""tag":"Temperature_PV""#));

    let auth = Event::AuthFailed {
        reason: "bad token".into(),
    };
    assert!(auth.to_json().expect("json").contains(r#""type":"auth_failed""#));

    let beat = Event::HeartbeatResponse { timestamp: 7 };
    assert!(beat
        .to_json()
        .expect("json")
        .contains(r#""type":"heartbeat_response""#));
}

#[test]
fn live_push_advisories_cover_the_three_classes() {
    let clean = "VAR x : INT; END_VAR x := 1;";
    assert!(live_push_advisories(clean).is_empty());

    let risky = "(* TODO tie into EMERGENCY stop chain *) VAR x : INT; END_VAR";
    let advisories = live_push_advisories(risky);
    let codes: Vec<&str> = advisories.iter().map(|a| a.code).collect();
    assert!(codes.contains(&"emergency-system-reference"));
    assert!(codes.contains(&"unfinished-markers"));

    let huge = format!("VAR x : INT; END_VAR\n{}", "x := x + 1;\n".repeat(30_000));
    let codes: Vec<&str> = live_push_advisories(&huge).iter().map(|a| a.code).collect();
    assert!(codes.contains(&"oversized-push"));
}

fn running_surface() -> (
    SyncSurface<StdClock>,
    pandaura_runtime::scheduler::EngineHandle<StdClock>,
    tempfile::TempDir,
) {
    let program = parse_program("VAR Level : REAL; END_VAR").expect("parse");
    let config = ScanConfig {
        latency_base_ms: 0.0,
        latency_jitter_ms: 0.0,
        physics: Vec::new(),
        ..ScanConfig::default()
    };
    let engine = ScanEngine::new(program, config, 0).expect("load");
    let handle = EngineRunner::new(engine, StdClock::new())
        .spawn("surface-test")
        .expect("spawn");
    let control = handle.control();

    let store = Store::open_in_memory().expect("store");
    store
        .insert_project(&ProjectRow {
            id: "p1".into(),
            name: "Plant".into(),
            description: None,
            connection_json: None,
            created_at_ms: 1,
            updated_at_ms: 1,
        })
        .expect("project");
    let dir = tempfile::tempdir().expect("tempdir");
    let blobs = BlobStore::new(dir.path().to_path_buf());
    (SyncSurface::new(control, store, blobs), handle, dir)
}

#[test]
fn set_variable_reaches_the_runtime() {
    let (surface, mut handle, _dir) = running_surface();
    surface
        .set_variable("Level", Value::Real(42.0))
        .expect("set");
    std::thread::sleep(Duration::from_millis(80));
    let value = surface.engine().read_variable("Level").expect("read");
    assert_eq!(value, Some(Value::Real(42.0)));
    handle.stop();
    handle.join().expect("join");
}

#[test]
fn stream_tags_delivers_scan_updates() {
    let (surface, mut handle, _dir) = running_surface();
    let events = surface.stream_tags(vec!["Level".into()]).expect("stream");
    surface
        .set_variable("Level", Value::Real(7.0))
        .expect("set");
    let event = events
        .recv_timeout(Duration::from_millis(500))
        .expect("event arrives");
    assert_eq!(event.tag.as_str(), "Level");
    assert_eq!(event.value, Value::Real(7.0));
    handle.stop();
    handle.join().expect("join");
}

#[test]
fn push_logic_validates_before_swapping() {
    let (surface, mut handle, _dir) = running_surface();
    surface
        .store()
        .insert_logic_file(&LogicFileRow {
            id: "bad".into(),
            project_id: "p1".into(),
            name: "bad.st".into(),
            content: "x := ;".into(),
            vendor: Vendor::Neutral,
            author: None,
            updated_at_ms: 1,
        })
        .expect("insert");
    let err = surface.push_logic("bad", PushTarget::Shadow).unwrap_err();
    assert!(matches!(err, ControlError::InvalidLogic(_)));

    surface
        .store()
        .insert_logic_file(&LogicFileRow {
            id: "good".into(),
            project_id: "p1".into(),
            name: "good.st".into(),
            content: "VAR Counter : DINT; END_VAR Counter := Counter + 1;".into(),
            vendor: Vendor::Neutral,
            author: None,
            updated_at_ms: 1,
        })
        .expect("insert");
    let report = surface.push_logic("good", PushTarget::Shadow).expect("push");
    assert!(report.warnings.is_empty());

    std::thread::sleep(Duration::from_millis(80));
    let counter = surface.engine().read_variable("Counter").expect("read");
    assert!(matches!(counter, Some(Value::Int(n)) if n > 0));
    handle.stop();
    handle.join().expect("join");
}

#[test]
fn tag_dependencies_subtract_declarations() {
    let (surface, mut handle, _dir) = running_surface();
    surface
        .store()
        .insert_logic_file(&LogicFileRow {
            id: "deps".into(),
            project_id: "p1".into(),
            name: "deps.st".into(),
            content: "VAR Local : INT; END_VAR Local := Remote_PV + 1;".into(),
            vendor: Vendor::Neutral,
            author: None,
            updated_at_ms: 1,
        })
        .expect("insert");
    let deps = surface.tag_dependencies("deps").expect("deps");
    let names: Vec<&str> = deps.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["Remote_PV"]);
    handle.stop();
    handle.join().expect("join");
}

#[test]
fn alarm_rules_enforce_threshold_ordering() {
    use pandaura_control::surface::validate_alarm_rules;
    assert!(validate_alarm_rules(r#"{"low":10.0,"high":50.0,"critical":90.0}"#).is_ok());
    assert!(validate_alarm_rules(r#"{"high":50.0}"#).is_ok());
    assert!(validate_alarm_rules(r#"{"low":60.0,"high":50.0}"#).is_err());
    assert!(validate_alarm_rules(r#"{"high":95.0,"critical":90.0}"#).is_err());
}

#[test]
fn system_status_reports_running_state() {
    let (surface, mut handle, _dir) = running_surface();
    std::thread::sleep(Duration::from_millis(50));
    let status = surface.system_status().expect("status");
    match status {
        Event::SystemStatus {
            state, scan_count, ..
        } => {
            assert_eq!(state, "running");
            assert!(scan_count > 0);
        }
        other => panic!("expected systemStatus, got {other:?}"),
    }
    handle.stop();
    handle.join().expect("join");
}
