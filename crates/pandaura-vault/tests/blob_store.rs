use pandaura_vault::blob::{compress, decompress, BlobStore};
use pandaura_vault::delta::{DeltaChange, LineDelta};
use pandaura_vault::VaultError;

#[test]
fn compress_then_decompress_is_identity() {
    let payload = "VAR x : INT; END_VAR\n".repeat(200);
    let compressed = compress(payload.as_bytes()).expect("compress");
    assert!(compressed.len() < payload.len(), "repetitive text shrinks");
    let restored = decompress(&compressed).expect("decompress");
    assert_eq!(restored, payload.as_bytes());
}

#[test]
fn delta_round_trip_reproduces_new_content() {
    let base = "one\ntwo\nthree\nfour\nfive\n";
    let new = "one\n2\nthree\nfive\nsix\n";
    let delta = LineDelta::encode(base, new);
    assert_eq!(delta.apply(base).expect("apply"), new);
}

#[test]
fn delta_handles_trailing_newline_differences() {
    let base = "a\nb";
    let new = "a\nb\n";
    let delta = LineDelta::encode(base, new);
    assert_eq!(delta.apply(base).expect("apply"), new);
}

#[test]
fn delta_json_shape_is_stable() {
    let delta = LineDelta::encode("a\nb\n", "a\nc\n");
    let json = delta.to_json().expect("json");
    assert!(json.contains("\"type\":\"line-delta\""));
    assert!(json.contains("\"add\""));
    assert!(json.contains("\"delete\""));
    let decoded = LineDelta::from_json(&json).expect("decode");
    assert_eq!(decoded, delta);
}

#[test]
fn unknown_delta_type_is_rejected() {
    let result = LineDelta::from_json(r#"{"type":"word-delta","changes":[]}"#);
    assert!(matches!(result, Err(VaultError::Validation(_))));
}

#[test]
fn delta_change_variants_serialize_by_kind() {
    let add = serde_json::to_string(&DeltaChange::Add {
        line: 3,
        content: "x".into(),
    })
    .expect("json");
    assert_eq!(add, r#"{"type":"add","line":3,"content":"x"}"#);
    let delete = serde_json::to_string(&DeltaChange::Delete { line: 2 }).expect("json");
    assert_eq!(delete, r#"{"type":"delete","line":2}"#);
}

#[test]
fn stored_blob_round_trips_with_checksum() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BlobStore::new(dir.path());
    let content = "PROGRAM Main\nx := 1;\nEND_PROGRAM\n".repeat(50);

    let stored = store
        .store_file("proj1", "ver1", "src/main.st", &content, None)
        .expect("store");
    assert!(stored.is_compressed, "repetitive content compresses");
    assert!(!stored.is_delta);
    assert!(stored.stored_size < stored.original_size);

    let restored = store
        .retrieve(
            &stored.storage_path,
            stored.is_compressed,
            stored.is_delta,
            None,
            &stored.sha256,
        )
        .expect("retrieve");
    assert_eq!(restored, content);
}

#[test]
fn small_change_against_base_stores_as_delta() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BlobStore::new(dir.path());
    let base: String = (1..=100).map(|n| format!("rung {n}\n")).collect();
    let new = base.replace("rung 50\n", "rung fifty\n");

    let stored = store
        .store_file("proj1", "ver2", "main.st", &new, Some(&base))
        .expect("store");
    assert!(stored.is_delta, "one changed line out of 100 deltas well");

    let restored = store
        .retrieve(
            &stored.storage_path,
            stored.is_compressed,
            stored.is_delta,
            Some(&base),
            &stored.sha256,
        )
        .expect("retrieve");
    assert_eq!(restored, new);
}

#[test]
fn corrupted_blob_fails_integrity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BlobStore::new(dir.path());
    let stored = store
        .store_file("proj1", "ver1", "main.st", "x := 1;\n", None)
        .expect("store");

    let wrong = "0".repeat(64);
    let result = store.retrieve(
        &stored.storage_path,
        stored.is_compressed,
        stored.is_delta,
        None,
        &wrong,
    );
    assert!(matches!(result, Err(VaultError::Integrity { .. })));
}

#[test]
fn hostile_paths_are_sanitised() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BlobStore::new(dir.path());
    let stored = store
        .store_file("proj1", "ver1", "../../etc/passwd", "boo", None)
        .expect("store");
    assert!(
        !stored.storage_path.contains(".."),
        "dot-dot never reaches disk: {}",
        stored.storage_path
    );
    let abs = dir.path().join(&stored.storage_path);
    assert!(abs.starts_with(dir.path()));
}
