use pandaura_store::rows::{BranchRow, ProjectRow, Stage, VersionStatus};
use pandaura_store::Store;
use pandaura_vault::blob::BlobStore;
use pandaura_vault::releases;
use pandaura_vault::snapshots::CreateSnapshot;
use pandaura_vault::versions::{CreateVersion, VersionEngine};
use pandaura_vault::VaultError;

struct Fixture {
    store: Store,
    blobs: BlobStore,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open_in_memory().expect("open");
    store
        .insert_project(&ProjectRow {
            id: "p1".into(),
            name: "Boiler".into(),
            description: None,
            connection_json: None,
            created_at_ms: 1,
            updated_at_ms: 1,
        })
        .expect("project");
    store
        .insert_branch(&BranchRow {
            id: "b1".into(),
            project_id: "p1".into(),
            name: "main".into(),
            stage: Stage::Main,
            parent_branch_id: None,
            is_default: true,
            created_at_ms: 1,
        })
        .expect("branch");
    Fixture {
        store,
        blobs: BlobStore::new(dir.path()),
        _dir: dir,
    }
}

#[test]
fn first_version_gets_v1_and_no_parent() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "initial capture")
                .with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");
    assert_eq!(version.label, "v1.0.0");
    assert_eq!(version.parent_version_id, None);
    assert_eq!(version.status, VersionStatus::Draft);
    assert_eq!(version.approvals_required, 3);

    let files = fx.store.list_version_files(&version.id).expect("files");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].change_type.as_str(), "added");
}

#[test]
fn labels_auto_increment_patch_and_chain_links() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let v1 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("v1");
    let v2 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "two").with_file("main.st", "x := 2;\n", "logic"),
        )
        .expect("v2");
    assert_eq!(v2.label, "v1.0.1");
    assert_eq!(v2.parent_version_id.as_deref(), Some(v1.id.as_str()));

    let files = fx.store.list_version_files(&v2.id).expect("files");
    assert_eq!(files[0].change_type.as_str(), "modified");
    assert!(files[0].diff_preview.as_deref().unwrap_or("").contains("-x := 1;"));
}

#[test]
fn removing_a_file_records_a_deletion_tombstone() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let v1 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "two files")
                .with_file("main.st", "x := 1;\n", "logic")
                .with_file("aux.st", "a := 1;\nb := 2;\n", "logic"),
        )
        .expect("v1");
    let v2 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "drops aux")
                .with_file("main.st", "x := 2;\n", "logic"),
        )
        .expect("v2");

    let files = fx.store.list_version_files(&v2.id).expect("files");
    assert_eq!(files.len(), 2, "capture plus the tombstone");
    let tombstone = files
        .iter()
        .find(|f| f.path == "aux.st")
        .expect("tombstone for the removed path");
    assert_eq!(tombstone.change_type.as_str(), "deleted");
    assert_eq!(tombstone.lines_added, 0);
    assert_eq!(tombstone.lines_deleted, 3, "two statements plus the trailing line");
    assert!(tombstone.storage_path.is_empty(), "no stored content");

    // Tombstones carry no content and never materialise.
    let materialized = engine.materialize_files(&v2.id).expect("materialize");
    let paths: Vec<&str> = materialized.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["main.st"]);

    // The comparison sees the same deletion.
    let comparison = engine.compare_versions(&v1.id, &v2.id).expect("compare");
    assert_eq!(comparison.totals.files_deleted, 1);

    // A deletion is recorded once, not re-emitted by later captures.
    let v3 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "unchanged set")
                .with_file("main.st", "x := 3;\n", "logic"),
        )
        .expect("v3");
    let files = fx.store.list_version_files(&v3.id).expect("files");
    assert!(files.iter().all(|f| f.path != "aux.st"));
}

#[test]
fn empty_file_list_is_rejected() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let result = engine.create_version(CreateVersion::new("p1", "b1", "ada", "nothing"));
    assert!(matches!(result, Err(VaultError::Validation(_))));
}

#[test]
fn materialized_files_match_their_checksums() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let big: String = (1..=80).map(|n| format!("rung {n}\n")).collect();
    let v1 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", &big, "logic"),
        )
        .expect("v1");
    let changed = big.replace("rung 40\n", "rung forty\n");
    let v2 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "two").with_file("main.st", &changed, "logic"),
        )
        .expect("v2");

    // v2 should have delta-stored main.st; materialisation resolves it
    // through the parent and verifies the recorded sha256.
    let files = fx.store.list_version_files(&v2.id).expect("files");
    assert!(files[0].is_delta);
    let materialized = engine.materialize_files(&v2.id).expect("materialize");
    assert_eq!(materialized[0].content, changed);
    let _ = v1;
}

#[test]
fn status_transitions_are_gated() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");

    // draft -> released skips staged and must fail.
    assert!(matches!(
        engine.update_status(&version.id, VersionStatus::Released, "ada"),
        Err(VaultError::Conflict(_))
    ));
    engine
        .update_status(&version.id, VersionStatus::Staged, "ada")
        .expect("stage");
    engine
        .update_status(&version.id, VersionStatus::Released, "ada")
        .expect("release");
    engine
        .update_status(&version.id, VersionStatus::Deprecated, "ada")
        .expect("deprecate");

    let log = fx.store.list_changelog(&version.id).expect("log");
    let actions: Vec<&str> = log.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["created", "staged", "released", "deprecated"]);
}

#[test]
fn signing_is_idempotent_per_signer_and_replaced_by_a_new_signer() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");

    let first = engine.sign_version(&version.id, "ada").expect("sign");
    let again = engine.sign_version(&version.id, "ada").expect("re-sign");
    assert_eq!(first, again, "same signer re-sign is a no-op");

    let other = engine.sign_version(&version.id, "grace").expect("new signer");
    assert_ne!(first, other);
    let row = fx.store.get_version(&version.id).expect("get");
    assert_eq!(row.signed_by.as_deref(), Some("grace"));
    assert!(row.signed);
}

#[test]
fn duplicate_approver_is_rejected() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");

    assert_eq!(engine.approve_version(&version.id, "ada").expect("a1"), 1);
    assert_eq!(engine.approve_version(&version.id, "grace").expect("a2"), 2);
    assert!(matches!(
        engine.approve_version(&version.id, "ada"),
        Err(VaultError::Conflict(_))
    ));
    let row = fx.store.get_version(&version.id).expect("get");
    assert_eq!(row.approvals, 2);
}

#[test]
fn compare_versions_reports_line_stats() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let old: String = (1..=10).map(|n| format!("line {n}\n")).collect();
    let new: String = (1..=10)
        .map(|n| {
            if n == 7 {
                "line seven\n".to_string()
            } else {
                format!("line {n}\n")
            }
        })
        .chain(["tail 1\n".to_string(), "tail 2\n".to_string()])
        .collect();

    let v1 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", &old, "logic"),
        )
        .expect("v1");
    let v2 = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "two").with_file("main.st", &new, "logic"),
        )
        .expect("v2");

    let comparison = engine.compare_versions(&v1.id, &v2.id).expect("compare");
    assert_eq!(comparison.totals.files_modified, 1);
    assert_eq!(comparison.totals.total_lines_added, 3);
    assert_eq!(comparison.totals.total_lines_deleted, 1);
}

#[test]
fn snapshot_names_are_unique_per_project() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");

    let make = |name: &str| CreateSnapshot {
        project_id: "p1".into(),
        version_id: version.id.clone(),
        name: name.into(),
        description: None,
        tags: vec!["golden".into()],
        created_by: "ada".into(),
    };
    engine.create_snapshot(make("baseline")).expect("first");
    assert!(matches!(
        engine.create_snapshot(make("baseline")),
        Err(VaultError::Conflict(_))
    ));
}

#[test]
fn promotion_must_walk_the_stage_ladder() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");
    let snapshot = engine
        .create_snapshot(CreateSnapshot {
            project_id: "p1".into(),
            version_id: version.id.clone(),
            name: "baseline".into(),
            description: None,
            tags: Vec::new(),
            created_by: "ada".into(),
        })
        .expect("snapshot");

    // dev -> staging skips qa.
    let err = engine
        .promote_snapshot(&snapshot.id, Stage::Staging, "ada", None)
        .unwrap_err();
    match err {
        VaultError::PreconditionFailed(msg) => {
            assert!(msg.contains("requires prior QA promotion"), "got: {msg}")
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }

    let qa = engine
        .promote_snapshot(&snapshot.id, Stage::Qa, "ada", None)
        .expect("dev->qa");
    assert!(qa.release.is_none(), "qa promotion mints no release");

    let staging = engine
        .promote_snapshot(&snapshot.id, Stage::Staging, "ada", Some("ready"))
        .expect("qa->staging");
    let release = staging.release.expect("staging mints a release");
    assert_eq!(release.environment, Stage::Staging);
    assert!(release.signed);

    // The bundled version ends up released.
    let row = fx.store.get_version(&version.id).expect("get");
    assert_eq!(row.status, VersionStatus::Released);

    let prod = engine
        .promote_snapshot(&snapshot.id, Stage::Prod, "ada", None)
        .expect("staging->prod");
    assert_eq!(prod.release.expect("prod release").environment, Stage::Prod);
}

#[test]
fn release_bundle_round_trips() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one")
                .with_file("src/main.st", "x := 1;\n", "logic")
                .with_file("config/io.json", "{\"slots\":4}", "config"),
        )
        .expect("create");
    engine
        .update_status(&version.id, VersionStatus::Staged, "ada")
        .expect("stage");

    let release = releases::create_release(
        &engine,
        releases::CreateRelease {
            project_id: "p1".into(),
            snapshot_id: None,
            version_id: version.id.clone(),
            name: None,
            environment: Stage::Staging,
            created_by: "ada".into(),
        },
    )
    .expect("release");

    let bytes = fx.blobs.read_raw(&release.bundle_path).expect("read bundle");
    assert_eq!(
        pandaura_vault::blob::BlobStore::checksum(&bytes),
        release.bundle_checksum
    );

    let document = releases::open_bundle(&bytes).expect("open");
    assert_eq!(document.release_id, release.id);
    assert_eq!(document.files.len(), 2);

    let dest = tempfile::tempdir().expect("dest");
    let written = releases::extract_bundle(&bytes, dest.path()).expect("extract");
    assert_eq!(written.len(), 2);
    let main = std::fs::read_to_string(dest.path().join("src/main.st")).expect("read");
    assert_eq!(main, "x := 1;\n");
}

#[test]
fn promote_release_appends_metadata_and_counts() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    let version = engine
        .create_version(
            CreateVersion::new("p1", "b1", "ada", "one").with_file("main.st", "x := 1;\n", "logic"),
        )
        .expect("create");
    engine
        .update_status(&version.id, VersionStatus::Staged, "ada")
        .expect("stage");
    let release = releases::create_release(
        &engine,
        releases::CreateRelease {
            project_id: "p1".into(),
            snapshot_id: None,
            version_id: version.id,
            name: Some("r1".into()),
            environment: Stage::Staging,
            created_by: "ada".into(),
        },
    )
    .expect("release");

    let promoted =
        releases::promote_release(&fx.store, &release.id, Stage::Prod, "grace").expect("promote");
    assert_eq!(promoted.linked_deploys, 1);
    assert!(promoted.last_deployed_at_ms.is_some());
    assert!(promoted.metadata_json.contains("\"promoted_by\":\"grace\""));
}

#[test]
fn retention_prunes_old_versions_and_blobs() {
    let fx = fixture();
    let engine = VersionEngine::new(&fx.store, &fx.blobs);
    for n in 0..5 {
        engine
            .create_version(
                CreateVersion::new("p1", "b1", "ada", &format!("capture {n}"))
                    .with_file("main.st", &format!("x := {n};\n"), "logic"),
            )
            .expect("create");
    }
    let pruned = engine.prune_versions("p1", 2).expect("prune");
    assert_eq!(pruned, 3);
    assert_eq!(fx.store.list_versions("p1").expect("list").len(), 2);
}
