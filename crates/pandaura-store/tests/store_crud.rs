use pandaura_store::rows::{
    BranchRow, LogicFileRow, ProjectRow, SessionRow, Stage, TagLifecycle, TagRow, TagScope,
    TagSource, TagType, Vendor,
};
use pandaura_store::{Store, StoreError};

fn project(id: &str) -> ProjectRow {
    ProjectRow {
        id: id.into(),
        name: format!("Project {id}"),
        description: None,
        connection_json: Some(r#"{"vendor":"siemens","address":"10.0.0.5","port":102}"#.into()),
        created_at_ms: 1,
        updated_at_ms: 1,
    }
}

fn tag(project_id: &str, name: &str) -> TagRow {
    TagRow {
        id: format!("tag-{name}"),
        project_id: project_id.into(),
        name: name.into(),
        tag_type: TagType::Real,
        udt_type: None,
        value_json: Some("20.0".into()),
        address: Some("DB1.DBD0".into()),
        source: TagSource::Shadow,
        scope: TagScope::Global,
        lifecycle: TagLifecycle::Active,
        path: Some("plant/boiler/loop1".into()),
        alarms_json: None,
        read_only: false,
        requires_approval: false,
        updated_at_ms: 1,
    }
}

#[test]
fn project_crud_round_trip() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");

    let fetched = store.get_project("p1").expect("get");
    assert_eq!(fetched.name, "Project p1");

    store
        .update_project("p1", Some("Renamed"), None, None, 5)
        .expect("update");
    let fetched = store.get_project("p1").expect("get");
    assert_eq!(fetched.name, "Renamed");
    assert_eq!(fetched.updated_at_ms, 5);
    assert!(
        fetched.connection_json.is_some(),
        "untouched fields are preserved"
    );

    assert!(matches!(
        store.get_project("missing"),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn tag_names_are_unique_per_project() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    store.insert_project(&project("p2")).expect("insert");

    store.insert_tag(&tag("p1", "Temperature_PV")).expect("insert");
    let mut dup = tag("p1", "Temperature_PV");
    dup.id = "tag-dup".into();
    assert!(matches!(
        store.insert_tag(&dup),
        Err(StoreError::Conflict(_))
    ));

    // Same name in a different project is fine.
    let mut other = tag("p2", "Temperature_PV");
    other.id = "tag-other".into();
    store.insert_tag(&other).expect("insert");
}

#[test]
fn deleting_a_project_cascades() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    store.insert_tag(&tag("p1", "T1")).expect("insert tag");
    store
        .insert_logic_file(&LogicFileRow {
            id: "lf1".into(),
            project_id: "p1".into(),
            name: "main.st".into(),
            content: "x := 1;".into(),
            vendor: Vendor::Neutral,
            author: Some("ada".into()),
            updated_at_ms: 1,
        })
        .expect("insert logic");

    store.delete_project("p1").expect("delete");
    assert!(store.list_tags("p1").expect("list").is_empty());
    assert!(store.list_logic_files("p1").expect("list").is_empty());
}

#[test]
fn only_one_default_branch_per_project() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    let branch = |id: &str, name: &str, default| BranchRow {
        id: id.into(),
        project_id: "p1".into(),
        name: name.into(),
        stage: Stage::Main,
        parent_branch_id: None,
        is_default: default,
        created_at_ms: 1,
    };
    store.insert_branch(&branch("b1", "main", true)).expect("insert");
    assert!(matches!(
        store.insert_branch(&branch("b2", "dev", true)),
        Err(StoreError::Conflict(_))
    ));
    store.insert_branch(&branch("b3", "dev", false)).expect("insert");
    let default = store.default_branch("p1").expect("query").expect("exists");
    assert_eq!(default.id, "b1");
}

#[test]
fn sessions_expire() {
    let store = Store::open_in_memory().expect("open");
    store
        .insert_session(&SessionRow {
            id: "s1".into(),
            user_name: "ada".into(),
            token: "tok-1".into(),
            created_at_ms: 0,
            expires_at_ms: 100,
        })
        .expect("insert");

    assert!(store
        .get_session_by_token("tok-1", 50)
        .expect("query")
        .is_some());
    assert!(store
        .get_session_by_token("tok-1", 150)
        .expect("query")
        .is_none());
    assert_eq!(store.prune_sessions(150).expect("prune"), 1);
}

#[test]
fn logic_content_updates_stamp_author() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    store
        .insert_logic_file(&LogicFileRow {
            id: "lf1".into(),
            project_id: "p1".into(),
            name: "main.st".into(),
            content: "x := 1;".into(),
            vendor: Vendor::Rockwell,
            author: Some("ada".into()),
            updated_at_ms: 1,
        })
        .expect("insert");

    store
        .update_logic_content("lf1", "x := 2;", Some("grace"), 9)
        .expect("update");
    let file = store.get_logic_file("lf1").expect("get");
    assert_eq!(file.content, "x := 2;");
    assert_eq!(file.author.as_deref(), Some("grace"));
    assert_eq!(file.vendor, Vendor::Rockwell);
    assert_eq!(file.updated_at_ms, 9);
}

#[test]
fn aliases_resolve_and_collide_per_project() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    store.insert_tag(&tag("p1", "Temperature_PV")).expect("tag");

    store
        .add_tag_alias("p1", "BoilerTemp", "Temperature_PV", 1)
        .expect("alias");
    assert_eq!(
        store.resolve_tag_name("p1", "BoilerTemp").expect("resolve"),
        "Temperature_PV"
    );
    assert_eq!(
        store.resolve_tag_name("p1", "Temperature_PV").expect("resolve"),
        "Temperature_PV",
        "plain names pass through"
    );
    assert!(matches!(
        store.add_tag_alias("p1", "BoilerTemp", "Temperature_PV", 2),
        Err(StoreError::Conflict(_))
    ));
    assert!(
        store.add_tag_alias("p1", "Ghost", "NoSuchTag", 2).is_err(),
        "alias target must exist"
    );

    store.remove_tag_alias("p1", "BoilerTemp").expect("remove");
    assert_eq!(
        store.resolve_tag_name("p1", "BoilerTemp").expect("resolve"),
        "BoilerTemp"
    );
}

#[test]
fn bulk_lifecycle_update_supports_dry_run() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    store.insert_tag(&tag("p1", "A")).expect("tag");
    store.insert_tag(&tag("p1", "B")).expect("tag");

    let names = vec!["A".to_string(), "B".to_string(), "Ghost".to_string()];
    let preview = store
        .bulk_update_tag_lifecycle("p1", &names, TagLifecycle::Deprecated, true, 5)
        .expect("dry run");
    assert_eq!(preview.affected, vec!["A", "B"]);
    assert_eq!(preview.missing, vec!["Ghost"]);
    assert!(!preview.applied);
    assert_eq!(
        store.get_tag("p1", "A").expect("get").lifecycle,
        TagLifecycle::Active,
        "dry run writes nothing"
    );

    let applied = store
        .bulk_update_tag_lifecycle("p1", &names, TagLifecycle::Deprecated, false, 6)
        .expect("apply");
    assert!(applied.applied);
    assert_eq!(
        store.get_tag("p1", "B").expect("get").lifecycle,
        TagLifecycle::Deprecated
    );
}

#[test]
fn udt_members_round_trip_in_order() {
    let store = Store::open_in_memory().expect("open");
    store.insert_project(&project("p1")).expect("insert");
    let members = r#"[
        {"name":"Setpoint","type":"REAL","default":50.0},
        {"name":"Alarms","type":"ARRAY","arraySize":4,"udtType":null},
        {"name":"Mode","type":"INT","description":"0=manual 1=auto"}
    ]"#;
    store
        .insert_udt(&pandaura_store::rows::UdtRow {
            id: "udt1".into(),
            project_id: "p1".into(),
            name: "PidLoop".into(),
            description: Some("PID loop block".into()),
            members_json: members.into(),
            updated_at_ms: 1,
        })
        .expect("insert");

    let udt = store.get_udt("p1", "PidLoop").expect("get");
    let decoded: Vec<pandaura_store::rows::UdtMember> =
        serde_json::from_str(&udt.members_json).expect("decode");
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0].name, "Setpoint");
    assert_eq!(decoded[2].member_type, "INT");

    assert!(store
        .insert_udt(&pandaura_store::rows::UdtRow {
            id: "udt2".into(),
            project_id: "p1".into(),
            name: "PidLoop".into(),
            description: None,
            members_json: "[]".into(),
            updated_at_ms: 2,
        })
        .is_err());
    assert!(store
        .insert_udt(&pandaura_store::rows::UdtRow {
            id: "udt3".into(),
            project_id: "p1".into(),
            name: "Broken".into(),
            description: None,
            members_json: "not json".into(),
            updated_at_ms: 2,
        })
        .is_err());
}

#[test]
fn open_creates_the_database_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data").join("pandaura.db");
    let store = Store::open(&path).expect("open");
    store.insert_project(&project("p1")).expect("insert");
    drop(store);
    assert!(path.exists());

    let reopened = Store::open(&path).expect("reopen");
    assert_eq!(reopened.list_projects().expect("list").len(), 1);
}

#[test]
fn unknown_enum_values_are_rejected_on_parse() {
    assert!(Stage::parse("integration").is_err());
    assert!(TagType::parse("FLOAT").is_err());
    assert_eq!(Stage::parse_environment("production").expect("alias"), Stage::Prod);
}
