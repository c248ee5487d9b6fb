mod common;

use common::*;
use playgraph::model::VariableType;
use playgraph::prelude::*;
use serde_json::json;
use std::time::{Duration, Instant};

fn populated_store() -> EntityStore {
    let (mut store, scope_id) = store_with_scope();
    let entry = entry_marker_id(&scope_id, Section::Main);
    add_container(&mut store, "b1", None, Section::Main);
    add_container(&mut store, "b2", Some("b1"), Section::Fallback);
    add_task(&mut store, "t1", Some("b1"), Section::Primary);
    add_task(&mut store, "t2", Some("b2"), Section::Primary);
    add_task(&mut store, "t3", None, Section::Main);
    chain(&mut store, Section::Main, &entry, &["b1", "t3"]);
    chain(&mut store, Section::Primary, &entry_marker_id("b1", Section::Primary), &["t1"]);

    let attrs = json!({ "become": true, "tags": ["web"] }).as_object().cloned().unwrap();
    store.update_attributes("t1", attrs);
    store.resize_node("b1", 800.0, 600.0, 0.0, 0.0);
    store.set_variables(vec![
        Variable::new("zeta", VariableType::String),
        Variable::new("alpha", VariableType::Int),
    ]);

    store.create_scope("Databases");
    store
}

#[test]
fn test_round_trip_reproduces_store() {
    let store = populated_store();
    let json = PlaybookDocument::from_store(&store).to_json().unwrap();
    let restored = PlaybookDocument::from_json(&json).unwrap().into_store("u-1", "amy");

    assert_eq!(restored.scopes().len(), 2);
    for scope in store.scopes() {
        assert_eq!(restored.scope(&scope.id), Some(scope));
    }
    assert_eq!(restored.active_scope_id(), store.active_scope_id());

    let variables: Vec<&str> = restored
        .active_scope()
        .unwrap()
        .variables
        .iter()
        .map(|v| v.key.as_str())
        .collect();
    assert_eq!(variables, vec!["zeta", "alpha"]);
    assert_consistent(&restored);
}

#[test]
fn test_document_shape() {
    let store = populated_store();
    let value = serde_json::to_value(PlaybookDocument::from_store(&store)).unwrap();

    let nodes = value["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 5);
    assert!(nodes.iter().all(|n| n["scopeId"].is_string()));
    let b1 = nodes.iter().find(|n| n["id"] == "b1").unwrap();
    assert_eq!(b1["members"]["primary"], json!(["t1"]));
    assert_eq!(b1["members"]["fallback"], json!(["b2"]));

    let link = &value["links"][0];
    assert!(link["type"].is_string());
    assert_eq!(value["variables"][0]["name"], "zeta");
    assert!(value["collapsedSections"].as_array().unwrap().iter().any(|s| s == "b1:final"));
}

#[test]
fn test_load_regenerates_membership_from_children() {
    let doc = json!({
        "scopes": [{ "id": "p", "name": "play" }],
        "nodes": [
            { "scopeId": "p", "id": "blk", "kind": "container", "parentSection": "main",
              "members": { "primary": ["t2", "ghost", "t2"] } },
            { "scopeId": "p", "id": "t1", "kind": "task", "parentId": "blk", "parentSection": "primary" },
            { "scopeId": "p", "id": "t2", "kind": "task", "parentId": "blk", "parentSection": "primary" }
        ],
        "variables": [
            { "scopeId": "p", "name": "port", "pattern": "(" },
            { "scopeId": "p", "name": "port" }
        ]
    });
    let store = PlaybookDocument::from_json(&doc.to_string())
        .unwrap()
        .into_store("u-1", "amy");
    let scope = store.scope("p").unwrap();

    assert_eq!(scope.children("blk", Section::Primary), ["t2".to_string(), "t1".to_string()]);
    assert_eq!(scope.variables.len(), 1);
    assert!(scope.variables[0].validation_pattern.is_none());
    assert_consistent(&store);
}

#[test]
fn test_editor_saves_to_file_after_quiet_period() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("playbook.json");
    let mut sink = JsonFileSink::new(path.to_str().unwrap());
    let config = EngineConfig::builder()
        .save_quiet_period(Duration::from_millis(500))
        .build();
    let mut editor = Editor::new(config.clone(), "play");
    let start = Instant::now();

    editor.edit(start, |s| s.add_node(Node::task("t1", "Install")));
    assert_eq!(editor.tick(start + Duration::from_millis(100), &mut sink), &SaveStatus::Dirty);
    assert!(!path.exists());
    assert_eq!(editor.tick(start + Duration::from_millis(600), &mut sink), &SaveStatus::Saved);

    let reopened = Editor::open(config, PlaybookDocument::from_file(path.to_str().unwrap()).unwrap());
    assert!(reopened.store().node("t1").is_some());
}

#[test]
fn test_failed_save_keeps_editing_possible() {
    let mut sink = JsonFileSink::new("/nonexistent-dir/playbook.json");
    let config = EngineConfig::builder().save_quiet_period(Duration::ZERO).build();
    let mut editor = Editor::new(config, "play");
    let now = Instant::now();

    editor.edit(now, |s| s.add_node(Node::task("t1", "Install")));
    assert!(matches!(editor.tick(now, &mut sink), SaveStatus::Failed(_)));
    assert!(editor.edit(now, |s| s.add_node(Node::task("t2", "Start"))).is_applied());
    assert_eq!(editor.save_status(), &SaveStatus::Dirty);
    assert_eq!(editor.store().active_scope().unwrap().node_count(), 4 + 2);
}

#[test]
fn test_round_trip_keeps_links_left_across_sections_by_remote_moves() {
    let (mut store, scope_id) = store_with_scope();
    add_container(&mut store, "b1", None, Section::Main);
    add_task(&mut store, "t1", None, Section::Main);
    chain(&mut store, Section::Main, &entry_marker_id(&scope_id, Section::Main), &["t1"]);

    let remote_move = Mutation::NodeMove(playgraph::mutation::NodeMove {
        node_id: "t1".into(),
        x: 10.0,
        y: 10.0,
        parent_id: Some("b1".into()),
        parent_section: Some(Section::Primary),
    });
    assert_eq!(store.dispatch(&scope_id, remote_move, Origin::Remote), Outcome::Applied);
    assert_eq!(store.links().len(), 1);

    let json = PlaybookDocument::from_store(&store).to_json().unwrap();
    let restored = PlaybookDocument::from_json(&json).unwrap().into_store("u-1", "amy");
    assert_eq!(restored.scope(&scope_id), store.scope(&scope_id));
    assert_eq!(restored.links().len(), 1);
}

#[test]
fn test_round_trip_keeps_collaborator_link_ids() {
    let (mut store, scope_id) = store_with_scope();
    add_task(&mut store, "t1", None, Section::Main);
    let entry = entry_marker_id(&scope_id, Section::Main);
    let mut link = Link::new(Section::Main, &entry, "t1");
    link.id = "lnk-42".into();
    let message = remote_message(&Mutation::LinkAdd(playgraph::mutation::LinkAdd { link }), &scope_id);
    let mut sync = CollabSync::new(&EngineConfig::builder().local_actor("u-1", "amy").build());
    assert!(sync.apply_remote_update(&mut store, &message, Instant::now()).is_applied());

    let json = PlaybookDocument::from_store(&store).to_json().unwrap();
    let mut restored = PlaybookDocument::from_json(&json).unwrap().into_store("u-1", "amy");
    assert_eq!(restored.scope(&scope_id), store.scope(&scope_id));
    assert_eq!(restored.links()[0].id, "lnk-42");
    assert_eq!(restored.delete_link("lnk-42"), Outcome::Applied);
}
