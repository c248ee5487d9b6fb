mod common;

use common::*;
use playgraph::placement::{apply_drop, drop_node, plan_drop};
use playgraph::prelude::*;

fn grab(id: &str) -> DragSession {
    DragSession::start(id, Point::new(10.0, 10.0), Point::new(0.0, 0.0))
}

fn release(x: f64, y: f64, target: DropTarget) -> DropEvent {
    DropEvent {
        pointer: Point::new(x, y),
        target,
        over_node: None,
    }
}

#[test]
fn test_drop_lands_at_pointer_minus_offset() {
    let (mut store, _) = store_with_scope();
    add_task(&mut store, "t1", None, Section::Pre);
    let config = EngineConfig::default();

    let drop = release(120.0, 90.0, DropTarget::scope_section(Section::Pre, Point::new(0.0, 0.0)));
    assert_eq!(drop_node(&mut store, &config, &grab("t1"), &drop), Outcome::Applied);
    let node = store.node("t1").unwrap();
    assert_eq!((node.x, node.y), (110.0, 80.0));
}

#[test]
fn test_drop_with_grid_snap() {
    let (mut store, _) = store_with_scope();
    add_task(&mut store, "t1", None, Section::Pre);
    let config = EngineConfig::builder().grid_snap(true).grid_unit(50.0).build();

    let drop = release(120.0, 90.0, DropTarget::scope_section(Section::Pre, Point::new(0.0, 0.0)));
    assert_eq!(drop_node(&mut store, &config, &grab("t1"), &drop), Outcome::Applied);
    let node = store.node("t1").unwrap();
    assert_eq!((node.x, node.y), (100.0, 50.0));
}

#[test]
fn test_linked_node_stays_in_its_container() {
    let (mut store, _) = store_with_scope();
    let config = EngineConfig::default();
    add_container(&mut store, "b1", None, Section::Main);
    add_container(&mut store, "b2", None, Section::Main);
    add_task(&mut store, "x", Some("b1"), Section::Primary);
    chain(&mut store, Section::Primary, &entry_marker_id("b1", Section::Primary), &["x"]);

    let drop = release(50.0, 50.0, DropTarget::sub_section("b2", Section::Fallback, Point::default()));
    let plan = plan_drop(store.active_scope().unwrap(), &config, &grab("x"), &drop);
    assert_eq!(plan, DropPlan::Rejected(Rejection::LinkProtected("x".into())));
    assert!(apply_drop(&mut store, "x", &plan).is_rejected());

    let node = store.node("x").unwrap();
    assert_eq!(node.placement(), (Some("b1"), Section::Primary));
    assert_eq!(store.children("b1", Section::Primary), vec!["x".to_string()]);
    assert!(store.children("b2", Section::Fallback).is_empty());

    // Repositioning inside the same sub-section is still allowed.
    let drop = release(70.0, 30.0, DropTarget::sub_section("b1", Section::Primary, Point::default()));
    assert_eq!(drop_node(&mut store, &config, &grab("x"), &drop), Outcome::Applied);
    assert_consistent(&store);
}

#[test]
fn test_dropping_onto_a_node_links_it() {
    let (mut store, _) = store_with_scope();
    let config = EngineConfig::default();
    add_task(&mut store, "a", None, Section::Handlers);
    add_task(&mut store, "b", None, Section::Handlers);
    add_task(&mut store, "c", None, Section::Handlers);
    chain(&mut store, Section::Handlers, "a", &["b"]);

    let mut drop = release(0.0, 0.0, DropTarget::scope_section(Section::Handlers, Point::default()));
    drop.over_node = Some("a".into());
    assert_eq!(drop_node(&mut store, &config, &grab("c"), &drop), Outcome::Applied);

    let scope = store.active_scope().unwrap();
    let next: Vec<&str> = scope.links_from("a").map(|l| l.to.as_str()).collect();
    assert_eq!(next, vec!["c"]);
    assert!(!scope.has_links("b"));
}

#[test]
fn test_remote_move_of_linked_node_is_accepted() {
    let (mut store, scope_id) = store_with_scope();
    add_task(&mut store, "a", None, Section::Main);
    add_task(&mut store, "b", None, Section::Main);
    chain(&mut store, Section::Main, "a", &["b"]);

    let mutation = Mutation::NodeMove(playgraph::mutation::NodeMove {
        node_id: "b".into(),
        x: 5.0,
        y: 5.0,
        parent_id: None,
        parent_section: Some(Section::Post),
    });
    assert_eq!(store.dispatch(&scope_id, mutation.clone(), Origin::Remote), Outcome::Applied);
    assert_eq!(store.node("b").unwrap().placement(), (None, Section::Post));

    // The same gesture performed locally would have been refused.
    let (mut local, local_scope) = store_with_scope();
    add_task(&mut local, "a", None, Section::Main);
    add_task(&mut local, "b", None, Section::Main);
    chain(&mut local, Section::Main, "a", &["b"]);
    assert!(local.dispatch(&local_scope, mutation, Origin::Local).is_rejected());
}
