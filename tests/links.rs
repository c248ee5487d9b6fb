mod common;

use common::*;
use playgraph::links::links_of;
use playgraph::prelude::*;

#[test]
fn test_chain_length_counts_linear_chain() {
    let (mut store, scope_id) = store_with_scope();
    let entry = entry_marker_id(&scope_id, Section::Main);
    for id in ["a", "b", "c"] {
        add_task(&mut store, id, None, Section::Main);
    }
    assert_eq!(chain_length(store.active_scope().unwrap(), &entry), 0);

    chain(&mut store, Section::Main, &entry, &["a", "b", "c"]);
    let scope = store.active_scope().unwrap();
    assert_eq!(chain_length(scope, &entry), 3);
    assert_eq!(chain_members(scope, &entry), vec!["a", "b", "c"]);
}

#[test]
fn test_new_link_replaces_outgoing_slot() {
    let (mut store, _) = store_with_scope();
    add_container(&mut store, "blk", None, Section::Main);
    for id in ["A", "B", "C"] {
        add_task(&mut store, id, Some("blk"), Section::Primary);
    }

    assert_eq!(store.add_link(Section::Primary, "A", "B"), Outcome::Applied);
    assert_eq!(store.add_link(Section::Primary, "A", "C"), Outcome::Applied);

    let scope = store.active_scope().unwrap();
    let outgoing: Vec<&str> = scope.links_from("A").map(|l| l.to.as_str()).collect();
    assert_eq!(outgoing, vec!["C"]);
    assert!(links_of(scope, "B").is_empty());
    assert_consistent(&store);
}

#[test]
fn test_new_link_replaces_incoming_slot() {
    let (mut store, _) = store_with_scope();
    for id in ["A", "B", "C"] {
        add_task(&mut store, id, None, Section::Post);
    }
    store.add_link(Section::Post, "A", "C");
    store.add_link(Section::Post, "B", "C");

    let scope = store.active_scope().unwrap();
    let incoming: Vec<&str> = scope.links_to("C").map(|l| l.from.as_str()).collect();
    assert_eq!(incoming, vec!["B"]);
}

#[test]
fn test_same_link_twice_is_unchanged() {
    let (mut store, scope_id) = store_with_scope();
    let entry = entry_marker_id(&scope_id, Section::Main);
    add_task(&mut store, "a", None, Section::Main);
    assert_eq!(store.add_link(Section::Main, &entry, "a"), Outcome::Applied);
    assert_eq!(store.add_link(Section::Main, &entry, "a"), Outcome::Unchanged);
    assert_eq!(store.links().len(), 1);
}

#[test]
fn test_link_rules() {
    let (mut store, scope_id) = store_with_scope();
    add_container(&mut store, "blk", None, Section::Main);
    add_task(&mut store, "inner", Some("blk"), Section::Primary);
    add_task(&mut store, "main", None, Section::Main);
    add_task(&mut store, "post", None, Section::Post);

    assert_eq!(
        store.add_link(Section::Main, "main", "main"),
        Outcome::Rejected(Rejection::SelfLink("main".into()))
    );
    assert!(matches!(
        store.add_link(Section::Main, "blk", "inner"),
        Outcome::Rejected(Rejection::AncestryLink { .. })
    ));
    assert!(matches!(
        store.add_link(Section::Main, "main", "post"),
        Outcome::Rejected(Rejection::CrossSection { .. })
    ));
    assert!(matches!(
        store.add_link(Section::Main, &entry_marker_id(&scope_id, Section::Main), "post"),
        Outcome::Rejected(Rejection::EntryMarkerMismatch { .. })
    ));
    assert!(matches!(
        store.add_link(Section::Main, "main", &entry_marker_id(&scope_id, Section::Main)),
        Outcome::Rejected(Rejection::EntryMarkerTarget(_))
    ));
    assert_eq!(store.add_link(Section::Main, "main", "ghost"), Outcome::Missing);
    assert!(store.links().is_empty());
    assert_eq!(store.drain_outbox().iter().filter(|m| m.update_type == "link_add").count(), 0);
}

#[test]
fn test_orphans_follow_upstream_links() {
    let (mut store, scope_id) = store_with_scope();
    let entry = entry_marker_id(&scope_id, Section::Main);
    for id in ["a", "b", "c"] {
        add_task(&mut store, id, None, Section::Main);
    }
    chain(&mut store, Section::Main, &entry, &["a", "b", "c"]);
    let scope = store.active_scope().unwrap();
    assert!(orphans(scope).is_empty());
    assert!(!is_orphan(scope, &entry));

    let upstream = scope.links_to("b").next().unwrap().id.clone();
    assert_eq!(store.delete_link(&upstream), Outcome::Applied);
    let scope = store.active_scope().unwrap();
    assert_eq!(orphans(scope), vec!["b", "c"]);
    assert!(!is_orphan(scope, "a"));
    assert!(!is_orphan(scope, "ghost"));
    assert_eq!(store.delete_link(&upstream), Outcome::Missing);
}

#[test]
fn test_sub_section_chain_starts_at_synthesized_marker() {
    let (mut store, _) = store_with_scope();
    add_container(&mut store, "blk", None, Section::Main);
    add_task(&mut store, "x", Some("blk"), Section::Fallback);
    add_task(&mut store, "y", Some("blk"), Section::Fallback);
    let entry = entry_marker_id("blk", Section::Fallback);
    chain(&mut store, Section::Fallback, &entry, &["x", "y"]);

    let scope = store.active_scope().unwrap();
    assert_eq!(chain_length(scope, &entry), 2);
    assert_eq!(chain_length(scope, &entry_marker_id("blk", Section::Primary)), 0);
    assert!(matches!(
        store.clone().add_link(Section::Primary, &entry_marker_id("blk", Section::Primary), "x"),
        Outcome::Rejected(Rejection::EntryMarkerMismatch { .. })
    ));
}
