//! Common test utilities for building stores, scopes and collaboration messages.
use playgraph::prelude::*;

/// Creates a store with a single active scope for user `u-1`.
#[allow(dead_code)]
pub fn store_with_scope() -> (EntityStore, ScopeId) {
    let mut store = EntityStore::new("u-1", "amy");
    let scope_id = store.create_scope("Web servers");
    (store, scope_id)
}

/// Adds a task to the active scope, panicking if the store refuses it.
#[allow(dead_code)]
pub fn add_task(store: &mut EntityStore, id: &str, parent: Option<&str>, section: Section) {
    let outcome = store.add_node(Node::task(id, id).in_section(parent, section));
    assert_eq!(outcome, Outcome::Applied, "adding task '{}'", id);
}

/// Adds a container to the active scope, panicking if the store refuses it.
#[allow(dead_code)]
pub fn add_container(store: &mut EntityStore, id: &str, parent: Option<&str>, section: Section) {
    let outcome = store.add_node(Node::container(id, id).in_section(parent, section));
    assert_eq!(outcome, Outcome::Applied, "adding container '{}'", id);
}

/// Builds the linear chain `entry -> ids[0] -> ids[1] -> ...` with links of `link_type`.
#[allow(dead_code)]
pub fn chain(store: &mut EntityStore, link_type: LinkType, entry: &str, ids: &[&str]) {
    let mut from = entry.to_string();
    for id in ids {
        let outcome = store.add_link(link_type, &from, id);
        assert_eq!(outcome, Outcome::Applied, "linking '{}' -> '{}'", from, id);
        from = id.to_string();
    }
}

/// Wraps a mutation as if collaborator `u-2` had sent it.
#[allow(dead_code)]
pub fn remote_message(mutation: &Mutation, scope_id: &str) -> CollabMessage {
    CollabMessage::new(mutation, scope_id, "u-2", "bob").unwrap()
}

/// Fails the test if any scope of the store breaks a membership or chain rule.
#[allow(dead_code)]
pub fn assert_consistent(store: &EntityStore) {
    for scope in store.scopes() {
        let violations = scope.violations();
        assert!(
            violations.is_empty(),
            "scope '{}' is inconsistent: {:#?}",
            scope.id,
            violations
        );
    }
}
