//! Applies collaborators' changes to the local store.
//!
//! Inbound messages are decoded into the closed [`Mutation`] union and dispatched through the
//! same reducer as local gestures, with [`Origin::Remote`] so no outbound message is echoed
//! back. Every applied change leaves a short-lived highlight on the affected ids.

mod highlight;

pub use highlight::{Color, Highlight, Highlights, actor_color};

use crate::config::EngineConfig;
use crate::error::SyncError;
use crate::mutation::{CollabMessage, Mutation, UpdateKind};
use crate::store::{EntityStore, Origin, Outcome};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Decodes the payload of an envelope into a [`Mutation`].
pub fn decode_message(message: &CollabMessage) -> Result<Mutation, SyncError> {
    let kind = UpdateKind::from_str(&message.update_type)
        .map_err(|_| SyncError::UnknownKind(message.update_type.clone()))?;
    Mutation::decode(kind, message.data.clone()).map_err(|source| SyncError::MalformedPayload {
        kind: message.update_type.clone(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct CollabSync {
    local_actor: String,
    highlight_duration: Duration,
    highlights: Highlights,
}

impl CollabSync {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            local_actor: config.local_actor.clone(),
            highlight_duration: config.highlight_duration(),
            highlights: Highlights::new(),
        }
    }

    /// Messages this participant sent itself and received back from the transport.
    pub fn is_echo(&self, message: &CollabMessage) -> bool {
        message.user_id == self.local_actor
    }

    /// Applies one inbound message, reporting undecodable ones as errors.
    ///
    /// The target scope is the message's `scope_id`, or the active scope when absent.
    pub fn receive(
        &mut self,
        store: &mut EntityStore,
        message: &CollabMessage,
        now: Instant,
    ) -> Result<Outcome, SyncError> {
        if self.is_echo(message) {
            return Ok(Outcome::Unchanged);
        }
        let mutation = decode_message(message)?;
        let Some(scope_id) = message
            .scope_id
            .clone()
            .or_else(|| store.active_scope_id().map(str::to_string))
        else {
            tracing::debug!("{} from '{}' arrived without a scope", mutation.kind(), message.user_id);
            return Ok(Outcome::Missing);
        };

        let mut targets = mutation.targets();
        let outcome = store.dispatch(&scope_id, mutation, Origin::Remote);
        if outcome.is_applied() {
            if targets.is_empty() {
                targets.push(scope_id);
            }
            for id in &targets {
                self.highlights.mark(
                    id,
                    &message.user_id,
                    &message.username,
                    now,
                    self.highlight_duration,
                );
            }
        }
        Ok(outcome)
    }

    /// Applies one inbound message. Unknown kinds and malformed payloads are logged and
    /// ignored.
    pub fn apply_remote_update(
        &mut self,
        store: &mut EntityStore,
        message: &CollabMessage,
        now: Instant,
    ) -> Outcome {
        match self.receive(store, message, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("ignoring update from '{}': {}", message.user_id, e);
                Outcome::Unchanged
            }
        }
    }

    /// Parses a raw JSON envelope and applies it.
    pub fn apply_remote_json(&mut self, store: &mut EntityStore, json: &str, now: Instant) -> Outcome {
        match serde_json::from_str::<CollabMessage>(json) {
            Ok(message) => self.apply_remote_update(store, &message, now),
            Err(e) => {
                tracing::warn!("{}", SyncError::MalformedEnvelope(e));
                Outcome::Unchanged
            }
        }
    }

    pub fn highlights(&self) -> &Highlights {
        &self.highlights
    }

    /// Drops expired highlight tags.
    pub fn expire_highlights(&mut self, now: Instant) -> usize {
        self.highlights.expire(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Section};
    use crate::mutation::NodeAdd;
    use serde_json::json;

    fn setup() -> (EntityStore, CollabSync, String) {
        let mut store = EntityStore::new("u-1", "amy");
        let scope_id = store.create_scope("play");
        let config = EngineConfig::builder().local_actor("u-1", "amy").build();
        (store, CollabSync::new(&config), scope_id)
    }

    fn remote(mutation: &Mutation, scope_id: &str) -> CollabMessage {
        CollabMessage::new(mutation, scope_id, "u-2", "bob").unwrap()
    }

    #[test]
    fn test_remote_add_is_idempotent_and_highlighted() {
        let (mut store, mut sync, scope_id) = setup();
        let now = Instant::now();
        let message = remote(
            &Mutation::NodeAdd(NodeAdd {
                node: Node::task("t9", "Remote").in_section(None, Section::Main),
            }),
            &scope_id,
        );

        assert_eq!(sync.apply_remote_update(&mut store, &message, now), Outcome::Applied);
        let count = store.active_scope().unwrap().node_count();
        assert_eq!(sync.apply_remote_update(&mut store, &message, now), Outcome::Unchanged);
        assert_eq!(store.active_scope().unwrap().node_count(), count);
        assert_eq!(store.pending_outbound(), 0);

        let tag = sync.highlights().get("t9").unwrap();
        assert_eq!(tag.username, "bob");
        assert_eq!(tag.color, actor_color("u-2"));
    }

    #[test]
    fn test_echo_is_ignored() {
        let (mut store, mut sync, scope_id) = setup();
        let mutation = Mutation::NodeAdd(NodeAdd {
            node: Node::task("t1", "Mine"),
        });
        let echo = CollabMessage::new(&mutation, &scope_id, "u-1", "amy").unwrap();
        assert_eq!(sync.apply_remote_update(&mut store, &echo, Instant::now()), Outcome::Unchanged);
        assert!(store.node("t1").is_none());
    }

    #[test]
    fn test_unknown_kind_and_bad_payload_are_ignored() {
        let (mut store, mut sync, _) = setup();
        let now = Instant::now();
        let unknown = json!({ "update_type": "cursor_move", "data": {}, "user_id": "u-2" }).to_string();
        assert_eq!(sync.apply_remote_json(&mut store, &unknown, now), Outcome::Unchanged);
        assert_eq!(sync.apply_remote_json(&mut store, "{not json", now), Outcome::Unchanged);

        let message: CollabMessage = serde_json::from_str(
            &json!({ "update_type": "node_delete", "data": { "id": 3 }, "user_id": "u-2" }).to_string(),
        )
        .unwrap();
        assert!(matches!(
            sync.receive(&mut store, &message, now),
            Err(SyncError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_scope_change_highlights_scope() {
        let (mut store, mut sync, scope_id) = setup();
        let message = json!({
            "update_type": "scope_attr_change",
            "data": { "name": "Renamed" },
            "user_id": "u-2",
            "username": "bob"
        });
        let message: CollabMessage = serde_json::from_value(message).unwrap();
        assert_eq!(sync.apply_remote_update(&mut store, &message, Instant::now()), Outcome::Applied);
        assert_eq!(store.active_scope().unwrap().name, "Renamed");
        assert!(sync.highlights().get(&scope_id).is_some());
    }
}
