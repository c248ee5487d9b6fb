use ahash::AHashMap;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Colours handed out to collaborators. The same actor always maps to the same entry.
const PALETTE: [Color; 8] = [
    Color::rgb(0xe6, 0x19, 0x4b),
    Color::rgb(0x3c, 0xb4, 0x4b),
    Color::rgb(0x43, 0x63, 0xd8),
    Color::rgb(0xf5, 0x82, 0x31),
    Color::rgb(0x91, 0x1e, 0xb4),
    Color::rgb(0x42, 0xd4, 0xf4),
    Color::rgb(0xf0, 0x32, 0xe6),
    Color::rgb(0x9a, 0x63, 0x24),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Deterministic colour for an actor id, stable across processes and sessions.
pub fn actor_color(actor_id: &str) -> Color {
    // FNV-1a; the hasher behind AHashMap is randomly seeded and would differ per process.
    let hash = actor_id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

/// A transient tag shown on an entity a collaborator just changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub actor_id: String,
    pub username: String,
    pub color: Color,
    pub expires_at: Instant,
}

/// Highlight tags by entity id. A newer change to the same id replaces the older tag.
#[derive(Debug, Clone, Default)]
pub struct Highlights {
    tags: AHashMap<String, Highlight>,
}

impl Highlights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, id: &str, actor_id: &str, username: &str, now: Instant, ttl: Duration) {
        self.tags.insert(
            id.to_string(),
            Highlight {
                actor_id: actor_id.to_string(),
                username: username.to_string(),
                color: actor_color(actor_id),
                expires_at: now + ttl,
            },
        );
    }

    /// Drops every tag that has expired by `now` and returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.tags.len();
        self.tags.retain(|_, tag| tag.expires_at > now);
        before - self.tags.len()
    }

    /// Tags still visible at `now`, sorted by id.
    pub fn active(&self, now: Instant) -> Vec<(&str, &Highlight)> {
        let mut active: Vec<_> = self
            .tags
            .iter()
            .filter(|(_, tag)| tag.expires_at > now)
            .map(|(id, tag)| (id.as_str(), tag))
            .collect();
        active.sort_by(|a, b| a.0.cmp(b.0));
        active
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.tags.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
