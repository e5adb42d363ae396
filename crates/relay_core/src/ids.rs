//! 8-hex-character identifiers minted by a per-document registry.
//!
//! Every first-class entity (page, component, pin, tab, wire, junction,
//! VNET, bridge) owns one of these. The registry refuses duplicates and
//! supports releasing an id back to the pool on deletion, mirroring the
//! hierarchical `page.component.pin.tab` addressing scheme used for
//! human-readable debugging output, though nothing in the solver depends
//! on that hierarchy being present.

use bevy_ecs::prelude::Component as EcsComponent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An 8-hex-character identifier (the first 8 hex digits of a UUIDv4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id([u8; 8]);

impl Id {
    /// Build an `Id` from an already-validated 8-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 8 || !bytes.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Some(Id(buf))
    }

    pub fn as_str(&self) -> &str {
        // Safe: constructed only from ASCII hex digits.
        std::str::from_utf8(&self.0).unwrap()
    }

    fn from_uuid() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let simple = uuid.simple().to_string();
        Self::from_hex(&simple[..8]).expect("uuid simple encoding is always hex")
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.as_str())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join identifiers into the dotted `page.component.pin.tab` hierarchical
/// form used for readability. The solver never parses this back; it is a
/// display convenience only.
pub fn build_hierarchical_id(parts: &[Id]) -> String {
    parts
        .iter()
        .map(Id::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a dotted hierarchical id string back into its id-shaped parts.
/// Parts that aren't valid 8-hex-char ids are silently skipped; callers
/// that need strict validation should check the returned length.
pub fn parse_hierarchical_id(hierarchical: &str) -> Vec<Id> {
    hierarchical.split('.').filter_map(Id::from_hex).collect()
}

/// An entity's persisted identity, attached as a component to every
/// entity spawned into the document's [`bevy_ecs::world::World`] so that
/// cross-references (tab -> VNET, wire -> endpoint, bridge -> VNET) can
/// be expressed by id rather than by borrowing.
#[derive(EcsComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub Id);

/// Per-document registry of minted identifiers.
///
/// Refuses to hand out a duplicate, and supports releasing an id back to
/// the pool when its owning entity is deleted so ids can be reused across
/// a long editing session without unbounded growth.
#[derive(Debug, Default)]
pub struct IdRegistry {
    used: HashSet<Id>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new, guaranteed-unique id.
    pub fn generate(&mut self) -> Id {
        loop {
            let candidate = Id::from_uuid();
            if self.used.insert(candidate) {
                return candidate;
            }
        }
    }

    /// Register an id loaded from persistence. Returns `false` if it was
    /// already in use (a document load error).
    pub fn register(&mut self, id: Id) -> bool {
        self.used.insert(id)
    }

    pub fn is_used(&self, id: Id) -> bool {
        self.used.contains(&id)
    }

    /// Release an id back to the pool, e.g. when its entity is deleted.
    pub fn release(&mut self, id: Id) {
        self.used.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_well_formed() {
        let mut registry = IdRegistry::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = registry.generate();
            assert_eq!(id.as_str().len(), 8);
            assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
            assert!(seen.insert(id), "registry minted a duplicate id");
        }
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = IdRegistry::new();
        let id = Id::from_hex("0a1b2c3d").unwrap();
        assert!(registry.register(id));
        assert!(!registry.register(id));
    }

    #[test]
    fn release_allows_reuse() {
        let mut registry = IdRegistry::new();
        let id = Id::from_hex("deadbeef").unwrap();
        assert!(registry.register(id));
        registry.release(id);
        assert!(registry.register(id));
    }

    #[test]
    fn hierarchical_round_trip() {
        let a = Id::from_hex("11111111").unwrap();
        let b = Id::from_hex("22222222").unwrap();
        let joined = build_hierarchical_id(&[a, b]);
        assert_eq!(joined, "11111111.22222222");
        assert_eq!(parse_hierarchical_id(&joined), vec![a, b]);
    }
}
