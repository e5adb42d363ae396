//! Bridge registry: dynamic, runtime-only VNET-to-VNET edges created by
//! components (a closed switch, an energized relay's contacts, a
//! conducting diode). Bridges never persist to the document; they exist
//! only while the simulation that created them is running.

use std::collections::{HashMap, HashSet};

use crate::ids::{Id, IdRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    pub id: Id,
    pub a: Id,
    pub b: Id,
}

fn unordered(a: Id, b: Id) -> (Id, Id) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Registry of bridges, keyed by id with a secondary unordered-pair index
/// so `add_bridge` is idempotent: asking for the same pair twice returns
/// the existing bridge rather than minting a second one.
#[derive(Debug, Default)]
pub struct BridgeManager {
    bridges: HashMap<Id, Bridge>,
    pair_index: HashMap<(Id, Id), Id>,
}

impl BridgeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or find) a bridge between two VNETs. Returns the existing
    /// bridge id if this pair is already bridged; does not itself mark
    /// either VNET dirty -- callers (see `context.rs`) do that once they
    /// know a new bridge was actually created.
    pub fn add_bridge(&mut self, ids: &mut IdRegistry, a: Id, b: Id) -> Id {
        let key = unordered(a, b);
        if let Some(&existing) = self.pair_index.get(&key) {
            return existing;
        }
        let id = ids.generate();
        self.bridges.insert(id, Bridge { id, a, b });
        self.pair_index.insert(key, id);
        id
    }

    pub fn remove_bridge(&mut self, bridge_id: Id) -> Option<Bridge> {
        let bridge = self.bridges.remove(&bridge_id)?;
        self.pair_index.remove(&unordered(bridge.a, bridge.b));
        Some(bridge)
    }

    /// Remove whichever bridge currently connects this exact pair, if any.
    /// Used by components that toggle a single contact pair (switch,
    /// diode) without needing to remember the minted bridge id.
    pub fn remove_between(&mut self, a: Id, b: Id) -> Option<Bridge> {
        let id = *self.pair_index.get(&unordered(a, b))?;
        self.remove_bridge(id)
    }

    pub fn get(&self, bridge_id: Id) -> Option<&Bridge> {
        self.bridges.get(&bridge_id)
    }

    pub fn bridges_for(&self, vnet: Id) -> HashSet<Id> {
        self.bridges
            .values()
            .filter(|b| b.a == vnet || b.b == vnet)
            .map(|b| b.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bridge> {
        self.bridges.values()
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}
