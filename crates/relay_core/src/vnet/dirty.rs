//! Dirty-flag tracking for VNETs. Idempotent set membership: marking an
//! already-dirty VNET is a no-op, and the main loop treats an empty set
//! as the signal that the network has reached a fixed point.

use std::collections::HashSet;

use crate::ids::Id;

#[derive(Debug, Default)]
pub struct DirtyFlagManager {
    dirty: HashSet<Id>,
}

impl DirtyFlagManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, vnet: Id) {
        self.dirty.insert(vnet);
    }

    pub fn mark_all_dirty(&mut self, vnets: impl IntoIterator<Item = Id>) {
        self.dirty.extend(vnets);
    }

    pub fn clear_dirty(&mut self, vnet: Id) {
        self.dirty.remove(&vnet);
    }

    pub fn is_dirty(&self, vnet: Id) -> bool {
        self.dirty.contains(&vnet)
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn snapshot(&self) -> HashSet<Id> {
        self.dirty.clone()
    }

    pub fn reset(&mut self) {
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_is_idempotent() {
        let mut dirty = DirtyFlagManager::new();
        let v = Id::from_hex("aaaaaaaa").unwrap();
        dirty.mark_dirty(v);
        dirty.mark_dirty(v);
        assert_eq!(dirty.snapshot().len(), 1);
        dirty.clear_dirty(v);
        assert!(dirty.is_empty());
    }
}
