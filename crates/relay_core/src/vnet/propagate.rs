//! One propagation step: a deterministic union-find over (bridge
//! adjacency, shared link-name adjacency) across every VNET in the
//! document, followed by a full recompute of each resulting group's
//! state from the tab/pin drives underneath it. VNET state is never fed
//! back into itself; only component-driven pin signals contribute.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, World};

use crate::ids::Id;
use crate::model::pin::PinSignal;
use crate::model::tab::OwnerPin;
use crate::signal::Signal;

use super::{BridgeManager, VnetTable};

struct UnionFind {
    parent: HashMap<Id, Id>,
}

impl UnionFind {
    fn new(ids: impl IntoIterator<Item = Id>) -> Self {
        let parent = ids.into_iter().map(|id| (id, id)).collect();
        Self { parent }
    }

    fn find(&mut self, x: Id) -> Id {
        let parent = *self.parent.get(&x).unwrap_or(&x);
        if parent == x {
            x
        } else {
            let root = self.find(parent);
            self.parent.insert(x, root);
            root
        }
    }

    fn union(&mut self, a: Id, b: Id) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (lo, hi) = if ra <= rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(hi, lo);
        }
    }
}

#[derive(Debug, Default)]
pub struct PropagateResult {
    pub changed: Vec<Id>,
}

pub fn step(world: &World, id_index: &HashMap<Id, Entity>, vnets: &mut VnetTable, bridges: &BridgeManager) -> PropagateResult {
    let mut uf = UnionFind::new(vnets.vnets.keys().copied());

    let mut bridge_list: Vec<_> = bridges.iter().collect();
    bridge_list.sort_by_key(|b| b.id);
    for bridge in bridge_list {
        uf.union(bridge.a, bridge.b);
    }

    let mut by_link: HashMap<&str, Vec<Id>> = HashMap::new();
    let mut vnet_ids: Vec<Id> = vnets.vnets.keys().copied().collect();
    vnet_ids.sort();
    for &vid in &vnet_ids {
        let vnet = &vnets.vnets[&vid];
        for name in &vnet.link_names {
            by_link.entry(name.as_str()).or_default().push(vid);
        }
    }
    let mut link_names: Vec<&str> = by_link.keys().copied().collect();
    link_names.sort();
    for name in link_names {
        let group = &by_link[name];
        for pair in group.windows(2) {
            uf.union(pair[0], pair[1]);
        }
    }

    let mut groups: HashMap<Id, Vec<Id>> = HashMap::new();
    for &vid in &vnet_ids {
        let root = uf.find(vid);
        groups.entry(root).or_default().push(vid);
    }

    let mut result = PropagateResult::default();
    let mut roots: Vec<Id> = groups.keys().copied().collect();
    roots.sort();

    for root in roots {
        let members = &groups[&root];
        let mut group_state = Signal::Float;
        for &vid in members {
            let vnet = &vnets.vnets[&vid];
            let mut tabs: Vec<Id> = vnet.tabs.iter().copied().collect();
            tabs.sort();
            for tab in tabs {
                let Some(&tab_entity) = id_index.get(&tab) else {
                    continue;
                };
                let Some(OwnerPin(pin_entity)) = world.get::<OwnerPin>(tab_entity) else {
                    continue;
                };
                if let Some(PinSignal(sig)) = world.get::<PinSignal>(*pin_entity) {
                    group_state |= *sig;
                }
            }
        }
        for &vid in members {
            let vnet = vnets.vnets.get_mut(&vid).expect("vnet exists in group");
            vnet.bridge_ids = bridges.bridges_for(vid);
            if vnet.state != group_state {
                vnet.state = group_state;
                result.changed.push(vid);
            }
        }
    }

    result
}
