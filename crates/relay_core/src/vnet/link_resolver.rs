//! Link resolution: tags VNETs that share a symbolic link name, either
//! a component's own `link_name` (every tab of every pin on that
//! component takes it) or a per-pin mapping reported by
//! `Behavior::get_link_mappings` (Bus and Memory tag each pin with its
//! own bit-addressed name, e.g. `"DATA_0"`, `"DATA_1"`, ...). VNETs
//! themselves are never merged here; [`super::propagate::step`]'s
//! union-find groups them by shared link name once per iteration.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::{Entity, World};

use crate::component::dispatch;
use crate::component::{CircuitElement, Pins};
use crate::error::TopologyWarning;
use crate::ids::{EntityId, Id};
use crate::model::pin::PinTabs;

use super::VnetTable;

#[derive(Debug, Clone, Default)]
pub struct LinkResolutionResult {
    pub resolved_links: usize,
    pub cross_page_links: usize,
    pub same_page_links: usize,
    pub warnings: Vec<TopologyWarning>,
}

/// Tag every VNET that owns a tab under a shared link name, mutating
/// each `Vnet::link_names` in place. This never touches `tabs` or
/// `tab_to_vnet`, and never removes a VNET: a VNET's identity (its id,
/// its home page) is exactly as the per-page flood fill left it. The
/// actual cross-VNET grouping this enables happens later, once per
/// propagation pass, in [`super::propagate::step`]'s union-find over
/// bridge and link-name adjacency -- keeping both relations handled by
/// the same deterministic machinery instead of baking links in as a
/// one-time structural merge.
pub fn resolve_links(world: &World, components: &[Entity], vnets: &mut VnetTable) -> LinkResolutionResult {
    let mut result = LinkResolutionResult::default();
    let mut groups: HashMap<String, HashSet<Id>> = HashMap::new();

    let mut tag = |name: &str, tab: Id, groups: &mut HashMap<String, HashSet<Id>>| {
        if let Some(&vnet_id) = vnets.tab_to_vnet.get(&tab) {
            groups.entry(name.to_string()).or_default().insert(vnet_id);
        }
    };

    for &entity in components {
        if let Some(element) = world.get::<CircuitElement>(entity) {
            if let Some(name) = &element.link_name {
                if let Some(pins) = world.get::<Pins>(entity) {
                    for &(_, pin_entity) in pins.0.iter() {
                        if let Some(tabs) = world.get::<PinTabs>(pin_entity) {
                            for &tab_entity in tabs.0.iter() {
                                if let Some(EntityId(tab_id)) = world.get::<EntityId>(tab_entity) {
                                    tag(name, *tab_id, &mut groups);
                                }
                            }
                        }
                    }
                }
            }
        }
        for (name, tab_id) in dispatch::get_link_mappings(world, entity) {
            tag(&name, tab_id, &mut groups);
        }
    }

    let mut names: Vec<String> = groups.keys().cloned().collect();
    names.sort();

    for name in names {
        let members = &groups[&name];
        if members.len() < 2 {
            if members.is_empty() {
                result.warnings.push(TopologyWarning::UnresolvedLinkName { link_name: name });
            } else {
                result.warnings.push(TopologyWarning::SingleComponentLink { link_name: name });
            }
            continue;
        }

        let mut member_ids: Vec<Id> = members.iter().copied().collect();
        member_ids.sort();

        let cross_page = {
            let home_pages: HashSet<Id> = member_ids
                .iter()
                .filter_map(|id| vnets.vnets.get(id).map(|v| v.home_page))
                .collect();
            home_pages.len() > 1
        };

        for &member in &member_ids {
            if let Some(vnet) = vnets.vnets.get_mut(&member) {
                vnet.link_names.insert(name.clone());
            }
        }

        result.resolved_links += 1;
        if cross_page {
            result.cross_page_links += 1;
        } else {
            result.same_page_links += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, Rotation};
    use crate::ids::IdRegistry;
    use crate::vnet::Vnet;

    fn spawn_single_tab_component(world: &mut World, ids: &mut IdRegistry, link_name: &str) -> (Entity, Id) {
        let tab_id = ids.generate();
        let tab = world.spawn(EntityId(tab_id)).id();
        let pin = world
            .spawn((EntityId(ids.generate()), PinTabs(smallvec::smallvec![tab])))
            .id();
        let component = world
            .spawn((
                EntityId(ids.generate()),
                Pins(smallvec::smallvec![("A".to_string(), pin)]),
                CircuitElement {
                    kind: ComponentKind::Link,
                    page: ids.generate(),
                    position: (0.0, 0.0),
                    rotation: Rotation::Rot0,
                    link_name: Some(link_name.to_string()),
                },
            ))
            .id();
        (component, tab_id)
    }

    #[test]
    fn shared_link_name_tags_without_merging_vnets() {
        let mut world = World::new();
        let mut ids = IdRegistry::new();
        let (comp_a, tab_a) = spawn_single_tab_component(&mut world, &mut ids, "ADDR_0");
        let (comp_b, tab_b) = spawn_single_tab_component(&mut world, &mut ids, "ADDR_0");

        let page_a = ids.generate();
        let page_b = ids.generate();
        let mut vnets = VnetTable::new();
        let vnet_a = ids.generate();
        let vnet_b = ids.generate();
        vnets.insert(Vnet::new(vnet_a, page_a, [tab_a].into_iter().collect()));
        vnets.insert(Vnet::new(vnet_b, page_b, [tab_b].into_iter().collect()));

        let result = resolve_links(&world, &[comp_a, comp_b], &mut vnets);

        assert_eq!(result.resolved_links, 1);
        assert_eq!(result.cross_page_links, 1);
        // Both VNETs still exist, still own exactly their original tab --
        // the resolver only tags, it never merges.
        assert_eq!(vnets.vnets.len(), 2);
        assert!(vnets.vnets[&vnet_a].tabs.contains(&tab_a));
        assert!(vnets.vnets[&vnet_b].tabs.contains(&tab_b));
        assert!(vnets.vnets[&vnet_a].link_names.contains("ADDR_0"));
        assert!(vnets.vnets[&vnet_b].link_names.contains("ADDR_0"));
    }

    #[test]
    fn single_component_link_is_a_warning() {
        let mut world = World::new();
        let mut ids = IdRegistry::new();
        let (comp_a, tab_a) = spawn_single_tab_component(&mut world, &mut ids, "LONELY");
        let mut vnets = VnetTable::new();
        vnets.insert(Vnet::new(ids.generate(), ids.generate(), [tab_a].into_iter().collect()));

        let result = resolve_links(&world, &[comp_a], &mut vnets);
        assert_eq!(result.resolved_links, 0);
        assert_eq!(result.warnings.len(), 1);
        assert!(matches!(result.warnings[0], TopologyWarning::SingleComponentLink { .. }));
    }
}
