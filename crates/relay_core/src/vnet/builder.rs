//! VNET construction: flood-fills the per-page connectivity graph formed
//! by (a) tabs sharing a pin and (b) wires joining two connection points
//! (a tab or a junction), producing one VNET per connected component.
//! Junctions need no special casing: they are ordinary graph nodes that
//! happen to have no owning pin, so a wire tree with several junctions
//! along it is handled by the same flood fill as a direct tab-to-tab run.

use std::collections::{HashMap, HashSet, VecDeque};

use bevy_ecs::prelude::World;

use crate::component::Pins;
use crate::error::TopologyWarning;
use crate::ids::{EntityId, Id, IdRegistry};
use crate::model::page::Page;
use crate::model::pin::PinTabs;
use crate::model::wire::Wire;

use super::Vnet;

fn connect(adjacency: &mut HashMap<Id, HashSet<Id>>, a: Id, b: Id) {
    adjacency.entry(a).or_default().insert(b);
    adjacency.entry(b).or_default().insert(a);
}

pub fn build_vnets(world: &World, page: &Page, ids: &mut IdRegistry) -> (Vec<Vnet>, Vec<TopologyWarning>) {
    let mut warnings = Vec::new();
    let mut nodes: HashSet<Id> = HashSet::new();
    let mut adjacency: HashMap<Id, HashSet<Id>> = HashMap::new();

    for &component_entity in &page.components {
        let Some(pins) = world.get::<Pins>(component_entity) else {
            continue;
        };
        for &(_, pin_entity) in pins.0.iter() {
            let Some(tabs) = world.get::<PinTabs>(pin_entity) else {
                continue;
            };
            let mut tab_ids = Vec::new();
            for &tab_entity in tabs.0.iter() {
                if let Some(EntityId(id)) = world.get::<EntityId>(tab_entity) {
                    tab_ids.push(*id);
                    nodes.insert(*id);
                    adjacency.entry(*id).or_default();
                }
            }
            for i in 0..tab_ids.len() {
                for j in (i + 1)..tab_ids.len() {
                    connect(&mut adjacency, tab_ids[i], tab_ids[j]);
                }
            }
        }
    }

    for &junction_entity in &page.junctions {
        if let Some(EntityId(id)) = world.get::<EntityId>(junction_entity) {
            nodes.insert(*id);
            adjacency.entry(*id).or_default();
        }
    }

    for &wire_entity in &page.wires {
        let Some(wire) = world.get::<Wire>(wire_entity) else {
            continue;
        };
        let wire_id = world
            .get::<EntityId>(wire_entity)
            .map(|EntityId(id)| id.to_string())
            .unwrap_or_default();
        let (Some(start), Some(end)) = (wire.start, wire.end) else {
            warnings.push(TopologyWarning::UnresolvedWireEndpoint { wire_id });
            continue;
        };
        if !nodes.contains(&start) || !nodes.contains(&end) {
            warnings.push(TopologyWarning::UnresolvedWireEndpoint { wire_id });
            continue;
        }
        if start == end {
            warnings.push(TopologyWarning::DegenerateWire { wire_id });
            continue;
        }
        connect(&mut adjacency, start, end);
    }

    let mut ordered: Vec<Id> = nodes.into_iter().collect();
    ordered.sort();
    let mut visited: HashSet<Id> = HashSet::new();
    let mut vnets = Vec::new();

    for &start in &ordered {
        if visited.contains(&start) {
            continue;
        }
        let mut cluster = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(current) = queue.pop_front() {
            cluster.insert(current);
            if let Some(neighbors) = adjacency.get(&current) {
                let mut sorted_neighbors: Vec<Id> = neighbors.iter().copied().collect();
                sorted_neighbors.sort();
                for neighbor in sorted_neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        let vnet_id = ids.generate();
        vnets.push(Vnet::new(vnet_id, page.id, cluster));
    }

    (vnets, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::junction::Junction;
    use bevy_ecs::prelude::Component as EcsComponent;

    #[derive(EcsComponent)]
    struct Tag;

    #[test]
    fn isolated_tab_becomes_its_own_vnet() {
        let mut world = World::new();
        let mut ids = IdRegistry::new();
        let tab_id = ids.generate();
        let pin_id = ids.generate();
        let component_id = ids.generate();
        let tab = world.spawn(EntityId(tab_id)).id();
        let pin = world
            .spawn((EntityId(pin_id), PinTabs(smallvec::smallvec![tab])))
            .id();
        let component = world
            .spawn((
                EntityId(component_id),
                Pins(smallvec::smallvec![("A".to_string(), pin)]),
            ))
            .id();
        let mut page = Page::new(ids.generate(), "sheet");
        page.components.push(component);

        let (vnets, warnings) = build_vnets(&world, &page, &mut ids);
        assert!(warnings.is_empty());
        assert_eq!(vnets.len(), 1);
        assert!(vnets[0].tabs.contains(&tab_id));
    }

    #[test]
    fn junction_bridges_multiple_wires_into_one_vnet() {
        let mut world = World::new();
        let mut ids = IdRegistry::new();

        let mut spawn_tab_pin = |world: &mut World| {
            let tab_id = ids.generate();
            let tab = world.spawn(EntityId(tab_id)).id();
            let pin = world
                .spawn((EntityId(ids.generate()), PinTabs(smallvec::smallvec![tab])))
                .id();
            let component = world
                .spawn((
                    EntityId(ids.generate()),
                    Pins(smallvec::smallvec![("A".to_string(), pin)]),
                ))
                .id();
            (tab_id, component)
        };

        let (tab_a, comp_a) = spawn_tab_pin(&mut world);
        let (tab_b, comp_b) = spawn_tab_pin(&mut world);
        let (tab_c, comp_c) = spawn_tab_pin(&mut world);

        let junction_id = ids.generate();
        let junction_entity = world
            .spawn((EntityId(junction_id), Junction { x: 0.0, y: 0.0 }))
            .id();

        let wire1 = world
            .spawn((
                EntityId(ids.generate()),
                Wire {
                    start: Some(tab_a),
                    end: Some(junction_id),
                    waypoints: vec![],
                },
            ))
            .id();
        let wire2 = world
            .spawn((
                EntityId(ids.generate()),
                Wire {
                    start: Some(junction_id),
                    end: Some(tab_b),
                    waypoints: vec![],
                },
            ))
            .id();
        let wire3 = world
            .spawn((
                EntityId(ids.generate()),
                Wire {
                    start: Some(junction_id),
                    end: Some(tab_c),
                    waypoints: vec![],
                },
            ))
            .id();

        let mut page = Page::new(ids.generate(), "sheet");
        page.components.extend([comp_a, comp_b, comp_c]);
        page.junctions.push(junction_entity);
        page.wires.extend([wire1, wire2, wire3]);

        let (vnets, warnings) = build_vnets(&world, &page, &mut ids);
        assert!(warnings.is_empty());
        assert_eq!(vnets.len(), 1);
        assert_eq!(vnets[0].tabs.len(), 4);
    }

    #[test]
    fn wire_with_unresolved_endpoint_is_skipped_with_warning() {
        let mut world = World::new();
        let mut ids = IdRegistry::new();
        let wire = world
            .spawn((
                EntityId(ids.generate()),
                Wire {
                    start: Some(ids.generate()),
                    end: None,
                    waypoints: vec![],
                },
            ))
            .id();
        let mut page = Page::new(ids.generate(), "sheet");
        page.wires.push(wire);

        let (vnets, warnings) = build_vnets(&world, &page, &mut ids);
        assert!(vnets.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], TopologyWarning::UnresolvedWireEndpoint { .. }));
    }
}
