//! Model → schema translation (save direction). Reads `CircuitElement`,
//! `Properties`, `Pins`/`PinTabs`/`TabPosition`, `ComponentState`,
//! `Wire`, `Junction` and `Waypoint` straight out of the `Document`'s
//! `World`. The embedded-junction wire-tree shape is not reconstructed
//! (§10.4) -- every wire and junction round-trips as a flat pair of
//! page-level arrays, which the schema already allows (`junctions` is
//! optional on both `WireFile` and `PageFile`).

use bevy_ecs::prelude::{Entity, World};

use relay_core::component::{CircuitElement, ComponentState, Pins, Properties, PropertyValue, Rotation};
use relay_core::ids::EntityId;
use relay_core::model::{Document, Junction, Page, PinTabs, TabPosition, Waypoint, Wire};

use crate::schema::{ComponentFile, DocumentFile, JunctionFile, PageFile, PinFile, Position, TabFile, WaypointFile, WireFile, CURRENT_VERSION};

pub fn document_to_file(document: &Document) -> DocumentFile {
    DocumentFile {
        version: CURRENT_VERSION.to_string(),
        metadata: document.metadata.clone().into_iter().collect(),
        pages: document.pages.iter().map(|page| page_to_file(&document.world, page)).collect(),
    }
}

fn page_to_file(world: &World, page: &Page) -> PageFile {
    PageFile {
        page_id: page.id.to_string(),
        name: page.name.clone(),
        canvas_x: page.canvas_x,
        canvas_y: page.canvas_y,
        canvas_zoom: page.canvas_zoom,
        components: page.components.iter().filter_map(|&e| component_to_file(world, e)).collect(),
        wires: page.wires.iter().filter_map(|&e| wire_to_file(world, e)).collect(),
        junctions: page.junctions.iter().filter_map(|&e| junction_to_file(world, e)).collect(),
    }
}

fn component_to_file(world: &World, entity: Entity) -> Option<ComponentFile> {
    let EntityId(component_id) = *world.get::<EntityId>(entity)?;
    let element = world.get::<CircuitElement>(entity)?;
    let properties = world.get::<Properties>(entity).map(properties_to_file).unwrap_or_default();
    let pins = world
        .get::<Pins>(entity)
        .map(|pins| pins.0.iter().filter_map(|&(_, pin_entity)| pin_to_file(world, pin_entity, element.position)).collect())
        .unwrap_or_default();
    let state = world.get::<ComponentState>(entity).and_then(state_to_value);

    Some(ComponentFile {
        component_id: component_id.to_string(),
        component_type: element.kind.as_str().to_string(),
        position: Position { x: element.position.0, y: element.position.1 },
        rotation: rotation_degrees(element.rotation),
        properties,
        link_name: element.link_name.clone(),
        pins,
        state,
    })
}

fn rotation_degrees(rotation: Rotation) -> i32 {
    match rotation {
        Rotation::Rot0 => 0,
        Rotation::Rot90 => 90,
        Rotation::Rot180 => 180,
        Rotation::Rot270 => 270,
    }
}

fn properties_to_file(properties: &Properties) -> serde_json::Map<String, serde_json::Value> {
    properties
        .0
        .iter()
        .map(|(key, value)| {
            let json = match value {
                PropertyValue::Bool(b) => serde_json::Value::from(*b),
                PropertyValue::Int(i) => serde_json::Value::from(*i),
                PropertyValue::Float(f) => serde_json::Value::from(*f),
                PropertyValue::Str(s) => serde_json::Value::from(s.clone()),
            };
            (key.clone(), json)
        })
        .collect()
}

fn pin_to_file(world: &World, pin_entity: Entity, component_position: (f32, f32)) -> Option<PinFile> {
    let EntityId(pin_id) = *world.get::<EntityId>(pin_entity)?;
    let tabs = world.get::<PinTabs>(pin_entity)?;
    let tabs = tabs.0.iter().filter_map(|&tab_entity| tab_to_file(world, tab_entity, component_position)).collect();
    Some(PinFile { pin_id: pin_id.to_string(), tabs })
}

fn tab_to_file(world: &World, entity: Entity, component_position: (f32, f32)) -> Option<TabFile> {
    let EntityId(tab_id) = *world.get::<EntityId>(entity)?;
    let offset = world.get::<TabPosition>(entity)?;
    Some(TabFile {
        tab_id: tab_id.to_string(),
        position: Position {
            x: component_position.0 + offset.dx,
            y: component_position.1 + offset.dy,
        },
    })
}

/// Non-volatile memory serializes only its non-zero cells (§4.7.9);
/// kinds with no interesting runtime state save no `state` at all.
fn state_to_value(state: &ComponentState) -> Option<serde_json::Value> {
    match state {
        ComponentState::Vcc | ComponentState::Clock | ComponentState::DpdtRelay | ComponentState::Link | ComponentState::Bus => None,
        ComponentState::Switch(s) => serde_json::to_value(s).ok(),
        ComponentState::Indicator(s) => serde_json::to_value(s).ok(),
        ComponentState::Diode(s) => serde_json::to_value(s).ok(),
        ComponentState::Memory(s) => {
            let mut trimmed = s.clone();
            trimmed.cells.retain(|_, value| *value != 0);
            serde_json::to_value(&trimmed).ok()
        }
    }
}

fn wire_to_file(world: &World, entity: Entity) -> Option<WireFile> {
    let EntityId(wire_id) = *world.get::<EntityId>(entity)?;
    let wire = world.get::<Wire>(entity)?;
    Some(WireFile {
        wire_id: wire_id.to_string(),
        start_tab_id: wire.start.map(|id| id.to_string()).unwrap_or_default(),
        end_tab_id: wire.end.map(|id| id.to_string()),
        waypoints: wire.waypoints.iter().map(waypoint_to_file).collect(),
        junctions: Vec::new(),
    })
}

fn waypoint_to_file(waypoint: &Waypoint) -> WaypointFile {
    WaypointFile {
        waypoint_id: waypoint.id.map(|id| id.to_string()),
        position: Position { x: waypoint.x, y: waypoint.y },
    }
}

fn junction_to_file(world: &World, entity: Entity) -> Option<JunctionFile> {
    let EntityId(junction_id) = *world.get::<EntityId>(entity)?;
    let junction = world.get::<Junction>(entity)?;
    Some(JunctionFile {
        junction_id: junction_id.to_string(),
        position: Position { x: junction.x, y: junction.y },
    })
}
