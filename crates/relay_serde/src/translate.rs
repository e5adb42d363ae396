//! Schema → model translation (load direction). Mirrors
//! `document_loader.py`'s validation sequence: parse, check version,
//! validate identifier uniqueness across the *entire* document, then
//! spawn everything into the `Document`'s `World`. No partial `Document`
//! is ever handed back once any step past parsing fails.

use std::collections::HashMap;
use std::collections::HashSet;

use bevy_ecs::prelude::{Entity, World};
use bevy_log::warn;
use smallvec::SmallVec;

use relay_core::component::{CircuitElement, ComponentKind, ComponentState, Pins, Properties, PropertyValue, Rotation};
use relay_core::error::{LoadError, TopologyWarning};
use relay_core::ids::{EntityId, Id, IdRegistry};
use relay_core::model::{Document, Junction, OwnerComponent, OwnerPin, Page, PinName, PinSignal, PinTabs, TabMarker, TabPosition, Waypoint, Wire};

use crate::schema::{ComponentFile, DocumentFile, EmbeddedJunctionFile, JunctionFile, PageFile, Position, WireFile};

/// Only the major component of [`crate::schema::CURRENT_VERSION`] is
/// checked on load; a document written by a newer minor/patch of this
/// same major version loads unchanged.
pub const SUPPORTED_MAJOR_VERSION: u32 = 1;

pub fn build_document(file: DocumentFile) -> Result<Document, LoadError> {
    check_version(&file.version)?;
    let mut ids = validate_ids(&file)?;

    let mut document = Document::new();
    document.metadata = file.metadata.into_iter().collect();

    for page_file in &file.pages {
        document.pages.push(build_page(&mut document.world, &mut ids, page_file)?);
    }

    document.ids = ids;
    Ok(document)
}

fn check_version(version: &str) -> Result<(), LoadError> {
    let major = version.split('.').next().and_then(|part| part.parse::<u32>().ok());
    match major {
        Some(found) if found == SUPPORTED_MAJOR_VERSION => Ok(()),
        _ => Err(LoadError::IncompatibleVersion {
            found: version.to_string(),
            supported: SUPPORTED_MAJOR_VERSION,
        }),
    }
}

/// Step 3 of the load algorithm: walk every id-bearing entity in
/// document order and register it, failing closed on the first
/// malformed or duplicate id rather than collecting them all -- this
/// matches `_validate_unique_ids`'s fail-fast behavior.
fn validate_ids(file: &DocumentFile) -> Result<IdRegistry, LoadError> {
    let mut ids = IdRegistry::new();
    for page in &file.pages {
        register(&mut ids, "page", &page.page_id)?;
        for component in &page.components {
            register(&mut ids, "component", &component.component_id)?;
            for pin in &component.pins {
                register(&mut ids, "pin", &pin.pin_id)?;
                for tab in &pin.tabs {
                    register(&mut ids, "tab", &tab.tab_id)?;
                }
            }
        }
        for wire in &page.wires {
            register(&mut ids, "wire", &wire.wire_id)?;
            validate_wire_ids(&mut ids, wire)?;
        }
        for junction in &page.junctions {
            register(&mut ids, "junction", &junction.junction_id)?;
        }
    }
    Ok(ids)
}

fn validate_wire_ids(ids: &mut IdRegistry, wire: &WireFile) -> Result<(), LoadError> {
    for waypoint in &wire.waypoints {
        if let Some(waypoint_id) = &waypoint.waypoint_id {
            register(ids, "waypoint", waypoint_id)?;
        }
    }
    for junction in &wire.junctions {
        register(ids, "junction", &junction.junction_id)?;
        for child in &junction.child_wires {
            register(ids, "wire", &child.wire_id)?;
            validate_wire_ids(ids, child)?;
        }
    }
    Ok(())
}

fn register(ids: &mut IdRegistry, entity: &str, value: &str) -> Result<Id, LoadError> {
    let id = Id::from_hex(value).ok_or_else(|| LoadError::InvalidId {
        entity: entity.to_string(),
        value: value.to_string(),
    })?;
    if !ids.register(id) {
        return Err(LoadError::DuplicateId(value.to_string()));
    }
    Ok(id)
}

/// Re-parses an id string already accepted by [`validate_ids`]; never
/// fails in practice since every id reachable from here passed that
/// earlier pass.
fn parsed(s: &str) -> Id {
    Id::from_hex(s).expect("id validated during the earlier registration pass")
}

fn build_page(world: &mut World, ids: &mut IdRegistry, page_file: &PageFile) -> Result<Page, LoadError> {
    let page_id = parsed(&page_file.page_id);
    let mut page = Page::new(page_id, page_file.name.clone());
    page.canvas_x = page_file.canvas_x;
    page.canvas_y = page_file.canvas_y;
    page.canvas_zoom = page_file.canvas_zoom;

    for component_file in &page_file.components {
        spawn_component(world, &mut page, page_id, component_file)?;
    }

    let mut visited = HashSet::new();
    let mut warnings = Vec::new();
    for wire_file in &page_file.wires {
        flatten_wire(world, ids, &mut page, wire_file, None, &mut visited, &mut warnings);
    }
    for junction_file in &page_file.junctions {
        let junction_id = parsed(&junction_file.junction_id);
        spawn_junction(world, &mut page, junction_id, junction_file.position);
    }
    for warning in warnings {
        warn!(page = %page_file.page_id, %warning, "topology issue while loading wires");
    }

    Ok(page)
}

fn spawn_component(world: &mut World, page: &mut Page, page_id: Id, file: &ComponentFile) -> Result<(), LoadError> {
    let component_id = parsed(&file.component_id);
    let kind = ComponentKind::from_str(&file.component_type).ok_or_else(|| LoadError::UnknownComponentType(file.component_type.clone()))?;

    let rotation = match file.rotation.rem_euclid(360) {
        90 => Rotation::Rot90,
        180 => Rotation::Rot180,
        270 => Rotation::Rot270,
        _ => Rotation::Rot0,
    };

    let mut properties = Properties(translate_properties(&file.properties, &file.component_id));
    if kind == ComponentKind::Clock {
        normalize_clock_frequency(&mut properties);
    }
    let pin_names = canonical_pin_names(kind, file.pins.len(), &properties);

    let component_entity = world.spawn_empty().id();
    let mut pins: SmallVec<[(String, Entity); 8]> = SmallVec::new();

    for (index, pin_file) in file.pins.iter().enumerate() {
        let pin_id = parsed(&pin_file.pin_id);
        let pin_name = pin_names.get(index).cloned().unwrap_or_else(|| format!("PIN{index}"));

        let mut tabs: SmallVec<[Entity; 4]> = SmallVec::new();
        for tab_file in &pin_file.tabs {
            let tab_id = parsed(&tab_file.tab_id);
            let offset = TabPosition {
                dx: tab_file.position.x - file.position.x,
                dy: tab_file.position.y - file.position.y,
            };
            tabs.push(world.spawn((EntityId(tab_id), TabMarker, offset)).id());
        }

        let pin_entity = world.spawn((EntityId(pin_id), PinName(pin_name.clone()), PinTabs(tabs.clone()), PinSignal::default())).id();
        for &tab_entity in &tabs {
            world.entity_mut(tab_entity).insert(OwnerPin(pin_entity));
        }
        world.entity_mut(pin_entity).insert(OwnerComponent(component_entity));
        pins.push((pin_name, pin_entity));
    }

    let state = hydrate_state(kind, file.state.as_ref());

    world.entity_mut(component_entity).insert((
        EntityId(component_id),
        CircuitElement {
            kind,
            page: page_id,
            position: (file.position.x, file.position.y),
            rotation,
            link_name: file.link_name.clone(),
        },
        properties,
        Pins(pins),
        state,
    ));

    page.components.push(component_entity);
    Ok(())
}

/// Fixed pin-name layouts match each component's own `Pins::get` lookups
/// (see `relay_core::component::{switch, diode, relay, memory, ...}`);
/// `Link` and `Bus` have no fixed names, so pins are named by position.
fn canonical_pin_names(kind: ComponentKind, count: usize, properties: &Properties) -> Vec<String> {
    match kind {
        ComponentKind::Vcc => vec!["OUT".to_string()],
        ComponentKind::Switch => vec!["A".to_string(), "B".to_string()],
        ComponentKind::Clock => vec!["OUT".to_string()],
        ComponentKind::Indicator => vec!["IN".to_string()],
        ComponentKind::Diode => vec!["ANODE".to_string(), "CATHODE".to_string()],
        ComponentKind::DpdtRelay => {
            ["COIL", "P1_COMMON", "P1_NC", "P1_NO", "P2_COMMON", "P2_NC", "P2_NO"].into_iter().map(String::from).collect()
        }
        ComponentKind::Link | ComponentKind::Bus => (0..count).map(|i| i.to_string()).collect(),
        ComponentKind::Memory => {
            let address_bits = properties.get_int("address_bits", 8).clamp(3, 16) as usize;
            let data_bits = properties.get_int("data_bits", 8).clamp(1, 16) as usize;
            let mut names = vec!["ENABLE".to_string(), "READ".to_string(), "WRITE".to_string()];
            names.extend((0..address_bits).map(|i| format!("ADDR{i}")));
            names.extend((0..data_bits).map(|i| format!("DATA{i}")));
            names
        }
    }
}

fn hydrate_state(kind: ComponentKind, state: &Option<serde_json::Value>) -> ComponentState {
    let persisted = |value: &Option<serde_json::Value>| value.clone().and_then(|v| serde_json::from_value(v).ok());
    match kind {
        ComponentKind::Vcc => ComponentState::Vcc,
        ComponentKind::Clock => ComponentState::Clock,
        ComponentKind::DpdtRelay => ComponentState::DpdtRelay,
        ComponentKind::Link => ComponentState::Link,
        ComponentKind::Bus => ComponentState::Bus,
        ComponentKind::Switch => ComponentState::Switch(persisted(state).unwrap_or_default()),
        ComponentKind::Indicator => ComponentState::Indicator(persisted(state).unwrap_or_default()),
        ComponentKind::Diode => ComponentState::Diode(persisted(state).unwrap_or_default()),
        ComponentKind::Memory => ComponentState::Memory(persisted(state).unwrap_or_default()),
    }
}

/// Maps the closed `frequency` enum a document may carry (4.7.3:
/// `4Hz`/`2Hz`/`1Hz`/`2s`/`4s`/`8s`) onto the millisecond period
/// `relay_core::component::clock::Clock` actually reads. A document
/// carrying `period_ms` directly (this crate's own save format) takes
/// precedence; `frequency` only fills the gap for documents authored
/// against the named-enum schema.
fn normalize_clock_frequency(properties: &mut Properties) {
    if properties.0.contains_key("period_ms") {
        return;
    }
    let Some(PropertyValue::Str(frequency)) = properties.0.get("frequency") else {
        return;
    };
    let period_ms = match frequency.as_str() {
        "4Hz" => 250,
        "2Hz" => 500,
        "1Hz" => 1000,
        "2s" => 2000,
        "4s" => 4000,
        "8s" => 8000,
        _ => return,
    };
    properties.0.insert("period_ms".to_string(), PropertyValue::Int(period_ms));
}

/// Narrows the schema's free-form `properties` map to the typed values a
/// canonical component can read. An array or object value doesn't
/// correspond to anything `Properties::get_*` can return, so it is
/// dropped rather than rejected (§10.1).
fn translate_properties(props: &serde_json::Map<String, serde_json::Value>, component_id: &str) -> HashMap<String, PropertyValue> {
    use serde_json::Value;

    let mut out = HashMap::new();
    for (key, value) in props {
        let translated = match value {
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) if n.is_i64() || n.is_u64() => PropertyValue::Int(n.as_i64().unwrap_or_default()),
            Value::Number(n) => PropertyValue::Float(n.as_f64().unwrap_or_default()),
            Value::String(s) => PropertyValue::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                warn!(component = component_id, property = %key, "dropping property: arrays/objects aren't representable as component properties");
                continue;
            }
            Value::Null => continue,
        };
        out.insert(key.clone(), translated);
    }
    out
}

fn spawn_junction(world: &mut World, page: &mut Page, id: Id, position: Position) -> Entity {
    let entity = world.spawn((EntityId(id), Junction { x: position.x, y: position.y })).id();
    page.junctions.push(entity);
    entity
}

fn spawn_wire(world: &mut World, page: &mut Page, id: Id, start: Option<Id>, end: Option<Id>, waypoints: Vec<Waypoint>) -> Entity {
    let entity = world.spawn((EntityId(id), Wire { start, end, waypoints })).id();
    page.wires.push(entity);
    entity
}

/// Flattens one wire (and any embedded junction subtree hanging off it)
/// into flat `Wire`/`Junction` entities, per §10.2. `start_override` is
/// `Some` exactly when this call is processing a `child_wires` entry:
/// its own `start_tab_id` is ignored in favor of the parent junction.
fn flatten_wire(
    world: &mut World,
    ids: &mut IdRegistry,
    page: &mut Page,
    wire: &WireFile,
    start_override: Option<Id>,
    visited: &mut HashSet<Id>,
    warnings: &mut Vec<TopologyWarning>,
) {
    let wire_id = parsed(&wire.wire_id);
    let start = start_override.unwrap_or_else(|| parsed(&wire.start_tab_id));
    let waypoints: Vec<Waypoint> = wire
        .waypoints
        .iter()
        .map(|wp| Waypoint {
            id: wp.waypoint_id.as_deref().map(parsed),
            x: wp.position.x,
            y: wp.position.y,
        })
        .collect();

    if let Some(end_str) = &wire.end_tab_id {
        spawn_wire(world, page, wire_id, Some(start), Some(parsed(end_str)), waypoints);
        return;
    }

    if wire.junctions.is_empty() {
        spawn_wire(world, page, wire_id, Some(start), None, waypoints);
        return;
    }

    let mut own_id_used = false;
    for embedded in &wire.junctions {
        flatten_embedded_junction(world, ids, page, embedded, start, &waypoints, &mut own_id_used, wire_id, visited, warnings);
    }
}

#[allow(clippy::too_many_arguments)]
fn flatten_embedded_junction(
    world: &mut World,
    ids: &mut IdRegistry,
    page: &mut Page,
    embedded: &EmbeddedJunctionFile,
    start: Id,
    waypoints: &[Waypoint],
    own_id_used: &mut bool,
    own_id: Id,
    visited: &mut HashSet<Id>,
    warnings: &mut Vec<TopologyWarning>,
) {
    let junction_id = parsed(&embedded.junction_id);
    if !visited.insert(junction_id) {
        warnings.push(TopologyWarning::DegenerateWire { wire_id: embedded.junction_id.clone() });
        return;
    }
    spawn_junction(world, page, junction_id, embedded.position);

    let edge_id = if *own_id_used {
        ids.generate()
    } else {
        *own_id_used = true;
        own_id
    };
    spawn_wire(world, page, edge_id, Some(start), Some(junction_id), waypoints.to_vec());

    for child in &embedded.child_wires {
        flatten_wire(world, ids, page, child, Some(junction_id), visited, warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_with(properties: serde_json::Map<String, serde_json::Value>) -> ComponentFile {
        ComponentFile {
            component_id: "00000001".to_string(),
            component_type: "clock".to_string(),
            position: Position { x: 0.0, y: 0.0 },
            rotation: 0,
            properties,
            link_name: None,
            pins: vec![],
            state: None,
        }
    }

    fn page_id() -> Id {
        Id::from_hex("0000000a").unwrap()
    }

    #[test]
    fn named_frequency_resolves_to_period_ms() {
        let mut props = serde_json::Map::new();
        props.insert("frequency".to_string(), serde_json::json!("2Hz"));
        let mut world = World::new();
        let mut page = Page::new(page_id(), "sheet");
        spawn_component(&mut world, &mut page, page_id(), &clock_with(props)).unwrap();

        let entity = page.components[0];
        let properties = world.get::<Properties>(entity).unwrap();
        assert_eq!(properties.get_int("period_ms", -1), 500);
    }

    #[test]
    fn explicit_period_ms_wins_over_frequency() {
        let mut props = serde_json::Map::new();
        props.insert("frequency".to_string(), serde_json::json!("1Hz"));
        props.insert("period_ms".to_string(), serde_json::json!(333));
        let mut world = World::new();
        let mut page = Page::new(page_id(), "sheet");
        spawn_component(&mut world, &mut page, page_id(), &clock_with(props)).unwrap();

        let entity = page.components[0];
        let properties = world.get::<Properties>(entity).unwrap();
        assert_eq!(properties.get_int("period_ms", -1), 333);
    }
}
