//! Components: the behavioral layer. Each kind is a zero-sized marker
//! type implementing [`Behavior`]; [`dispatch`] matches a component
//! entity's [`ComponentKind`] and calls through to the right impl. Adding
//! a new kind means adding a variant, a marker, and an impl -- nothing
//! elsewhere needs to change.

pub mod bus;
pub mod clock;
pub mod diode;
pub mod dispatch;
pub mod indicator;
pub mod link;
pub mod memory;
pub mod relay;
pub mod switch;
pub mod vcc;

use std::collections::HashMap;

use bevy_ecs::prelude::{Component as EcsComponent, Entity, World};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::context::SimContext;
use crate::ids::Id;

pub use bus::Bus;
pub use clock::Clock;
pub use diode::Diode;
pub use indicator::Indicator;
pub use link::Link;
pub use memory::Memory;
pub use relay::DpdtRelay;
pub use switch::Switch;
pub use vcc::Vcc;

/// Rotation in 90-degree steps; schematic-only, never affects electrical
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Rot0,
    Rot90,
    Rot180,
    Rot270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Vcc,
    Switch,
    Clock,
    Indicator,
    Diode,
    DpdtRelay,
    Link,
    Bus,
    Memory,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Vcc => "vcc",
            ComponentKind::Switch => "switch",
            ComponentKind::Clock => "clock",
            ComponentKind::Indicator => "indicator",
            ComponentKind::Diode => "diode",
            ComponentKind::DpdtRelay => "dpdt_relay",
            ComponentKind::Link => "link",
            ComponentKind::Bus => "bus",
            ComponentKind::Memory => "memory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "vcc" => ComponentKind::Vcc,
            "switch" => ComponentKind::Switch,
            "clock" => ComponentKind::Clock,
            "indicator" => ComponentKind::Indicator,
            "diode" => ComponentKind::Diode,
            "dpdt_relay" => ComponentKind::DpdtRelay,
            "link" => ComponentKind::Link,
            "bus" => ComponentKind::Bus,
            "memory" => ComponentKind::Memory,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Free-form typed properties loaded straight from the document (the
/// switching delay on a relay, the period on a clock, the pin count of a
/// bus, ...). Components interpret their own keys; unknown keys are
/// preserved but ignored.
#[derive(EcsComponent, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Properties(pub HashMap<String, PropertyValue>);

impl Properties {
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(PropertyValue::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(PropertyValue::Int(i)) => *i,
            _ => default,
        }
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(PropertyValue::Float(f)) => *f,
            _ => default,
        }
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(PropertyValue::Str(s)) => s.as_str(),
            _ => default,
        }
    }
}

/// The document-level identity and placement of a component entity.
#[derive(EcsComponent, Debug, Clone)]
pub struct CircuitElement {
    pub kind: ComponentKind,
    pub page: Id,
    pub position: (f32, f32),
    pub rotation: Rotation,
    pub link_name: Option<String>,
}

/// A component's named pins, in schema order, resolved to entities.
#[derive(EcsComponent, Debug, Default, Clone)]
pub struct Pins(pub SmallVec<[(String, Entity); 8]>);

impl Pins {
    pub fn get(&self, name: &str) -> Option<Entity> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, e)| *e)
    }
}

/// Per-kind runtime state that is only ever touched synchronously, from
/// the thread driving `simulate_logic`. The relay and the clock keep
/// their mutable runtime state out of the world entirely (see
/// [`crate::context::RelayRuntimeTable`] / [`crate::context::ClockRuntimeTable`])
/// because their background switching-delay timers must be able to
/// update it without taking a lock on the whole world.
#[derive(EcsComponent, Debug, Clone)]
pub enum ComponentState {
    Vcc,
    Switch(switch::SwitchState),
    Clock,
    Indicator(indicator::IndicatorState),
    Diode(diode::DiodeState),
    DpdtRelay,
    Link,
    Bus,
    Memory(memory::MemoryState),
}

/// The three lifecycle hooks every component kind implements, plus two
/// optional ones (`interact`, `get_link_mappings`) most kinds don't need.
pub trait Behavior {
    fn sim_start(ctx: &mut SimContext, entity: Entity);
    fn simulate_logic(ctx: &mut SimContext, entity: Entity);
    fn sim_stop(ctx: &mut SimContext, entity: Entity);

    fn interact(_ctx: &mut SimContext, _entity: Entity, _action: &InteractionAction) -> bool {
        false
    }

    /// Pins whose tabs should be tagged with a link name beyond the
    /// component's own `link_name` (bus and memory pins, each tagged with
    /// their own bit-addressed name). Runs during link resolution, before
    /// a run's VNETs, bridges or dirty set exist, so it reads straight
    /// from the `World` rather than through a [`SimContext`].
    fn get_link_mappings(_world: &World, _entity: Entity) -> Vec<(String, Id)> {
        Vec::new()
    }
}

/// The interactions an engine-external caller can perform on a component.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionAction {
    Toggle,
    Press,
    Release,
    ThumbwheelInteract { delta: i64 },
    MemoryWrite { address: u64, value: u64 },
}
