//! Bus: a component whose pins are each their own symbolic wire. A Bus
//! never drives or bridges anything itself; it exists purely to hand
//! [`crate::vnet::link_resolver`] one `{bus_name}_{start_pin+i}` link
//! name per pin, so that per-bit buses drawn on different pages (or
//! different places on the same page) merge pin-for-pin instead of as
//! one big group the way a plain `link_name` would.
//!
//! Pins are named by their index ("0", "1", ...) in schema order; the
//! count is fixed once placed. Changing `number_of_pins` is a structural
//! edit the editor performs outside of simulation by rebuilding the
//! pin set.

use bevy_ecs::prelude::{Entity, World};

use crate::component::{Behavior, Pins, Properties};
use crate::context::SimContext;
use crate::ids::{EntityId, Id};
use crate::model::pin::PinTabs;

pub struct Bus;

impl Behavior for Bus {
    fn sim_start(_ctx: &mut SimContext, _entity: Entity) {}

    fn simulate_logic(_ctx: &mut SimContext, _entity: Entity) {
        // A bus pin is never driven by the bus itself; it only relays
        // whatever the components wired to each individual pin drive.
    }

    fn sim_stop(_ctx: &mut SimContext, _entity: Entity) {}

    fn get_link_mappings(world: &World, entity: Entity) -> Vec<(String, Id)> {
        let Some(pins) = world.get::<Pins>(entity) else {
            return Vec::new();
        };
        let Some(props) = world.get::<Properties>(entity) else {
            return Vec::new();
        };
        let bus_name = props.get_str("bus_name", "BUS");
        let start_pin = props.get_int("start_pin", 0);

        let mut mappings = Vec::new();
        for (index, &(_, pin_entity)) in pins.0.iter().enumerate() {
            let Some(tabs) = world.get::<PinTabs>(pin_entity) else {
                continue;
            };
            let Some(&tab_entity) = tabs.0.first() else {
                continue;
            };
            let Some(EntityId(tab_id)) = world.get::<EntityId>(tab_entity) else {
                continue;
            };
            let bit = start_pin + index as i64;
            mappings.push((format!("{bus_name}_{bit}"), *tab_id));
        }
        mappings
    }
}
