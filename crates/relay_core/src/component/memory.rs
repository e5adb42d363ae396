//! Memory (RAM): the one component whose pin wiring is itself a link
//! producer, like [`super::bus::Bus`] -- its address and data pins are
//! tagged `{address_bus_name}_{i}` / `{data_bus_name}_{i}` (LSB = bit 0)
//! so they merge with whichever Bus components share those names,
//! possibly on another page entirely.
//!
//! Control pins (Enable, Read, Write) are read the passive way, through
//! the VNET their tab belongs to, never through their own (undriven)
//! pin state.

use std::collections::HashMap;

use bevy_ecs::prelude::{Component as EcsComponent, Entity, World};
use serde::{Deserialize, Serialize};

use crate::component::{Behavior, InteractionAction, Pins, Properties};
use crate::context::SimContext;
use crate::ids::{EntityId, Id};
use crate::model::pin::PinTabs;
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastOperation {
    #[default]
    None,
    Read,
    Write,
}

#[derive(EcsComponent, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryState {
    pub cells: HashMap<u64, u64>,
    pub last_operation: LastOperation,
    pub last_address: u64,
    pub last_data: u64,
}

pub struct Memory;

impl Memory {
    fn address_bits(props: &Properties) -> u32 {
        props.get_int("address_bits", 8).clamp(3, 16) as u32
    }

    fn data_bits(props: &Properties) -> u32 {
        props.get_int("data_bits", 8).clamp(1, 16) as u32
    }

    fn bus_names(props: &Properties) -> (String, String) {
        (
            props.get_str("address_bus_name", "ADDR").to_string(),
            props.get_str("data_bus_name", "DATA").to_string(),
        )
    }

    fn named_pin_tabs(world: &bevy_ecs::world::World, entity: Entity, prefix: &str, count: u32) -> Vec<Id> {
        let Some(pins) = world.get::<Pins>(entity) else {
            return Vec::new();
        };
        (0..count)
            .filter_map(|i| {
                let pin_entity = pins.get(&format!("{prefix}{i}"))?;
                let tabs = world.get::<PinTabs>(pin_entity)?;
                let tab_entity = *tabs.0.first()?;
                world.get::<EntityId>(tab_entity).map(|EntityId(id)| *id)
            })
            .collect()
    }

    fn control_tab(ctx: &SimContext, entity: Entity, name: &str) -> Option<Id> {
        let world = ctx.world.lock();
        let pin = world.get::<Pins>(entity)?.get(name)?;
        let tab_entity = *world.get::<PinTabs>(pin)?.0.first()?;
        world.get::<EntityId>(tab_entity).map(|EntityId(id)| *id)
    }

    fn pin_entity(ctx: &SimContext, entity: Entity, name: &str) -> Option<Entity> {
        let world = ctx.world.lock();
        world.get::<Pins>(entity)?.get(name)
    }

    fn address_and_data_pins(ctx: &SimContext, entity: Entity) -> (Vec<Id>, Vec<Id>, u32, u32) {
        let world = ctx.world.lock();
        let Some(props) = world.get::<Properties>(entity) else {
            return (Vec::new(), Vec::new(), 0, 0);
        };
        let address_bits = Self::address_bits(props);
        let data_bits = Self::data_bits(props);
        let address_tabs = Self::named_pin_tabs(&world, entity, "ADDR", address_bits);
        let data_tabs = Self::named_pin_tabs(&world, entity, "DATA", data_bits);
        (address_tabs, data_tabs, address_bits, data_bits)
    }

    fn update_state(ctx: &mut SimContext, entity: Entity, f: impl FnOnce(&mut MemoryState)) {
        let mut world = ctx.world.lock();
        if let Some(mut state_ref) = world.get_mut::<crate::component::ComponentState>(entity) {
            if let crate::component::ComponentState::Memory(state) = &mut *state_ref {
                f(state);
            }
        }
    }
}

impl Behavior for Memory {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        let is_volatile = {
            let world = ctx.world.lock();
            world.get::<Properties>(entity).map(|p| p.get_bool("is_volatile", true)).unwrap_or(true)
        };
        if is_volatile {
            Self::update_state(ctx, entity, |state| {
                state.cells.clear();
                state.last_operation = LastOperation::None;
            });
        }
        // Loading `default_memory_file` from disk is the host
        // application's job; pre-populated non-volatile cells arrive
        // already deserialized into `MemoryState.cells` before sim_start.
    }

    fn simulate_logic(ctx: &mut SimContext, entity: Entity) {
        let Some(enable_tab) = Self::control_tab(ctx, entity, "ENABLE") else {
            return;
        };
        let Some(read_tab) = Self::control_tab(ctx, entity, "READ") else {
            return;
        };
        let Some(write_tab) = Self::control_tab(ctx, entity, "WRITE") else {
            return;
        };

        let (address_tabs, data_tabs, _address_bits, data_bits) = Self::address_and_data_pins(ctx, entity);
        let Some(data_pin_entities): Option<Vec<Entity>> = (0..data_bits as usize)
            .map(|i| Self::pin_entity(ctx, entity, &format!("DATA{i}")))
            .collect()
        else {
            return;
        };

        let enabled = ctx.vnet_state(enable_tab).is_high();
        if !enabled {
            for &pin in &data_pin_entities {
                ctx.set_pin_signal(pin, Signal::Float);
            }
            Self::update_state(ctx, entity, |state| state.last_operation = LastOperation::None);
            return;
        }

        let read = ctx.vnet_state(read_tab).is_high();
        let write = ctx.vnet_state(write_tab).is_high();

        let mut address: u64 = 0;
        for (i, &tab) in address_tabs.iter().enumerate() {
            if ctx.vnet_state(tab).is_high() {
                address |= 1u64 << i;
            }
        }

        if read && !write {
            let value = {
                let world = ctx.world.lock();
                let state = world.get::<crate::component::ComponentState>(entity);
                match state {
                    Some(crate::component::ComponentState::Memory(state)) => *state.cells.get(&address).unwrap_or(&0),
                    _ => 0,
                }
            };
            for (i, &pin) in data_pin_entities.iter().enumerate() {
                let bit_high = (value >> i) & 1 == 1;
                ctx.set_pin_signal(pin, Signal::from_bool(bit_high));
            }
            Self::update_state(ctx, entity, |state| {
                state.last_operation = LastOperation::Read;
                state.last_address = address;
                state.last_data = value;
            });
        } else if write && !read {
            for &pin in &data_pin_entities {
                ctx.set_pin_signal(pin, Signal::Float);
            }
            let mut value: u64 = 0;
            for (i, &tab) in data_tabs.iter().enumerate() {
                if ctx.vnet_state(tab).is_high() {
                    value |= 1u64 << i;
                }
            }
            let mask = if data_bits >= 64 { u64::MAX } else { (1u64 << data_bits) - 1 };
            let stored = value & mask;
            Self::update_state(ctx, entity, |state| {
                state.cells.insert(address, stored);
                state.last_operation = LastOperation::Write;
                state.last_address = address;
                state.last_data = stored;
            });
        } else {
            for &pin in &data_pin_entities {
                ctx.set_pin_signal(pin, Signal::Float);
            }
            Self::update_state(ctx, entity, |state| state.last_operation = LastOperation::None);
        }
    }

    fn sim_stop(ctx: &mut SimContext, entity: Entity) {
        let (_, _, _, data_bits) = Self::address_and_data_pins(ctx, entity);
        for i in 0..data_bits as usize {
            if let Some(pin) = Self::pin_entity(ctx, entity, &format!("DATA{i}")) {
                ctx.set_pin_signal(pin, Signal::Float);
            }
        }
    }

    /// A direct, debugger-style poke into a memory cell (`memory_write`),
    /// independent of whatever the address/data buses are currently
    /// driving. Masked to the component's configured widths exactly like
    /// a bus-driven write (4.7.9 step 5).
    fn interact(ctx: &mut SimContext, entity: Entity, action: &InteractionAction) -> bool {
        let InteractionAction::MemoryWrite { address, value } = action else {
            return false;
        };
        let (address_bits, data_bits) = {
            let world = ctx.world.lock();
            let Some(props) = world.get::<Properties>(entity) else {
                return false;
            };
            (Self::address_bits(props), Self::data_bits(props))
        };
        let address_mask = if address_bits >= 64 { u64::MAX } else { (1u64 << address_bits) - 1 };
        let data_mask = if data_bits >= 64 { u64::MAX } else { (1u64 << data_bits) - 1 };
        let address = address & address_mask;
        let stored = value & data_mask;

        let mut changed = false;
        Self::update_state(ctx, entity, |state| {
            let previous = state.cells.get(&address).copied().unwrap_or(0);
            changed = previous != stored;
            if stored == 0 {
                state.cells.remove(&address);
            } else {
                state.cells.insert(address, stored);
            }
            state.last_operation = LastOperation::Write;
            state.last_address = address;
            state.last_data = stored;
        });
        changed
    }

    fn get_link_mappings(world: &World, entity: Entity) -> Vec<(String, Id)> {
        let Some(props) = world.get::<Properties>(entity) else {
            return Vec::new();
        };
        let address_bits = Self::address_bits(props);
        let data_bits = Self::data_bits(props);
        let (address_bus_name, data_bus_name) = Self::bus_names(props);
        let address_tabs = Self::named_pin_tabs(world, entity, "ADDR", address_bits);
        let data_tabs = Self::named_pin_tabs(world, entity, "DATA", data_bits);

        let mut mappings = Vec::new();
        for (i, tab) in address_tabs.into_iter().enumerate() {
            mappings.push((format!("{address_bus_name}_{i}"), tab));
        }
        for (i, tab) in data_tabs.into_iter().enumerate() {
            mappings.push((format!("{data_bus_name}_{i}"), tab));
        }
        mappings
    }
}
