//! Indicator: a passive lamp. It never drives a signal; it reads the
//! state of the VNET its pin belongs to and records whether it should
//! light up. This is the canonical passive-input pattern every other
//! read-only component (the relay's coil, memory's control pins) follows:
//! ask the [`crate::context::SimContext`] for the VNET state of a tab,
//! never the pin's own (always-`Float`) state.

use bevy_ecs::prelude::{Component as EcsComponent, Entity};
use serde::{Deserialize, Serialize};

use crate::component::{Behavior, Pins};
use crate::context::SimContext;

#[derive(EcsComponent, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorState {
    pub active: bool,
}

pub struct Indicator;

impl Indicator {
    fn input_pin(ctx: &SimContext, entity: Entity) -> Option<Entity> {
        let world = ctx.world.lock();
        world.get::<Pins>(entity)?.get("IN")
    }

    fn read(ctx: &mut SimContext, entity: Entity) -> bool {
        let Some(pin) = Self::input_pin(ctx, entity) else {
            return false;
        };
        let Some(tab) = ctx.first_tab_of_pin(pin) else {
            return false;
        };
        ctx.vnet_state(tab).is_high()
    }

    fn write_state(ctx: &mut SimContext, entity: Entity, active: bool) {
        let mut world = ctx.world.lock();
        if let Some(mut state_ref) = world.get_mut::<crate::component::ComponentState>(entity) {
            if let crate::component::ComponentState::Indicator(state) = &mut *state_ref {
                state.active = active;
            }
        }
    }
}

impl Behavior for Indicator {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        let active = Self::read(ctx, entity);
        Self::write_state(ctx, entity, active);
    }

    fn simulate_logic(ctx: &mut SimContext, entity: Entity) {
        let active = Self::read(ctx, entity);
        Self::write_state(ctx, entity, active);
    }

    fn sim_stop(ctx: &mut SimContext, entity: Entity) {
        Self::write_state(ctx, entity, false);
    }
}
