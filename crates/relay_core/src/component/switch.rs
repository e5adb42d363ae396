//! Switch: a manual toggle or momentary pushbutton. When "on" it bridges
//! its `A` and `B` tabs together; when "off" the bridge is removed. It
//! never drives a signal itself -- it only conducts whatever reaches
//! either side of it.

use bevy_ecs::prelude::{Component as EcsComponent, Entity};
use serde::{Deserialize, Serialize};

use crate::component::{Behavior, InteractionAction, Pins, Properties};
use crate::context::SimContext;
use crate::ids::EntityId;
use crate::model::pin::PinTabs;

#[derive(EcsComponent, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SwitchState {
    pub on: bool,
}

pub struct Switch;

impl Switch {
    fn tab_ids(ctx: &SimContext, entity: Entity) -> Option<(crate::ids::Id, crate::ids::Id)> {
        let world = ctx.world.lock();
        let pins = world.get::<Pins>(entity)?;
        let a_pin = pins.get("A")?;
        let b_pin = pins.get("B")?;
        let a_tab = *world.get::<PinTabs>(a_pin)?.0.first()?;
        let b_tab = *world.get::<PinTabs>(b_pin)?.0.first()?;
        let a_id = world.get::<EntityId>(a_tab)?.0;
        let b_id = world.get::<EntityId>(b_tab)?.0;
        Some((a_id, b_id))
    }

    fn apply(ctx: &mut SimContext, entity: Entity, on: bool) {
        let Some((a, b)) = Self::tab_ids(ctx, entity) else {
            return;
        };
        if on {
            ctx.add_bridge(a, b);
        } else {
            ctx.remove_bridge_between(a, b);
        }
    }

    fn is_pushbutton(ctx: &SimContext, entity: Entity) -> bool {
        let world = ctx.world.lock();
        world
            .get::<Properties>(entity)
            .map(|p| p.get_bool("momentary", false))
            .unwrap_or(false)
    }
}

impl Behavior for Switch {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        let initially_on = {
            let world = ctx.world.lock();
            world
                .get::<crate::component::ComponentState>(entity)
                .and_then(|state| match state {
                    crate::component::ComponentState::Switch(s) => Some(s.on),
                    _ => None,
                })
                .unwrap_or(false)
        };
        Self::apply(ctx, entity, initially_on);
    }

    fn simulate_logic(_ctx: &mut SimContext, _entity: Entity) {
        // A switch only reacts to interaction, not to its own VNET state.
    }

    fn sim_stop(ctx: &mut SimContext, entity: Entity) {
        Self::apply(ctx, entity, false);
    }

    fn interact(ctx: &mut SimContext, entity: Entity, action: &InteractionAction) -> bool {
        let momentary = Self::is_pushbutton(ctx, entity);
        let new_on = match action {
            InteractionAction::Toggle if !momentary => {
                let mut world = ctx.world.lock();
                let Some(mut state_ref) = world.get_mut::<crate::component::ComponentState>(entity) else {
                    return false;
                };
                let crate::component::ComponentState::Switch(state) = &mut *state_ref else {
                    return false;
                };
                state.on = !state.on;
                state.on
            }
            InteractionAction::Press if momentary => true,
            InteractionAction::Release if momentary => false,
            _ => return false,
        };
        {
            let mut world = ctx.world.lock();
            if let Some(mut state_ref) = world.get_mut::<crate::component::ComponentState>(entity) {
                if let crate::component::ComponentState::Switch(state) = &mut *state_ref {
                    state.on = new_on;
                }
            }
        }
        Self::apply(ctx, entity, new_on);
        true
    }
}
