//! Diode: one-way conduction by conditional bridging, not by driving.
//! When the Anode's VNET is `High`, the diode bridges Anode to Cathode so
//! that potential reaches the cathode side; when the anode drops back to
//! `Float`, the bridge is removed. The diode never calls
//! [`SimContext::set_pin_signal`] -- it only couples or decouples two
//! VNETs, so there is no path for the cathode side to back-drive the
//! anode side.

use bevy_ecs::prelude::{Component as EcsComponent, Entity};
use serde::{Deserialize, Serialize};

use crate::component::{Behavior, Pins};
use crate::context::SimContext;
use crate::ids::{EntityId, Id};
use crate::model::pin::PinTabs;

#[derive(EcsComponent, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiodeState {
    pub conducting: bool,
}

pub struct Diode;

impl Diode {
    fn tab_ids(ctx: &SimContext, entity: Entity) -> Option<(Id, Id)> {
        let world = ctx.world.lock();
        let pins = world.get::<Pins>(entity)?;
        let anode_pin = pins.get("ANODE")?;
        let cathode_pin = pins.get("CATHODE")?;
        let anode_tab = *world.get::<PinTabs>(anode_pin)?.0.first()?;
        let cathode_tab = *world.get::<PinTabs>(cathode_pin)?.0.first()?;
        let anode_id = world.get::<EntityId>(anode_tab)?.0;
        let cathode_id = world.get::<EntityId>(cathode_tab)?.0;
        Some((anode_id, cathode_id))
    }

    fn apply(ctx: &mut SimContext, entity: Entity) {
        let Some((anode, cathode)) = Self::tab_ids(ctx, entity) else {
            return;
        };
        let conducting = ctx.vnet_state(anode).is_high();
        if conducting {
            ctx.add_bridge(anode, cathode);
        } else {
            ctx.remove_bridge_between(anode, cathode);
        }
        let mut world = ctx.world.lock();
        if let Some(mut state_ref) = world.get_mut::<crate::component::ComponentState>(entity) {
            if let crate::component::ComponentState::Diode(state) = &mut *state_ref {
                state.conducting = conducting;
            }
        }
    }
}

impl Behavior for Diode {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        Self::apply(ctx, entity);
    }

    fn simulate_logic(ctx: &mut SimContext, entity: Entity) {
        Self::apply(ctx, entity);
    }

    fn sim_stop(ctx: &mut SimContext, entity: Entity) {
        if let Some((anode, cathode)) = Self::tab_ids(ctx, entity) {
            ctx.remove_bridge_between(anode, cathode);
        }
    }
}
