//! VCC: an unconditional power source. Drives its single pin `HIGH` the
//! moment the simulation starts and never changes afterwards.

use bevy_ecs::prelude::Entity;

use crate::component::{Behavior, Pins};
use crate::context::SimContext;
use crate::signal::Signal;

pub struct Vcc;

impl Behavior for Vcc {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        let pin = {
            let world = ctx.world.lock();
            world.get::<Pins>(entity).and_then(|pins| pins.get("OUT"))
        };
        if let Some(pin) = pin {
            ctx.set_pin_signal(pin, Signal::High);
        }
    }

    fn simulate_logic(_ctx: &mut SimContext, _entity: Entity) {
        // A power source has no inputs to react to.
    }

    fn sim_stop(_ctx: &mut SimContext, _entity: Entity) {}
}
