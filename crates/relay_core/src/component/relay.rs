//! DPDT relay: an electromechanical switch with a coil and two poles,
//! each wired common/normally-closed/normally-open. Energizing or
//! de-energizing the coil doesn't flip the contacts immediately -- it
//! starts a switching-delay timer, mirroring the physical armature's
//! travel time. If the coil reverses again before the timer fires, the
//! pending transition is aborted and the contacts never move, exactly as
//! a real armature that reverses direction mid-travel would settle back
//! where it started.
//!
//! Like [`super::clock::Clock`], the delay runs on a background timer
//! that flips bridges and marks VNETs dirty itself, through the same
//! coarse locks everything else in [`crate::context::SimContext`] uses,
//! and nudges the engine awake via the restart callback.

use std::time::Duration;

use bevy_ecs::prelude::Entity;

use crate::component::{Behavior, Pins, Properties};
use crate::context::SimContext;
use crate::engine::timer::{TimerFired, TimerHandle, TimerKind};
use crate::ids::{EntityId, Id};
use crate::model::pin::PinTabs;

/// Default switching delay when a relay's document doesn't specify one.
/// The exact value is left to the implementation; this sits in the "low
/// tens of milliseconds" range the source material suggests and is
/// always overridable per-instance via the `switching_delay_ms`
/// property.
pub const DEFAULT_SWITCHING_DELAY_MS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Released,
    Energizing,
    Energized,
    DeEnergizing,
}

#[derive(Debug, Clone)]
pub struct RelayRuntime {
    pub state: RelayState,
    pub last_coil: bool,
    pub switching_delay: Duration,
    pub timer: TimerHandle,
}

struct PoleTabs {
    common: Id,
    nc: Id,
    no: Id,
}

struct RelayTabs {
    coil: Id,
    pole1: PoleTabs,
    pole2: PoleTabs,
}

pub struct DpdtRelay;

impl DpdtRelay {
    fn pin_tab(world: &bevy_ecs::world::World, pins: &Pins, name: &str) -> Option<Id> {
        let pin_entity = pins.get(name)?;
        let tab_entity = *world.get::<PinTabs>(pin_entity)?.0.first()?;
        world.get::<EntityId>(tab_entity).map(|EntityId(id)| *id)
    }

    fn tabs(ctx: &SimContext, entity: Entity) -> Option<RelayTabs> {
        let world = ctx.world.lock();
        let pins = world.get::<Pins>(entity)?;
        Some(RelayTabs {
            coil: Self::pin_tab(&world, pins, "COIL")?,
            pole1: PoleTabs {
                common: Self::pin_tab(&world, pins, "P1_COMMON")?,
                nc: Self::pin_tab(&world, pins, "P1_NC")?,
                no: Self::pin_tab(&world, pins, "P1_NO")?,
            },
            pole2: PoleTabs {
                common: Self::pin_tab(&world, pins, "P2_COMMON")?,
                nc: Self::pin_tab(&world, pins, "P2_NC")?,
                no: Self::pin_tab(&world, pins, "P2_NO")?,
            },
        })
    }

    fn component_id(ctx: &SimContext, entity: Entity) -> Option<Id> {
        let world = ctx.world.lock();
        world.get::<EntityId>(entity).map(|EntityId(id)| *id)
    }

    fn connect_released(ctx: &mut SimContext, tabs: &RelayTabs) {
        ctx.remove_bridge_between(tabs.pole1.common, tabs.pole1.no);
        ctx.remove_bridge_between(tabs.pole2.common, tabs.pole2.no);
        ctx.add_bridge(tabs.pole1.common, tabs.pole1.nc);
        ctx.add_bridge(tabs.pole2.common, tabs.pole2.nc);
    }

    fn connect_energized(ctx: &mut SimContext, tabs: &RelayTabs) {
        ctx.remove_bridge_between(tabs.pole1.common, tabs.pole1.nc);
        ctx.remove_bridge_between(tabs.pole2.common, tabs.pole2.nc);
        ctx.add_bridge(tabs.pole1.common, tabs.pole1.no);
        ctx.add_bridge(tabs.pole2.common, tabs.pole2.no);
    }
}

impl Behavior for DpdtRelay {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        let Some(component_id) = Self::component_id(ctx, entity) else {
            return;
        };
        let Some(tabs) = Self::tabs(ctx, entity) else {
            return;
        };

        let delay_ms = {
            let world = ctx.world.lock();
            world
                .get::<Properties>(entity)
                .map(|p| p.get_int("switching_delay_ms", DEFAULT_SWITCHING_DELAY_MS as i64))
                .unwrap_or(DEFAULT_SWITCHING_DELAY_MS as i64)
                .max(1) as u64
        };

        Self::connect_released(ctx, &tabs);

        let runtime = RelayRuntime {
            state: RelayState::Released,
            last_coil: ctx.vnet_state(tabs.coil).is_high(),
            switching_delay: Duration::from_millis(delay_ms),
            timer: TimerHandle::new(),
        };
        ctx.relay_runtime_slot(component_id, runtime);
    }

    fn simulate_logic(ctx: &mut SimContext, entity: Entity) {
        let Some(component_id) = Self::component_id(ctx, entity) else {
            return;
        };
        let Some(tabs) = Self::tabs(ctx, entity) else {
            return;
        };
        let Some(runtime_handle) = ctx.relay_runtime.get(component_id) else {
            return;
        };

        let coil_high = ctx.vnet_state(tabs.coil).is_high();

        let (should_schedule_energize, should_schedule_deenergize) = {
            let mut runtime = runtime_handle.lock().expect("relay runtime mutex poisoned");
            if coil_high == runtime.last_coil {
                return;
            }
            runtime.last_coil = coil_high;

            match (runtime.state, coil_high) {
                (RelayState::Released, true) => {
                    runtime.state = RelayState::Energizing;
                    (true, false)
                }
                (RelayState::Energized, false) => {
                    runtime.state = RelayState::DeEnergizing;
                    (false, true)
                }
                (RelayState::Energizing, false) => {
                    runtime.timer.cancel();
                    runtime.state = RelayState::Released;
                    (false, false)
                }
                (RelayState::DeEnergizing, true) => {
                    runtime.timer.cancel();
                    runtime.state = RelayState::Energized;
                    (false, false)
                }
                _ => (false, false),
            }
        };

        // VNET membership of a tab never changes mid-run, so the handful
        // of VNET ids the pending transition will need to mark dirty can
        // be resolved once here and carried into the timer closure,
        // exactly as the clock resolves its output VNET in `sim_start`.
        let affected_vnets: Vec<Id> = [
            tabs.pole1.common,
            tabs.pole1.nc,
            tabs.pole1.no,
            tabs.pole2.common,
            tabs.pole2.nc,
            tabs.pole2.no,
        ]
        .into_iter()
        .filter_map(|tab| ctx.vnets.vnet_for_tab(tab).map(|v| v.id))
        .collect();

        if should_schedule_energize {
            let delay = { runtime_handle.lock().expect("relay runtime mutex poisoned").switching_delay };
            let timer = { runtime_handle.lock().expect("relay runtime mutex poisoned").timer.clone() };
            let bridges_handle = ctx.bridges_handle();
            let dirty_handle = ctx.dirty_handle();
            let ids_handle = ctx.ids_handle();
            let restart = ctx.restart_handle();
            let timer_events = ctx.timer_events_handle();
            let runtime_handle = runtime_handle.clone();
            let pole1 = (tabs.pole1.common, tabs.pole1.nc, tabs.pole1.no);
            let pole2 = (tabs.pole2.common, tabs.pole2.nc, tabs.pole2.no);
            let affected_vnets = affected_vnets.clone();

            timer.schedule_once(delay, move || {
                let mut runtime = runtime_handle.lock().expect("relay runtime mutex poisoned");
                if runtime.state != RelayState::Energizing {
                    return;
                }
                runtime.state = RelayState::Energized;
                drop(runtime);

                {
                    let mut bridges = bridges_handle.lock();
                    let mut ids = ids_handle.0.lock().expect("id registry mutex poisoned");
                    bridges.remove_between(pole1.0, pole1.1);
                    bridges.remove_between(pole2.0, pole2.1);
                    bridges.add_bridge(&mut ids, pole1.0, pole1.2);
                    bridges.add_bridge(&mut ids, pole2.0, pole2.2);
                }
                for &vnet in &affected_vnets {
                    dirty_handle.mark_dirty(vnet);
                }
                let _ = timer_events.send(TimerFired { component_id, kind: TimerKind::RelayContactsSwitched });
                restart.fire();
            });
        } else if should_schedule_deenergize {
            let delay = { runtime_handle.lock().expect("relay runtime mutex poisoned").switching_delay };
            let timer = { runtime_handle.lock().expect("relay runtime mutex poisoned").timer.clone() };
            let bridges_handle = ctx.bridges_handle();
            let dirty_handle = ctx.dirty_handle();
            let ids_handle = ctx.ids_handle();
            let restart = ctx.restart_handle();
            let timer_events = ctx.timer_events_handle();
            let runtime_handle = runtime_handle.clone();
            let pole1 = (tabs.pole1.common, tabs.pole1.nc, tabs.pole1.no);
            let pole2 = (tabs.pole2.common, tabs.pole2.nc, tabs.pole2.no);
            let affected_vnets = affected_vnets.clone();

            timer.schedule_once(delay, move || {
                let mut runtime = runtime_handle.lock().expect("relay runtime mutex poisoned");
                if runtime.state != RelayState::DeEnergizing {
                    return;
                }
                runtime.state = RelayState::Released;
                drop(runtime);

                {
                    let mut bridges = bridges_handle.lock();
                    let mut ids = ids_handle.0.lock().expect("id registry mutex poisoned");
                    bridges.remove_between(pole1.0, pole1.2);
                    bridges.remove_between(pole2.0, pole2.2);
                    bridges.add_bridge(&mut ids, pole1.0, pole1.1);
                    bridges.add_bridge(&mut ids, pole2.0, pole2.1);
                }
                for &vnet in &affected_vnets {
                    dirty_handle.mark_dirty(vnet);
                }
                let _ = timer_events.send(TimerFired { component_id, kind: TimerKind::RelayContactsSwitched });
                restart.fire();
            });
        }
    }

    fn sim_stop(ctx: &mut SimContext, entity: Entity) {
        let Some(component_id) = Self::component_id(ctx, entity) else {
            return;
        };
        if let Some(runtime_handle) = ctx.relay_runtime.get(component_id) {
            let mut runtime = runtime_handle.lock().expect("relay runtime mutex poisoned");
            runtime.timer.cancel();
            runtime.state = RelayState::Released;
        }
        if let Some(tabs) = Self::tabs(ctx, entity) {
            Self::connect_released(ctx, &tabs);
        }
        ctx.relay_runtime.remove(component_id);
    }
}
