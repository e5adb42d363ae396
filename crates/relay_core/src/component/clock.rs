//! Clock: a free-running square-wave source. Its phase flips on a
//! background timer tied to its period; the timer writes the output pin
//! directly and marks the pin's VNET dirty itself, using the VNET id
//! resolved once at `sim_start` (VNET membership never changes mid-run).
//! The engine picks up the change on its next pass, or is nudged awake
//! via the restart callback if it had already gone idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bevy_ecs::prelude::Entity;

use crate::component::{Behavior, InteractionAction, Pins, Properties};
use crate::context::SimContext;
use crate::engine::timer::{TimerFired, TimerHandle, TimerKind};
use crate::ids::{EntityId, Id};
use crate::model::pin::{PinSignal, PinTabs};
use crate::signal::Signal;

#[derive(Debug, Clone)]
pub struct ClockRuntime {
    pub enabled: bool,
    pub period: Duration,
    pub timer: TimerHandle,
}

pub struct Clock;

impl Clock {
    fn output_pin(ctx: &SimContext, entity: Entity) -> Option<Entity> {
        let world = ctx.world.lock();
        world.get::<Pins>(entity)?.get("OUT")
    }

    fn output_tab_id(ctx: &SimContext, pin: Entity) -> Option<Id> {
        let world = ctx.world.lock();
        let tab = *world.get::<PinTabs>(pin)?.0.first()?;
        world.get::<EntityId>(tab).map(|EntityId(id)| *id)
    }

    fn component_id(ctx: &SimContext, entity: Entity) -> Option<Id> {
        let world = ctx.world.lock();
        world.get::<EntityId>(entity).map(|EntityId(id)| *id)
    }

    /// Arm the repeating half-period timer that flips the output pin.
    /// Shared by `sim_start` (when `enable_on_sim_start` is set) and
    /// `interact`'s `Toggle` action turning a stopped clock back on --
    /// both need the exact same background-timer wiring.
    fn start_ticking(ctx: &mut SimContext, component_id: Id, pin: Entity, vnet_id: Id, period_ms: u64, timer: &TimerHandle) {
        let world_handle = ctx.world_handle();
        let dirty_handle = ctx.dirty_handle();
        let restart = ctx.restart_handle();
        let half_period = Duration::from_millis((period_ms / 2).max(1));
        let phase = Arc::new(AtomicBool::new(false));
        let timer_events = ctx.timer_events_handle();

        timer.schedule_repeating(half_period, move || {
            let new_phase = !phase.load(Ordering::SeqCst);
            phase.store(new_phase, Ordering::SeqCst);
            let signal = Signal::from_bool(new_phase);

            let mut world = world_handle.lock();
            let changed = world
                .get::<PinSignal>(pin)
                .map(|PinSignal(old)| old.changed_from(signal))
                .unwrap_or(true);
            if changed {
                world.entity_mut(pin).insert(PinSignal(signal));
            }
            drop(world);

            if changed {
                dirty_handle.mark_dirty(vnet_id);
            }
            let _ = timer_events.send(TimerFired { component_id, kind: TimerKind::ClockTick });
            restart.fire();
        });
    }
}

impl Behavior for Clock {
    fn sim_start(ctx: &mut SimContext, entity: Entity) {
        let Some(component_id) = Self::component_id(ctx, entity) else {
            return;
        };
        let Some(pin) = Self::output_pin(ctx, entity) else {
            return;
        };
        let output_tab = Self::output_tab_id(ctx, pin);
        let output_vnet = output_tab.and_then(|tab| ctx.vnets.vnet_for_tab(tab)).map(|v| v.id);

        let (period_ms, enabled) = {
            let world = ctx.world.lock();
            let props = world.get::<Properties>(entity);
            let period_ms = props.map(|p| p.get_int("period_ms", 1000)).unwrap_or(1000).max(1) as u64;
            // `enable_on_sim_start`: whether the clock is already running
            // the instant the engine initializes, vs. starting released
            // and waiting for a `Toggle` interaction.
            let enabled = props.map(|p| p.get_bool("enable_on_sim_start", true)).unwrap_or(true);
            (period_ms, enabled)
        };

        let timer = TimerHandle::new();
        ctx.set_pin_signal(pin, Signal::Float);

        if enabled {
            if let Some(vnet_id) = output_vnet {
                Self::start_ticking(ctx, component_id, pin, vnet_id, period_ms, &timer);
            }
        }

        ctx.clock_runtime_slot(component_id, ClockRuntime { enabled, period: Duration::from_millis(period_ms), timer });
    }

    fn simulate_logic(_ctx: &mut SimContext, _entity: Entity) {
        // All state transitions happen on the background timer; nothing
        // to do when (re)enqueued by a dirty VNET elsewhere in the graph.
    }

    fn sim_stop(ctx: &mut SimContext, entity: Entity) {
        if let Some(component_id) = Self::component_id(ctx, entity) {
            if let Some(runtime) = ctx.clock_runtime.get(component_id) {
                runtime.lock().expect("clock runtime mutex poisoned").timer.cancel();
            }
        }
    }

    /// `Toggle` flips `enabled`. Turning it off cancels the
    /// repeating timer and floats the output; turning it back on re-arms
    /// a fresh repeating timer starting from phase low, on the same
    /// `TimerHandle` (its generation counter makes the old loop, if any
    /// stray wakeup is still in flight, a no-op).
    fn interact(ctx: &mut SimContext, entity: Entity, action: &InteractionAction) -> bool {
        if !matches!(action, InteractionAction::Toggle) {
            return false;
        }
        let Some(component_id) = Self::component_id(ctx, entity) else {
            return false;
        };
        let Some(runtime_handle) = ctx.clock_runtime.get(component_id) else {
            return false;
        };
        let (now_enabled, period_ms, timer) = {
            let mut runtime = runtime_handle.lock().expect("clock runtime mutex poisoned");
            runtime.enabled = !runtime.enabled;
            (runtime.enabled, runtime.period.as_millis().max(1) as u64, runtime.timer.clone())
        };

        let Some(pin) = Self::output_pin(ctx, entity) else {
            return true;
        };
        if now_enabled {
            let output_tab = Self::output_tab_id(ctx, pin);
            if let Some(vnet_id) = output_tab.and_then(|tab| ctx.vnets.vnet_for_tab(tab)).map(|v| v.id) {
                Self::start_ticking(ctx, component_id, pin, vnet_id, period_ms, &timer);
            }
        } else {
            timer.cancel();
            ctx.set_pin_signal(pin, Signal::Float);
        }
        true
    }
}
