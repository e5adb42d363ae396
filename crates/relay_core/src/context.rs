//! Shared, coarsely-locked handles passed to component behavior during a
//! simulation run. The dirty set, the bridge registry, the id registry
//! and the world itself are wrapped in `std::sync::Mutex` so that a
//! relay's or clock's background switching-delay timer can safely flip
//! bridges, mark VNETs dirty, and (for the clock) drive its own output
//! pin, without the engine's main loop needing anything finer-grained.
//! Locks are held only for the duration of a single mutation; nothing in
//! this crate holds one across a call back into component logic.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::{Entity, World};

use crate::component::relay::RelayRuntime;
use crate::component::clock::ClockRuntime;
use crate::engine::timer::TimerFired;
use crate::ids::{Id, IdRegistry};
use crate::signal::Signal;
use crate::vnet::{BridgeManager, DirtyFlagManager, VnetTable};

#[derive(Clone)]
pub struct WorldHandle(pub Arc<Mutex<World>>);

impl WorldHandle {
    pub fn new(world: World) -> Self {
        Self(Arc::new(Mutex::new(world)))
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, World> {
        self.0.lock().expect("world mutex poisoned")
    }
}

#[derive(Clone)]
pub struct BridgeManagerHandle(pub Arc<Mutex<BridgeManager>>);

impl BridgeManagerHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(BridgeManager::new())))
    }

    pub fn add_bridge(&self, ids: &IdRegistryHandle, a: Id, b: Id) -> Id {
        let mut bridges = self.0.lock().expect("bridge registry mutex poisoned");
        let mut registry = ids.0.lock().expect("id registry mutex poisoned");
        bridges.add_bridge(&mut registry, a, b)
    }

    pub fn remove_between(&self, a: Id, b: Id) -> Option<crate::vnet::Bridge> {
        self.0.lock().expect("bridge registry mutex poisoned").remove_between(a, b)
    }

    pub fn remove_bridge(&self, bridge_id: Id) -> Option<crate::vnet::Bridge> {
        self.0.lock().expect("bridge registry mutex poisoned").remove_bridge(bridge_id)
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, BridgeManager> {
        self.0.lock().expect("bridge registry mutex poisoned")
    }
}

impl Default for BridgeManagerHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct DirtyManagerHandle(pub Arc<Mutex<DirtyFlagManager>>);

impl DirtyManagerHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(DirtyFlagManager::new())))
    }

    pub fn mark_dirty(&self, vnet: Id) {
        self.0.lock().expect("dirty set mutex poisoned").mark_dirty(vnet);
    }

    pub fn mark_all_dirty(&self, vnets: impl IntoIterator<Item = Id>) {
        self.0.lock().expect("dirty set mutex poisoned").mark_all_dirty(vnets);
    }

    pub fn clear_dirty(&self, vnet: Id) {
        self.0.lock().expect("dirty set mutex poisoned").clear_dirty(vnet);
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().expect("dirty set mutex poisoned").is_empty()
    }

    pub fn snapshot(&self) -> std::collections::HashSet<Id> {
        self.0.lock().expect("dirty set mutex poisoned").snapshot()
    }
}

impl Default for DirtyManagerHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct IdRegistryHandle(pub Arc<Mutex<IdRegistry>>);

impl IdRegistryHandle {
    pub fn new(registry: IdRegistry) -> Self {
        Self(Arc::new(Mutex::new(registry)))
    }

    pub fn generate(&self) -> Id {
        self.0.lock().expect("id registry mutex poisoned").generate()
    }
}

/// The external callback the host application (GUI, headless harness)
/// registers to learn "the engine has new work, call `run()` again" when
/// a relay or clock timer fires after the engine has gone idle.
#[derive(Clone, Default)]
pub struct RestartHandle(pub Arc<Mutex<Option<Arc<dyn Fn() + Send + Sync>>>>);

impl RestartHandle {
    pub fn set(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.0.lock().expect("restart callback mutex poisoned") = Some(Arc::new(callback));
    }

    pub fn clear(&self) {
        *self.0.lock().expect("restart callback mutex poisoned") = None;
    }

    pub fn fire(&self) {
        let callback = self.0.lock().expect("restart callback mutex poisoned").clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Side tables holding the relay's and clock's mutable runtime state,
/// keyed by component id, outside the world entirely. A `RefCell` is
/// enough here (not a `Mutex`): the table is only ever touched from the
/// single thread driving `sim_start`/`sim_stop`; a background timer only
/// ever touches the `Arc<Mutex<...>>` *value* it was handed at schedule
/// time, never the table itself.
#[derive(Default)]
pub struct RelayRuntimeTable(std::cell::RefCell<std::collections::HashMap<Id, Arc<Mutex<RelayRuntime>>>>);

impl RelayRuntimeTable {
    pub fn insert(&self, id: Id, runtime: RelayRuntime) -> Arc<Mutex<RelayRuntime>> {
        let handle = Arc::new(Mutex::new(runtime));
        self.0.borrow_mut().insert(id, handle.clone());
        handle
    }

    pub fn get(&self, id: Id) -> Option<Arc<Mutex<RelayRuntime>>> {
        self.0.borrow().get(&id).cloned()
    }

    pub fn remove(&self, id: Id) {
        self.0.borrow_mut().remove(&id);
    }
}

#[derive(Default)]
pub struct ClockRuntimeTable(std::cell::RefCell<std::collections::HashMap<Id, Arc<Mutex<ClockRuntime>>>>);

impl ClockRuntimeTable {
    pub fn insert(&self, id: Id, runtime: ClockRuntime) -> Arc<Mutex<ClockRuntime>> {
        let handle = Arc::new(Mutex::new(runtime));
        self.0.borrow_mut().insert(id, handle.clone());
        handle
    }

    pub fn get(&self, id: Id) -> Option<Arc<Mutex<ClockRuntime>>> {
        self.0.borrow().get(&id).cloned()
    }

    pub fn remove(&self, id: Id) {
        self.0.borrow_mut().remove(&id);
    }
}

/// Everything a component's `Behavior` implementation needs during
/// `sim_start`/`simulate_logic`/`sim_stop`/`interact`.
pub struct SimContext<'a> {
    pub world: &'a WorldHandle,
    pub vnets: &'a VnetTable,
    pub bridges: &'a BridgeManagerHandle,
    pub dirty: &'a DirtyManagerHandle,
    pub ids: &'a IdRegistryHandle,
    pub restart: &'a RestartHandle,
    pub relay_runtime: &'a RelayRuntimeTable,
    pub clock_runtime: &'a ClockRuntimeTable,
    /// The sending half of the engine's timer-fired channel (see
    /// [`crate::engine::timer::channel`]), handed to relay and clock
    /// background timers so their eventual firing is observable in
    /// [`crate::engine::Statistics::timer_ticks`] without the engine
    /// needing to poll per-component runtime tables.
    pub timer_events: &'a crossbeam_channel::Sender<TimerFired>,
}

impl<'a> SimContext<'a> {
    /// The current electrical state of the VNET a tab belongs to. `Float`
    /// for a tab with no VNET (shouldn't happen once a document has been
    /// fully built, but components must not panic on malformed input).
    pub fn vnet_state(&self, tab: Id) -> Signal {
        self.vnets.state_of_tab(tab)
    }

    /// Mark the VNET owning `tab` dirty so the next iteration reconsiders it.
    pub fn mark_tab_dirty(&self, tab: Id) {
        if let Some(vnet) = self.vnets.vnet_for_tab(tab) {
            self.dirty.mark_dirty(vnet.id);
        }
    }

    pub fn add_bridge(&self, a: Id, b: Id) -> Id {
        let bridge_id = self.bridges.add_bridge(self.ids, a, b);
        self.mark_tab_dirty(a);
        self.mark_tab_dirty(b);
        bridge_id
    }

    pub fn remove_bridge_between(&self, a: Id, b: Id) {
        if self.bridges.remove_between(a, b).is_some() {
            self.mark_tab_dirty(a);
            self.mark_tab_dirty(b);
        }
    }

    /// Write a pin's driven signal and mark every tab under it dirty if
    /// the value actually changed.
    pub fn set_pin_signal(&self, pin_entity: Entity, new: Signal) {
        use crate::ids::EntityId;
        use crate::model::pin::{PinSignal, PinTabs};

        let mut world = self.world.lock();
        let changed = world
            .get::<PinSignal>(pin_entity)
            .map(|PinSignal(old)| old.changed_from(new))
            .unwrap_or(true);
        if !changed {
            return;
        }
        world.entity_mut(pin_entity).insert(PinSignal(new));
        let tab_ids: Vec<Id> = world
            .get::<PinTabs>(pin_entity)
            .map(|tabs| {
                tabs.0
                    .iter()
                    .filter_map(|&tab| world.get::<EntityId>(tab).map(|EntityId(id)| *id))
                    .collect()
            })
            .unwrap_or_default();
        drop(world);
        for tab in tab_ids {
            self.mark_tab_dirty(tab);
        }
    }

    /// Owned, clonable handles for capturing into a background timer
    /// closure, which cannot borrow from this (stack-lived) context.
    pub fn world_handle(&self) -> WorldHandle {
        self.world.clone()
    }

    pub fn dirty_handle(&self) -> DirtyManagerHandle {
        self.dirty.clone()
    }

    pub fn bridges_handle(&self) -> BridgeManagerHandle {
        self.bridges.clone()
    }

    pub fn ids_handle(&self) -> IdRegistryHandle {
        self.ids.clone()
    }

    pub fn restart_handle(&self) -> RestartHandle {
        self.restart.clone()
    }

    pub fn timer_events_handle(&self) -> crossbeam_channel::Sender<TimerFired> {
        self.timer_events.clone()
    }

    pub fn clock_runtime_slot(&self, component_id: Id, runtime: ClockRuntime) -> Arc<Mutex<ClockRuntime>> {
        self.clock_runtime.insert(component_id, runtime)
    }

    pub fn relay_runtime_slot(&self, component_id: Id, runtime: RelayRuntime) -> Arc<Mutex<RelayRuntime>> {
        self.relay_runtime.insert(component_id, runtime)
    }

    /// The id of an arbitrary (the first) tab owned by a pin, used to
    /// read the pin's home VNET for passive/control inputs.
    pub fn first_tab_of_pin(&self, pin_entity: Entity) -> Option<Id> {
        use crate::ids::EntityId;
        use crate::model::pin::PinTabs;

        let world = self.world.lock();
        let tabs = world.get::<PinTabs>(pin_entity)?;
        let first = *tabs.0.first()?;
        world.get::<EntityId>(first).map(|EntityId(id)| *id)
    }
}
