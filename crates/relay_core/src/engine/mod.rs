//! The simulation engine: the fixed-point loop that ties the VNET
//! evaluator, the bridge manager, the dirty-flag manager and the
//! component update coordinator together (section 4.8).
//!
//! `run()` is a plain blocking call; it does not spawn its own thread.
//! Section 5's "single dedicated worker thread" requirement is the
//! *caller's* responsibility -- the `relay_sim` crate wraps this in
//! exactly one background thread and drains statistics over a channel,
//! while tests and other embedders that are already off the UI thread
//! can call `run()` directly.

pub mod coordinator;
pub mod state;
pub mod statistics;
pub mod timer;

pub use state::SimulationState;
pub use statistics::Statistics;

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bevy_ecs::prelude::Entity;
use bevy_log::{debug, error, info, warn};

use crate::component::{dispatch, InteractionAction};
use crate::context::{BridgeManagerHandle, ClockRuntimeTable, DirtyManagerHandle, IdRegistryHandle, RelayRuntimeTable, RestartHandle, SimContext, WorldHandle};
use crate::error::{InteractionError, TopologyWarning};
use crate::ids::EntityId;
use crate::ids::Id;
use crate::model::document::Document;
use crate::model::pin::OwnerComponent;
use crate::model::tab::{OwnerPin, TabMarker};
use crate::vnet::link_resolver::LinkResolutionResult;
use crate::vnet::{propagate, BridgeManager, VnetTable};

use coordinator::ComponentUpdateCoordinator;
use timer::TimerFired;

pub const DEFAULT_MAX_ITERATIONS: u64 = 10_000;
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub max_iterations: u64,
    pub timeout: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Diagnostics produced once while building a document's VNETs: the
/// topology warnings collected during the per-page flood fill, plus the
/// link-resolution summary (section 6.6, emitted "after initialize").
#[derive(Debug, Clone, Default)]
pub struct InitializeDiagnostics {
    pub topology_warnings: Vec<TopologyWarning>,
    pub link_resolution: LinkResolutionResult,
}

pub struct SimulationEngine {
    world: WorldHandle,
    vnets: VnetTable,
    bridges: BridgeManagerHandle,
    dirty: DirtyManagerHandle,
    ids: IdRegistryHandle,
    restart: RestartHandle,
    relay_runtime: RelayRuntimeTable,
    clock_runtime: ClockRuntimeTable,

    component_entities: Vec<Entity>,
    tab_entity_by_id: HashMap<Id, Entity>,

    diagnostics: InitializeDiagnostics,
    config: EngineConfig,
    state: SimulationState,
    statistics: Statistics,
    stop_requested: Arc<AtomicBool>,
    coordinator: ComponentUpdateCoordinator,
    timer_tx: crossbeam_channel::Sender<TimerFired>,
    timer_rx: crossbeam_channel::Receiver<TimerFired>,
}

impl SimulationEngine {
    pub fn new(mut document: Document, vnets: VnetTable, bridges: BridgeManager, diagnostics: InitializeDiagnostics, config: EngineConfig) -> Self {
        let mut component_entities: Vec<Entity> = document.pages.iter().flat_map(|p| p.components.iter().copied()).collect();

        let mut by_id: Vec<(Id, Entity)> = component_entities
            .iter()
            .filter_map(|&e| document.world.get::<EntityId>(e).map(|EntityId(id)| (*id, e)))
            .collect();
        by_id.sort_by_key(|(id, _)| *id);
        component_entities = by_id.into_iter().map(|(_, e)| e).collect();

        let mut tab_entity_by_id = HashMap::new();
        {
            let mut query = document.world.query::<(Entity, &EntityId, &TabMarker)>();
            for (entity, EntityId(id), _) in query.iter(&document.world) {
                tab_entity_by_id.insert(*id, entity);
            }
        }

        let ids = IdRegistryHandle::new(document.ids);
        let bridges_handle = BridgeManagerHandle::new();
        *bridges_handle.0.lock().expect("bridge registry mutex poisoned") = bridges;
        let (timer_tx, timer_rx) = timer::channel();

        Self {
            world: WorldHandle::new(document.world),
            vnets,
            bridges: bridges_handle,
            dirty: DirtyManagerHandle::new(),
            ids,
            restart: RestartHandle::default(),
            relay_runtime: RelayRuntimeTable::default(),
            clock_runtime: ClockRuntimeTable::default(),
            component_entities,
            tab_entity_by_id,
            diagnostics,
            config,
            state: SimulationState::Stopped,
            statistics: Statistics::default(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            coordinator: ComponentUpdateCoordinator::new(),
            timer_tx,
            timer_rx,
        }
    }

    pub fn get_state(&self) -> SimulationState {
        self.state
    }

    pub fn get_statistics(&self) -> Statistics {
        self.statistics
    }

    pub fn diagnostics(&self) -> &InitializeDiagnostics {
        &self.diagnostics
    }

    pub fn set_restart_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.restart.set(callback);
    }

    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// A clone of the cooperative stop flag `run()`'s loop polls between
    /// iterations. A threaded facade that owns the engine on a worker
    /// thread (see `relay_sim`) needs this to implement `stop()` from a
    /// different thread without routing through the command queue the
    /// worker itself is busy draining while `run()` is in progress.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// The id used to label a component-logic panic in the log; falls
    /// back to a placeholder rather than panicking itself if the world
    /// lock or the `EntityId` lookup fails mid-unwind.
    fn entity_label(&self, entity: Entity) -> String {
        self.world
            .lock()
            .get::<EntityId>(entity)
            .map(|EntityId(id)| id.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    /// Run one component dispatch call (`sim_start`/`simulate_logic`/
    /// `sim_stop`) under `catch_unwind` per the COMPONENT_LOGIC_ERROR
    /// contract (section 7): a panicking hook is logged and
    /// skipped, not allowed to bring down the whole iteration.
    fn guarded_dispatch(&mut self, entity: Entity, what: &str, call: impl FnOnce(&mut SimContext, Entity)) {
        let result = {
            let mut ctx = self.make_context();
            catch_unwind(AssertUnwindSafe(|| call(&mut ctx, entity)))
        };
        if let Err(panic) = result {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "<non-string panic payload>".to_string());
            error!(component = %self.entity_label(entity), hook = what, %message, "component logic error; skipping for this iteration");
        }
    }

    fn make_context(&mut self) -> SimContext<'_> {
        SimContext {
            world: &self.world,
            vnets: &self.vnets,
            bridges: &self.bridges,
            dirty: &self.dirty,
            ids: &self.ids,
            restart: &self.restart,
            relay_runtime: &self.relay_runtime,
            clock_runtime: &self.clock_runtime,
            timer_events: &self.timer_tx,
        }
    }

    /// Drain whatever timer-fired notices piled up since the last drain,
    /// folding them into the statistics and a debug log line. Timers
    /// apply their effects (flipping bridges, marking VNETs dirty) under
    /// their own locks before sending, so this never needs to run
    /// promptly for correctness -- only for observability.
    fn drain_timer_events(&mut self) {
        while let Ok(fired) = self.timer_rx.try_recv() {
            self.statistics.timer_ticks += 1;
            debug!(component = %fired.component_id, kind = ?fired.kind, "background timer fired");
        }
    }

    /// `sim_start` on every component (sorted by id) and mark every VNET
    /// dirty. VNET construction and link resolution already happened
    /// before `new` was called; this only runs the component lifecycle
    /// hook and primes the dirty set for the first `run()`.
    pub fn initialize(&mut self) {
        self.state = SimulationState::Initializing;
        self.statistics = Statistics::default();
        self.stop_requested.store(false, Ordering::SeqCst);

        let entities = self.component_entities.clone();
        for entity in entities {
            self.guarded_dispatch(entity, "sim_start", dispatch::sim_start);
        }

        let mut all_vnets: Vec<Id> = self.vnets.vnets.keys().copied().collect();
        all_vnets.sort();
        self.dirty.mark_all_dirty(all_vnets);

        info!(
            resolved_links = self.diagnostics.link_resolution.resolved_links,
            unresolved_or_singleton = self.diagnostics.link_resolution.warnings.len(),
            cross_page_links = self.diagnostics.link_resolution.cross_page_links,
            topology_warnings = self.diagnostics.topology_warnings.len(),
            "simulation initialized"
        );
        for warning in &self.diagnostics.topology_warnings {
            warn!(%warning, "topology warning");
        }
        for warning in &self.diagnostics.link_resolution.warnings {
            warn!(%warning, "link resolution warning");
        }

        self.state = SimulationState::Stopped;
    }

    fn owning_components_of_vnet(&self, vnet: Id) -> Vec<Entity> {
        let world = self.world.lock();
        let Some(v) = self.vnets.vnets.get(&vnet) else {
            return Vec::new();
        };
        let mut tabs: Vec<Id> = v.tabs.iter().copied().collect();
        tabs.sort();
        let mut owners = Vec::new();
        for tab_id in tabs {
            let Some(&tab_entity) = self.tab_entity_by_id.get(&tab_id) else {
                continue;
            };
            let Some(OwnerPin(pin_entity)) = world.get::<OwnerPin>(tab_entity) else {
                continue;
            };
            let Some(OwnerComponent(component_entity)) = world.get::<OwnerComponent>(*pin_entity) else {
                continue;
            };
            owners.push(*component_entity);
        }
        owners
    }

    /// One pass of the main loop (section 4.8). Returns `true` if the loop
    /// should keep going, `false` if this was the last iteration (the
    /// engine transitioned to a terminal state).
    fn step(&mut self) -> bool {
        self.drain_timer_events();
        if self.dirty.is_empty() {
            self.state = SimulationState::Stable;
            self.statistics.stable = true;
            return false;
        }

        let id_index = self.tab_entity_by_id.clone();
        let propagate_result = {
            let world = self.world.lock();
            let bridges = self.bridges.lock();
            propagate::step(&world, &id_index, &mut self.vnets, &bridges)
        };

        let dirty_snapshot = self.dirty.snapshot();

        let mut to_update: HashSet<Entity> = HashSet::new();
        for &vnet in &propagate_result.changed {
            for owner in self.owning_components_of_vnet(vnet) {
                to_update.insert(owner);
            }
        }

        for vnet in dirty_snapshot {
            self.dirty.clear_dirty(vnet);
        }

        let mut sorted_updates: Vec<(Id, Entity)> = {
            let world = self.world.lock();
            to_update.into_iter().filter_map(|e| world.get::<EntityId>(e).map(|EntityId(id)| (*id, e))).collect()
        };
        sorted_updates.sort_by_key(|(id, _)| *id);

        for (_, entity) in &sorted_updates {
            self.coordinator.enqueue(*entity);
        }
        let batch = self.coordinator.start_updates();
        for entity in batch {
            self.guarded_dispatch(entity, "simulate_logic", dispatch::simulate_logic);
            self.coordinator.mark_update_complete(entity);
            self.statistics.components_updated += 1;
        }

        self.statistics.iterations += 1;
        debug!(iteration = self.statistics.iterations, changed_vnets = propagate_result.changed.len(), "iteration complete");

        if self.statistics.iterations >= self.config.max_iterations {
            self.state = SimulationState::Oscillating;
            self.statistics.max_iterations_reached = true;
            warn!(iterations = self.statistics.iterations, "simulation oscillating: max iterations reached");
            return false;
        }
        if self.stop_requested.load(Ordering::SeqCst) {
            self.state = SimulationState::Stopped;
            return false;
        }
        true
    }

    /// Run to a fixed point (or until oscillation/timeout/stop).
    /// Determinism: sorted iteration over VNET and component ids, a
    /// full-graph union-find recompute every iteration, and the
    /// restricted mutation scope component logic is confined to (section
    /// 4.8, "Determinism").
    pub fn run(&mut self) -> Statistics {
        self.state = SimulationState::Running;
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.config.timeout {
                self.state = SimulationState::Timeout;
                self.statistics.timed_out = true;
                warn!(elapsed_ms = started.elapsed().as_millis() as u64, "simulation timed out before reaching stability");
                break;
            }
            if !self.step() {
                break;
            }
        }

        self.drain_timer_events();
        self.statistics.wall_time = started.elapsed();
        if self.state == SimulationState::Stable {
            self.statistics.time_to_stability = Some(self.statistics.wall_time);
            info!(iterations = self.statistics.iterations, wall_time_ms = self.statistics.wall_time.as_millis() as u64, "simulation stable");
        }
        self.statistics
    }

    /// Stop the loop, run `sim_stop` on every component, and clear the
    /// dirty set and any pending update batch.
    pub fn shutdown(&mut self) -> bool {
        self.stop();
        let entities = self.component_entities.clone();
        for entity in entities {
            self.guarded_dispatch(entity, "sim_stop", dispatch::sim_stop);
        }
        let dirty_snapshot = self.dirty.snapshot();
        for vnet in dirty_snapshot {
            self.dirty.clear_dirty(vnet);
        }
        self.state = SimulationState::Stopped;
        true
    }

    /// A component's current runtime state (switch position, indicator
    /// lamp, memory cells, ...), for a host application rendering the
    /// schematic or a test asserting on the outcome of a run. Read-only;
    /// the engine is still the only writer.
    pub fn component_state(&self, component_id: Id) -> Option<crate::component::ComponentState> {
        let entity = self.find_component(component_id)?;
        self.world.lock().get::<crate::component::ComponentState>(entity).cloned()
    }

    fn find_component(&self, component_id: Id) -> Option<Entity> {
        let world = self.world.lock();
        self.component_entities
            .iter()
            .copied()
            .find(|&e| world.get::<EntityId>(e).map(|EntityId(id)| *id) == Some(component_id))
    }

    /// External interaction API (section 6.4). Each call serializes with the
    /// engine purely through the coarse locks already held by `world`,
    /// `dirty` and `bridges` -- there is no separate command queue.
    pub fn interact(&mut self, component_id: Id, action: InteractionAction) -> Result<bool, InteractionError> {
        let Some(entity) = self.find_component(component_id) else {
            warn!(component = %component_id, "interaction rejected: unknown component");
            return Err(InteractionError::UnknownComponent);
        };
        let mut ctx = self.make_context();
        let changed = dispatch::interact(&mut ctx, entity, &action);
        debug!(component = %component_id, ?action, changed, "interaction applied");
        Ok(changed)
    }
}
