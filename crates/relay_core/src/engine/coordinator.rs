//! Component update coordinator: serializes the component-logic phase of
//! one iteration. The engine loop itself only ever drives this from a
//! single thread, invoking `simulate_logic` on each queued component in
//! turn, so `wait_for_completion` never actually blocks today -- the
//! contract is kept explicit (and the queue kept as actual state, not
//! just a loop variable) because a component's own logic may spawn
//! background workers (the relay's and clock's switching timers) that
//! report back into the engine asynchronously, and a future engine that
//! fans simulate_logic calls out across a small worker pool should be
//! able to drop in behind this same interface.

use bevy_ecs::prelude::Entity;

#[derive(Debug, Default)]
pub struct ComponentUpdateCoordinator {
    queued: Vec<Entity>,
    in_flight: Vec<Entity>,
}

impl ComponentUpdateCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, entity: Entity) {
        if !self.queued.contains(&entity) {
            self.queued.push(entity);
        }
    }

    /// Snapshot the queued components for this iteration and return how
    /// many there are. Nothing may be added to the batch until it's
    /// retired via [`Self::wait_for_completion`].
    pub fn start_updates(&mut self) -> Vec<Entity> {
        self.in_flight = std::mem::take(&mut self.queued);
        self.in_flight.clone()
    }

    pub fn mark_update_complete(&mut self, entity: Entity) {
        self.in_flight.retain(|&e| e != entity);
    }

    /// Sequential engines retire every component before returning from
    /// `start_updates`'s caller, so this is already true by the time it's
    /// called; it exists so the contract reads the same regardless of
    /// how many threads end up driving `simulate_logic`.
    pub fn wait_for_completion(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queued.len()
    }
}
