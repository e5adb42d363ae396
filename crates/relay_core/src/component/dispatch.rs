//! Static dispatch over [`ComponentKind`]. This is the one place that
//! knows about every concrete component kind; everything else (the
//! engine loop, the link resolver) goes through these four functions and
//! never matches on `ComponentKind` itself. Adding a component kind means
//! adding a match arm here plus the new module -- nothing else changes.

use bevy_ecs::prelude::{Entity, World};

use crate::component::{Behavior, CircuitElement, ComponentKind, InteractionAction};
use crate::context::SimContext;
use crate::ids::Id;

use super::{bus::Bus, clock::Clock, diode::Diode, indicator::Indicator, link::Link, memory::Memory, relay::DpdtRelay, switch::Switch, vcc::Vcc};

fn kind_of(world: &World, entity: Entity) -> Option<ComponentKind> {
    world.get::<CircuitElement>(entity).map(|e| e.kind)
}

pub fn sim_start(ctx: &mut SimContext, entity: Entity) {
    let Some(kind) = kind_of(&ctx.world.lock(), entity) else {
        return;
    };
    match kind {
        ComponentKind::Vcc => Vcc::sim_start(ctx, entity),
        ComponentKind::Switch => Switch::sim_start(ctx, entity),
        ComponentKind::Clock => Clock::sim_start(ctx, entity),
        ComponentKind::Indicator => Indicator::sim_start(ctx, entity),
        ComponentKind::Diode => Diode::sim_start(ctx, entity),
        ComponentKind::DpdtRelay => DpdtRelay::sim_start(ctx, entity),
        ComponentKind::Link => Link::sim_start(ctx, entity),
        ComponentKind::Bus => Bus::sim_start(ctx, entity),
        ComponentKind::Memory => Memory::sim_start(ctx, entity),
    }
}

pub fn simulate_logic(ctx: &mut SimContext, entity: Entity) {
    let Some(kind) = kind_of(&ctx.world.lock(), entity) else {
        return;
    };
    match kind {
        ComponentKind::Vcc => Vcc::simulate_logic(ctx, entity),
        ComponentKind::Switch => Switch::simulate_logic(ctx, entity),
        ComponentKind::Clock => Clock::simulate_logic(ctx, entity),
        ComponentKind::Indicator => Indicator::simulate_logic(ctx, entity),
        ComponentKind::Diode => Diode::simulate_logic(ctx, entity),
        ComponentKind::DpdtRelay => DpdtRelay::simulate_logic(ctx, entity),
        ComponentKind::Link => Link::simulate_logic(ctx, entity),
        ComponentKind::Bus => Bus::simulate_logic(ctx, entity),
        ComponentKind::Memory => Memory::simulate_logic(ctx, entity),
    }
}

pub fn sim_stop(ctx: &mut SimContext, entity: Entity) {
    let Some(kind) = kind_of(&ctx.world.lock(), entity) else {
        return;
    };
    match kind {
        ComponentKind::Vcc => Vcc::sim_stop(ctx, entity),
        ComponentKind::Switch => Switch::sim_stop(ctx, entity),
        ComponentKind::Clock => Clock::sim_stop(ctx, entity),
        ComponentKind::Indicator => Indicator::sim_stop(ctx, entity),
        ComponentKind::Diode => Diode::sim_stop(ctx, entity),
        ComponentKind::DpdtRelay => DpdtRelay::sim_stop(ctx, entity),
        ComponentKind::Link => Link::sim_stop(ctx, entity),
        ComponentKind::Bus => Bus::sim_stop(ctx, entity),
        ComponentKind::Memory => Memory::sim_stop(ctx, entity),
    }
}

pub fn interact(ctx: &mut SimContext, entity: Entity, action: &InteractionAction) -> bool {
    let Some(kind) = kind_of(&ctx.world.lock(), entity) else {
        return false;
    };
    match kind {
        ComponentKind::Vcc => Vcc::interact(ctx, entity, action),
        ComponentKind::Switch => Switch::interact(ctx, entity, action),
        ComponentKind::Clock => Clock::interact(ctx, entity, action),
        ComponentKind::Indicator => Indicator::interact(ctx, entity, action),
        ComponentKind::Diode => Diode::interact(ctx, entity, action),
        ComponentKind::DpdtRelay => DpdtRelay::interact(ctx, entity, action),
        ComponentKind::Link => Link::interact(ctx, entity, action),
        ComponentKind::Bus => Bus::interact(ctx, entity, action),
        ComponentKind::Memory => Memory::interact(ctx, entity, action),
    }
}

/// Per-pin link-name mappings beyond a component's own `link_name`
/// (only [`Bus`] and [`Memory`] report anything). Runs during link
/// resolution, before any run's VNETs/bridges/dirty-set exist, so it
/// reads straight from the `World`.
pub fn get_link_mappings(world: &World, entity: Entity) -> Vec<(String, Id)> {
    let Some(kind) = kind_of(world, entity) else {
        return Vec::new();
    };
    match kind {
        ComponentKind::Bus => Bus::get_link_mappings(world, entity),
        ComponentKind::Memory => Memory::get_link_mappings(world, entity),
        _ => Vec::new(),
    }
}
