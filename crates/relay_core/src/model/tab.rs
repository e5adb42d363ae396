//! Tab: a physical connection point on a component at a fixed offset
//! relative to its center. A Tab belongs to exactly one Pin; its
//! electrical state is always read through that Pin.

use bevy_ecs::prelude::{Component as EcsComponent, Entity};

/// Marks an entity as a tab. Queried alongside [`OwnerPin`] and
/// [`crate::ids::EntityId`] to enumerate every tab in the world.
#[derive(EcsComponent, Debug, Default, Clone, Copy)]
pub struct TabMarker;

/// Offset of a tab relative to its owning component's center.
#[derive(EcsComponent, Debug, Clone, Copy, PartialEq)]
pub struct TabPosition {
    pub dx: f32,
    pub dy: f32,
}

/// The Pin a tab exclusively belongs to.
#[derive(EcsComponent, Debug, Clone, Copy)]
pub struct OwnerPin(pub Entity);
