//! Junction: a passive branching point on a wire tree. A junction never
//! drives a signal; it exists purely so more than two wires can meet at
//! one point. Electrically it behaves exactly like a tab with no owning
//! pin, so the VNET builder treats junction ids and tab ids uniformly as
//! "connection-point" graph nodes.

use bevy_ecs::prelude::Component as EcsComponent;

#[derive(EcsComponent, Debug, Clone, Copy, PartialEq)]
pub struct Junction {
    pub x: f32,
    pub y: f32,
}
