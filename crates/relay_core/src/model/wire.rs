//! Wire: a two-endpoint connection between any pair of connection points
//! (tab or junction ids). Wires are the edges of the connectivity graph
//! the VNET builder floods over; their waypoints are routing-only.

use bevy_ecs::prelude::Component as EcsComponent;

use crate::ids::Id;
use crate::model::waypoint::Waypoint;

#[derive(EcsComponent, Debug, Clone, Default)]
pub struct Wire {
    /// Endpoint ids, each either a tab id or a junction id. A wire with
    /// either endpoint unresolved is skipped by the VNET builder and
    /// reported as a topology warning rather than treated as an error.
    pub start: Option<Id>,
    pub end: Option<Id>,
    pub waypoints: Vec<Waypoint>,
}

impl Wire {
    pub fn is_resolved(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn is_degenerate(&self) -> bool {
        matches!((self.start, self.end), (Some(a), Some(b)) if a == b)
    }
}
