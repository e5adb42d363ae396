//! Waypoints: purely cosmetic bend points along a wire's route. They
//! carry no electrical meaning and the solver never looks at them; they
//! exist so the document format can round-trip a schematic's routing.

use serde::{Deserialize, Serialize};

use crate::ids::Id;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: Option<Id>,
    pub x: f32,
    pub y: f32,
}
