//! Page: one schematic sheet. Owns an ordered list of components, wires
//! and junctions; purely bookkeeping, no electrical behavior of its own.

use bevy_ecs::prelude::Entity;

use crate::ids::Id;

#[derive(Debug, Clone)]
pub struct Page {
    pub id: Id,
    pub name: String,
    pub canvas_x: f32,
    pub canvas_y: f32,
    pub canvas_zoom: f32,
    pub components: Vec<Entity>,
    pub wires: Vec<Entity>,
    pub junctions: Vec<Entity>,
}

impl Page {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            canvas_x: 0.0,
            canvas_y: 0.0,
            canvas_zoom: 1.0,
            components: Vec::new(),
            wires: Vec::new(),
            junctions: Vec::new(),
        }
    }

    pub fn remove_component(&mut self, entity: Entity) {
        self.components.retain(|&e| e != entity);
    }

    pub fn remove_wire(&mut self, entity: Entity) {
        self.wires.retain(|&e| e != entity);
    }

    pub fn remove_junction(&mut self, entity: Entity) {
        self.junctions.retain(|&e| e != entity);
    }
}
