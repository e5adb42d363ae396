//! The static schematic model: pages, components, pins, tabs, wires and
//! junctions, all stored as entities in one [`bevy_ecs::world::World`]
//! owned by [`document::Document`].

pub mod document;
pub mod junction;
pub mod page;
pub mod pin;
pub mod tab;
pub mod waypoint;
pub mod wire;

pub use document::Document;
pub use junction::Junction;
pub use page::Page;
pub use pin::{OwnerComponent, PinName, PinSignal, PinTabs};
pub use tab::{OwnerPin, TabMarker, TabPosition};
pub use waypoint::Waypoint;
pub use wire::Wire;
