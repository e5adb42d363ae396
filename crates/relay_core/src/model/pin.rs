//! Pin: a named connection point on a component, owning one or more
//! [`super::tab::TabMarker`] tabs. A pin's state is set directly by its
//! owning component's behavior; every tab under it shares that state.

use bevy_ecs::prelude::{Component as EcsComponent, Entity};
use smallvec::SmallVec;

use crate::signal::Signal;

/// The component a pin belongs to.
#[derive(EcsComponent, Debug, Clone, Copy)]
pub struct OwnerComponent(pub Entity);

/// The pin's human-readable name ("A", "B", "Coil", "Enable", ...), used
/// for lookup via [`crate::component::Pins`] and for display.
#[derive(EcsComponent, Debug, Clone)]
pub struct PinName(pub String);

/// Tabs owned by this pin, in creation order. Most pins own exactly one
/// tab; the Indicator component owns pins with several (one per visual
/// lamp leg) so that wires can land on any side of it.
#[derive(EcsComponent, Debug, Default, Clone)]
pub struct PinTabs(pub SmallVec<[Entity; 4]>);

/// The signal this pin is currently driving. Written only by the owning
/// component's `simulate_logic`; read by the VNET evaluator through the
/// pin's tabs, never the other way around.
#[derive(EcsComponent, Debug, Default, Clone, Copy)]
pub struct PinSignal(pub Signal);
