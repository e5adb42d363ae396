//! Link: a purely symbolic cross-page equivalence hint. A Link
//! component's tabs are tagged with its `link_name` by
//! [`crate::vnet::link_resolver`] exactly like any other component's
//! `link_name` -- it needs no component-specific resolver logic at all.
//!
//! Chosen interpretation (an open question in the source material):
//! Link is passive. It never drives a pin, so a Link symbol by itself
//! cannot inject a signal onto its VNET; its only job is to give two
//! separately-drawn nets on different pages the same identity.

use bevy_ecs::prelude::Entity;

use crate::component::Behavior;
use crate::context::SimContext;

pub struct Link;

impl Behavior for Link {
    fn sim_start(_ctx: &mut SimContext, _entity: Entity) {}

    fn simulate_logic(_ctx: &mut SimContext, _entity: Entity) {}

    fn sim_stop(_ctx: &mut SimContext, _entity: Entity) {}
}
