//! Document: the unit of persistence and simulation input. Owns the
//! ordered list of pages, a free-form metadata map, the identifier
//! registry, and the `World` every page's components, pins, tabs, wires
//! and junctions are spawned into.

use std::collections::HashMap;

use bevy_ecs::prelude::World;

use crate::error::TopologyWarning;
use crate::ids::{Id, IdRegistry};
use crate::model::page::Page;
use crate::vnet::link_resolver::{self, LinkResolutionResult};
use crate::vnet::{builder, BridgeManager, VnetTable};

pub struct Document {
    pub world: World,
    pub pages: Vec<Page>,
    /// Free-form per-document metadata (schema section 6.1). Kept as
    /// JSON values rather than strings so a load/save round trip doesn't
    /// lose a non-string value (law L1).
    pub metadata: HashMap<String, serde_json::Value>,
    pub ids: IdRegistry,
}

impl Document {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            pages: Vec::new(),
            metadata: HashMap::new(),
            ids: IdRegistry::new(),
        }
    }

    pub fn page(&self, id: Id) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_mut(&mut self, id: Id) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    /// Build the full VNET table for this document: per-page flood fill
    /// followed by cross-page link resolution. Returns the table, the
    /// link-resolution diagnostics, and any per-page topology warnings
    /// collected along the way. Never fails; malformed edges are skipped
    /// and reported rather than raised (see [`crate::error::TopologyWarning`]).
    pub fn build_vnets(&mut self) -> (VnetTable, LinkResolutionResult, Vec<TopologyWarning>) {
        let mut table = VnetTable::new();
        let mut warnings = Vec::new();

        for page in &self.pages {
            let (vnets, page_warnings) = builder::build_vnets(&self.world, page, &mut self.ids);
            warnings.extend(page_warnings);
            for vnet in vnets {
                table.insert(vnet);
            }
        }

        let all_components: Vec<_> = self.pages.iter().flat_map(|p| p.components.iter().copied()).collect();
        let link_result = link_resolver::resolve_links(&self.world, &all_components, &mut table);

        (table, link_result, warnings)
    }

    /// A fresh, empty bridge registry: bridges are runtime-only and never
    /// persist, so every (re)build of the VNET table starts with none.
    pub fn fresh_bridges(&self) -> BridgeManager {
        BridgeManager::new()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
