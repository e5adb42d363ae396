//! VNETs: the electrical equivalence classes of tabs and junctions, and
//! the machinery that builds, links and propagates them.

pub mod bridge;
pub mod builder;
pub mod dirty;
pub mod link_resolver;
pub mod propagate;

pub use bridge::{Bridge, BridgeManager};
pub use dirty::DirtyFlagManager;
pub use link_resolver::LinkResolutionResult;
pub use propagate::PropagateResult;

use std::collections::{HashMap, HashSet};

use crate::ids::Id;
use crate::signal::Signal;

/// An electrical equivalence class: a set of tab/junction ids that are
/// always at the same potential, either because wires join them directly
/// or because a runtime bridge ties two such classes together.
#[derive(Debug, Clone)]
pub struct Vnet {
    pub id: Id,
    pub home_page: Id,
    pub tabs: HashSet<Id>,
    pub link_names: HashSet<String>,
    pub bridge_ids: HashSet<Id>,
    pub state: Signal,
}

impl Vnet {
    pub fn new(id: Id, home_page: Id, tabs: HashSet<Id>) -> Self {
        Self {
            id,
            home_page,
            tabs,
            link_names: HashSet::new(),
            bridge_ids: HashSet::new(),
            state: Signal::Float,
        }
    }
}

/// All VNETs in a document, plus the reverse index from connection-point
/// id (tab or junction) to the VNET that currently owns it. Built once by
/// [`builder::build_vnets`] and [`link_resolver::resolve_links`] before a
/// run starts; only the engine's main loop mutates `state` afterwards.
#[derive(Debug, Default)]
pub struct VnetTable {
    pub vnets: HashMap<Id, Vnet>,
    pub tab_to_vnet: HashMap<Id, Id>,
}

impl VnetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vnet: Vnet) {
        for &tab in &vnet.tabs {
            self.tab_to_vnet.insert(tab, vnet.id);
        }
        self.vnets.insert(vnet.id, vnet);
    }

    pub fn vnet_for_tab(&self, tab: Id) -> Option<&Vnet> {
        self.tab_to_vnet.get(&tab).and_then(|v| self.vnets.get(v))
    }

    pub fn state_of_tab(&self, tab: Id) -> Signal {
        self.vnet_for_tab(tab).map(|v| v.state).unwrap_or(Signal::Float)
    }
}
