//! Simulation kernel for a relay-logic circuit simulator: the static
//! schematic model, the VNET builder and evaluator, the component
//! behaviors, and the fixed-point simulation engine. Persistence
//! (document schema, load/save) lives in `relay_serde`; the threaded,
//! externally-facing engine facade lives in `relay_sim`.

pub mod component;
pub mod context;
pub mod engine;
pub mod error;
pub mod ids;
pub mod model;
pub mod signal;
pub mod vnet;

pub use error::{InteractionError, LoadError, TopologyWarning};
pub use ids::Id;
pub use signal::Signal;
