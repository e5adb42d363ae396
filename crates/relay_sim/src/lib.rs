//! The threaded, externally-facing engine facade: the one dedicated
//! worker thread section 5 requires, a command queue drained at
//! iteration boundaries for the external-interaction API (section 6.4),
//! and the statistics/diagnostics logging of section 6.6. `relay_core`'s
//! [`relay_core::engine::SimulationEngine`] itself never spawns a
//! thread or does I/O; this crate is the one place that does.

mod command;
mod handle;

pub use handle::SimulationHandle;

pub use relay_core::component::{ComponentState, InteractionAction};
pub use relay_core::engine::{EngineConfig, SimulationState, Statistics};
pub use relay_core::error::InteractionError;
pub use relay_core::ids::Id;
