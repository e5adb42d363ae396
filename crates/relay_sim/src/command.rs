//! The worker thread's command queue. The single dedicated thread
//! section 5 requires drains these strictly in arrival order from
//! a plain blocking `recv()`; an `Interact`/`GetState`/`GetStatistics`
//! enqueued while `run()` is mid-loop only reaches the front of the
//! queue once that `run()` call returns, which is what makes "invoke
//! between iterations or route through a command queue drained at
//! iteration boundaries" (section 5) true by construction. `Resume` is
//! never sent by a `SimulationHandle` caller -- it's the message a
//! relay/clock switching timer posts through the restart callback to
//! nudge an idle engine back into `run()`.

use crossbeam_channel::Sender;

use relay_core::component::{ComponentState as ComponentRuntimeState, InteractionAction};
use relay_core::engine::{SimulationState, Statistics};
use relay_core::error::InteractionError;
use relay_core::ids::Id;

pub enum Command {
    Initialize { reply: Sender<bool> },
    Run { reply: Sender<Statistics> },
    Resume,
    Shutdown { reply: Sender<bool> },
    Interact {
        component_id: Id,
        action: InteractionAction,
        reply: Sender<Result<bool, InteractionError>>,
    },
    GetState { reply: Sender<SimulationState> },
    GetStatistics { reply: Sender<Statistics> },
    GetComponentState {
        component_id: Id,
        reply: Sender<Option<ComponentRuntimeState>>,
    },
}
