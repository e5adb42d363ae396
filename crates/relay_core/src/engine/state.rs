//! The simulation engine's coarse lifecycle state.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationState {
    #[default]
    Stopped,
    Initializing,
    Running,
    Stable,
    Oscillating,
    Timeout,
}

impl SimulationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationState::Stable | SimulationState::Oscillating | SimulationState::Timeout)
    }
}
