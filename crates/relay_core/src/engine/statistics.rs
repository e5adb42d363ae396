//! Statistics recorded by one `run()` of the simulation engine.

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    pub iterations: u64,
    pub components_updated: u64,
    pub time_to_stability: Option<Duration>,
    pub wall_time: Duration,
    pub max_iterations_reached: bool,
    pub timed_out: bool,
    pub stable: bool,
    /// Background switching-delay/clock-period timers that fired during
    /// this run, drained from [`super::timer::TimerFired`] notifications
    /// purely for observability; correctness never depends on this count.
    pub timer_ticks: u64,
}
