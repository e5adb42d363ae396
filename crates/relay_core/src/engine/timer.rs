//! Background switching-delay and clock-period timers. Each timer owns a
//! generation counter so that a superseded or aborted schedule can be
//! invalidated without an OS-level cancellation handle: a stale thread
//! wakes up, finds its generation no longer current, and exits quietly
//! instead of firing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ids::Id;

#[derive(Clone, Default)]
pub struct TimerHandle {
    generation: Arc<AtomicU64>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate any in-flight schedule, e.g. when a relay's coil
    /// reverses mid-transition and the pending switch must be aborted.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Schedule `action` to run once after `delay`, unless canceled or
    /// superseded by a later `schedule_once` call first.
    pub fn schedule_once(&self, delay: Duration, action: impl FnOnce() + Send + 'static) {
        let expected = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if generation.load(Ordering::SeqCst) == expected {
                action();
            }
        });
    }

    /// Schedule `action` to run every `period` until canceled.
    pub fn schedule_repeating(&self, period: Duration, mut action: impl FnMut() + Send + 'static) {
        let expected = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(period);
            if generation.load(Ordering::SeqCst) != expected {
                break;
            }
            action();
        });
    }
}

/// A lightweight notice that a background timer fired, drained by the
/// engine loop purely for statistics and logging; correctness never
/// depends on this channel being drained promptly, since the timer
/// itself already applied its effects under the dirty-set and
/// bridge-registry locks before sending.
#[derive(Debug, Clone, Copy)]
pub struct TimerFired {
    pub component_id: Id,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    RelayContactsSwitched,
    ClockTick,
}

pub fn channel() -> (crossbeam_channel::Sender<TimerFired>, crossbeam_channel::Receiver<TimerFired>) {
    crossbeam_channel::unbounded()
}
