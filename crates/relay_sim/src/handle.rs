//! [`SimulationHandle`]: owns the one dedicated worker thread section 5
//! requires. Construction builds the document's VNETs, constructs the
//! [`SimulationEngine`], and moves it onto a fresh thread; the engine's
//! restart callback is wired straight back into this same thread's
//! command queue as a `Command::Resume`, so a relay or clock timer
//! firing after the engine has gone idle drives the worker to call
//! `run()` again with no host-side polling required.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bevy_log::{info, warn};
use crossbeam_channel::{bounded, Receiver, Sender};

use relay_core::component::InteractionAction;
use relay_core::engine::{EngineConfig, InitializeDiagnostics, SimulationEngine, SimulationState, Statistics};
use relay_core::error::InteractionError;
use relay_core::ids::Id;
use relay_core::model::Document;

use crate::command::Command;

/// A handle to a simulation running on its own worker thread. Dropping it
/// without calling [`Self::shutdown`] first still shuts the worker down
/// cleanly (it never leaks a thread), but skips the caller's chance to
/// read the final `Statistics`.
pub struct SimulationHandle {
    thread: Option<JoinHandle<()>>,
    tx: Sender<Command>,
    stop_flag: Arc<AtomicBool>,
}

impl SimulationHandle {
    /// Build the document's VNETs, construct the engine, and spawn the
    /// worker thread. The engine is not yet initialized -- call
    /// [`Self::initialize`] before the first [`Self::run`].
    pub fn spawn(mut document: Document, config: EngineConfig) -> Self {
        let (vnets, link_resolution, topology_warnings) = document.build_vnets();
        let bridges = document.fresh_bridges();
        let diagnostics = InitializeDiagnostics { topology_warnings, link_resolution };

        let engine = SimulationEngine::new(document, vnets, bridges, diagnostics, config);
        let stop_flag = engine.stop_flag();

        let (tx, rx) = crossbeam_channel::unbounded();
        let restart_tx = tx.clone();
        engine.set_restart_callback(move || {
            // The worker thread may already be gone (shut down) by the
            // time a pending timer fires; a failed send here just means
            // there is nothing left to resume.
            let _ = restart_tx.send(Command::Resume);
        });

        let thread = std::thread::Builder::new()
            .name("relay-sim-worker".to_string())
            .spawn(move || worker_loop(engine, rx))
            .expect("failed to spawn relay_sim worker thread");

        Self { thread: Some(thread), tx, stop_flag }
    }

    /// `sim_start` on every component and prime the dirty set (section
    /// 4.8's `initialize()`). Always succeeds once a document is loaded.
    pub fn initialize(&self) -> bool {
        let (reply, rx) = bounded(1);
        if self.tx.send(Command::Initialize { reply }).is_err() {
            return false;
        }
        rx.recv().unwrap_or(false)
    }

    /// Run to a fixed point, or until oscillation/timeout/stop. Blocks
    /// the calling thread for as long as the engine's loop runs --
    /// callers driving a UI should call this from a background thread of
    /// their own, per section 5.
    pub fn run(&self) -> Statistics {
        let (reply, rx) = bounded(1);
        if self.tx.send(Command::Run { reply }).is_err() {
            return Statistics::default();
        }
        rx.recv().unwrap_or_default()
    }

    /// Cooperative stop (section 5): flips the same flag `run()`'s
    /// loop polls between iterations. Set directly on the shared flag
    /// rather than queued, since the worker thread is the one blocked
    /// inside `run()` and won't drain the command queue again until that
    /// call returns.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn get_state(&self) -> SimulationState {
        let (reply, rx) = bounded(1);
        if self.tx.send(Command::GetState { reply }).is_err() {
            return SimulationState::Stopped;
        }
        rx.recv().unwrap_or_default()
    }

    pub fn get_statistics(&self) -> Statistics {
        let (reply, rx) = bounded(1);
        if self.tx.send(Command::GetStatistics { reply }).is_err() {
            return Statistics::default();
        }
        rx.recv().unwrap_or_default()
    }

    /// A component's current runtime state, read straight off the
    /// worker's engine (section 6.4's rendering/introspection use case, now
    /// routed through the command queue instead of a direct lock since
    /// the caller is on a different thread than the one running the
    /// engine).
    pub fn component_state(&self, component_id: Id) -> Option<relay_core::component::ComponentState> {
        let (reply, rx) = bounded(1);
        if self.tx.send(Command::GetComponentState { component_id, reply }).is_err() {
            return None;
        }
        rx.recv().ok().flatten()
    }

    fn interact(&self, component_id: Id, action: InteractionAction) -> Result<bool, InteractionError> {
        let (reply, rx) = bounded(1);
        if self.tx.send(Command::Interact { component_id, action, reply }).is_err() {
            return Err(InteractionError::UnknownComponent);
        }
        rx.recv().unwrap_or(Err(InteractionError::UnknownComponent))
    }

    pub fn toggle(&self, component_id: Id) -> Result<bool, InteractionError> {
        self.interact(component_id, InteractionAction::Toggle)
    }

    pub fn press(&self, component_id: Id) -> Result<bool, InteractionError> {
        self.interact(component_id, InteractionAction::Press)
    }

    pub fn release(&self, component_id: Id) -> Result<bool, InteractionError> {
        self.interact(component_id, InteractionAction::Release)
    }

    pub fn thumbwheel_interact(&self, component_id: Id, delta: i64) -> Result<bool, InteractionError> {
        self.interact(component_id, InteractionAction::ThumbwheelInteract { delta })
    }

    pub fn memory_write(&self, component_id: Id, address: u64, value: u64) -> Result<bool, InteractionError> {
        self.interact(component_id, InteractionAction::MemoryWrite { address, value })
    }

    /// Stop the loop, run `sim_stop` on every component, and join the
    /// worker thread. Safe to call more than once; the second call is a
    /// no-op that returns `false`.
    pub fn shutdown(&mut self) -> bool {
        self.stop_flag.store(true, Ordering::SeqCst);
        let Some(thread) = self.thread.take() else {
            return false;
        };
        let (reply, rx) = bounded(1);
        let ok = if self.tx.send(Command::Shutdown { reply }).is_ok() {
            rx.recv().unwrap_or(false)
        } else {
            false
        };
        let _ = thread.join();
        ok
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}

fn worker_loop(mut engine: SimulationEngine, rx: Receiver<Command>) {
    for command in rx.iter() {
        match command {
            Command::Initialize { reply } => {
                engine.initialize();
                let _ = reply.send(true);
            }
            Command::Run { reply } => {
                let stats = engine.run();
                log_run_result(&engine, &stats);
                let _ = reply.send(stats);
            }
            Command::Resume => {
                let stats = engine.run();
                log_run_result(&engine, &stats);
            }
            Command::Shutdown { reply } => {
                let ok = engine.shutdown();
                let _ = reply.send(ok);
                break;
            }
            Command::Interact { component_id, action, reply } => {
                let result = engine.interact(component_id, action);
                let _ = reply.send(result);
            }
            Command::GetState { reply } => {
                let _ = reply.send(engine.get_state());
            }
            Command::GetStatistics { reply } => {
                let _ = reply.send(engine.get_statistics());
            }
            Command::GetComponentState { component_id, reply } => {
                let _ = reply.send(engine.component_state(component_id));
            }
        }
    }
}

/// Section 6.6's stability/oscillation/timeout signals, logged at the
/// facade level in addition to whatever `relay_core::engine` already
/// logged internally -- this is the layer a headless embedder actually
/// filters on (`RUST_LOG=relay_sim=info`).
fn log_run_result(engine: &SimulationEngine, stats: &Statistics) {
    match engine.get_state() {
        SimulationState::Stable => {
            info!(iterations = stats.iterations, "relay_sim: run resolved to a stable state");
        }
        SimulationState::Oscillating => {
            warn!(iterations = stats.iterations, "relay_sim: run gave up -- oscillating past max_iterations");
        }
        SimulationState::Timeout => {
            warn!(wall_time_ms = stats.wall_time.as_millis() as u64, "relay_sim: run gave up -- wall-clock timeout");
        }
        _ => {}
    }
}
