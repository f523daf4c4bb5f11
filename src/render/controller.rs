//! Compute thread lifecycle and the state it shares with the display

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use super::frame::FrameExchange;
use super::generator::ImageGenerator;
use super::view::{AtomicThreadState, ComputeStats, PanRequest, ThreadState, ViewState};
use super::worker::ComputeLoop;
use super::zoom::{AtomicZoomCommand, ZoomCommand, ZoomParams};

/// Misuse of the compute thread lifecycle
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("compute thread is already owned by this controller")]
    AlreadyRunning,

    #[error("compute thread is not running (state: {state})")]
    NotRunning { state: ThreadState },

    #[error("cannot {action} compute thread while {state}")]
    InvalidTransition {
        action: &'static str,
        state: ThreadState,
    },

    #[error("failed to spawn compute thread: {detail}")]
    Spawn { detail: String },

    #[error("compute thread panicked")]
    ComputeThreadPanicked,
}

/// Fixed parameters of the compute loop
#[derive(Clone, Debug, PartialEq)]
pub struct ComputeConfig {
    pub width: usize,
    pub height: usize,
    /// Sleep at the start of every tick
    pub tick_interval: Duration,
    pub zoom: ZoomParams,
    /// Initial decay accumulator
    pub initial_decay: f64,
    pub initial_view: ViewState,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 96,
            tick_interval: Duration::from_millis(5),
            zoom: ZoomParams::default(),
            initial_decay: 0.0000055,
            initial_view: ViewState::default(),
        }
    }
}

/// State shared between the controller, the compute loop and the display.
///
/// Each field has its own guard so that a pending pan never blocks frame
/// delivery and the overlay snapshot never blocks either.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) view: Mutex<ViewState>,
    pub(crate) pan: Mutex<PanRequest>,
    pub(crate) command: AtomicZoomCommand,
    pub(crate) thread_state: AtomicThreadState,
    pub(crate) reset_requested: AtomicBool,
    pub(crate) stats: Mutex<ComputeStats>,
}

impl SharedState {
    fn new(view: ViewState) -> Self {
        Self {
            view: Mutex::new(view),
            pan: Mutex::new(PanRequest::default()),
            command: AtomicZoomCommand::default(),
            thread_state: AtomicThreadState::default(),
            reset_requested: AtomicBool::new(false),
            stats: Mutex::new(ComputeStats::default()),
        }
    }
}

/// Owns the view, the input inbox and the compute thread
pub struct Controller {
    config: ComputeConfig,
    shared: Arc<SharedState>,
    exchange: Arc<FrameExchange>,
    generator: Arc<dyn ImageGenerator>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .field("thread_state", &self.thread_state())
            .field("owns_thread", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl Controller {
    #[must_use]
    pub fn new(config: ComputeConfig, generator: Arc<dyn ImageGenerator>) -> Self {
        let shared = Arc::new(SharedState::new(config.initial_view));
        Self {
            config,
            shared,
            exchange: Arc::new(FrameExchange::new()),
            generator,
            handle: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    /// Exchange the compute loop publishes into
    #[must_use]
    pub fn exchange(&self) -> &Arc<FrameExchange> {
        &self.exchange
    }

    /// Spawn the compute loop. Fails if a thread is already owned, including
    /// one that was stopped but not yet joined.
    pub fn create_compute_thread(&mut self) -> Result<(), LifecycleError> {
        if self.handle.is_some() {
            warn!("create_compute_thread called while a compute thread is owned");
            return Err(LifecycleError::AlreadyRunning);
        }

        self.shared.thread_state.store(ThreadState::Running);
        let worker = ComputeLoop::new(
            self.config.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&self.exchange),
            Arc::clone(&self.generator),
        );
        let spawned = std::thread::Builder::new()
            .name("fractal-compute".to_string())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                info!("Created compute thread");
                Ok(())
            }
            Err(e) => {
                self.shared.thread_state.store(ThreadState::Terminated);
                Err(LifecycleError::Spawn {
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Ask the compute loop to exit. The caller joins with
    /// [`join_compute_thread`](Self::join_compute_thread).
    pub fn stop_compute_thread(&self) -> Result<(), LifecycleError> {
        let state = &self.shared.thread_state;
        let stopped = state
            .transition(ThreadState::Running, ThreadState::Terminated)
            .or_else(|_| state.transition(ThreadState::Paused, ThreadState::Terminated));
        match stopped {
            Ok(()) => {
                debug!("Compute thread signalled to terminate");
                Ok(())
            }
            Err(found) => {
                warn!("stop_compute_thread called while {found}");
                Err(LifecycleError::NotRunning { state: found })
            }
        }
    }

    /// Wait for an owned compute thread to exit. No-op when none is owned.
    pub fn join_compute_thread(&mut self) -> Result<(), LifecycleError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if self.thread_state() != ThreadState::Terminated {
            // Joining a live loop would never return.
            self.handle = Some(handle);
            return Err(LifecycleError::InvalidTransition {
                action: "join",
                state: self.thread_state(),
            });
        }
        handle
            .join()
            .map_err(|_| LifecycleError::ComputeThreadPanicked)?;
        info!("Joined compute thread");
        Ok(())
    }

    pub fn pause_compute_thread(&self) -> Result<(), LifecycleError> {
        self.shared
            .thread_state
            .transition(ThreadState::Running, ThreadState::Paused)
            .map_err(|state| LifecycleError::InvalidTransition {
                action: "pause",
                state,
            })
    }

    pub fn resume_compute_thread(&self) -> Result<(), LifecycleError> {
        self.shared
            .thread_state
            .transition(ThreadState::Paused, ThreadState::Running)
            .map_err(|state| LifecycleError::InvalidTransition {
                action: "resume",
                state,
            })
    }

    /// Join a compute thread that died without being stopped.
    ///
    /// The loop only returns once terminated, so a finished thread in any
    /// other state panicked. Reports the failure once and leaves the state
    /// `Terminated`; `None` while the thread is alive or already reaped.
    pub fn reap_exited_thread(&mut self) -> Option<LifecycleError> {
        let finished = self.handle.as_ref().is_some_and(JoinHandle::is_finished);
        if !finished || self.thread_state() == ThreadState::Terminated {
            return None;
        }
        self.shared.thread_state.store(ThreadState::Terminated);
        match self.join_compute_thread() {
            Ok(()) => {
                warn!("Compute thread exited without a stop request");
                Some(LifecycleError::ComputeThreadPanicked)
            }
            Err(e) => Some(e),
        }
    }

    /// Stop, join and release the exchange. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        if matches!(
            self.thread_state(),
            ThreadState::Running | ThreadState::Paused
        ) {
            // A concurrent stop between the check and here is fine.
            let _ = self.stop_compute_thread();
        }
        let joined = self.join_compute_thread();
        self.exchange.clear();
        joined
    }

    #[must_use]
    pub fn thread_state(&self) -> ThreadState {
        self.shared.thread_state.load()
    }

    pub fn set_zoom_command(&self, command: ZoomCommand) {
        self.shared.command.store(command);
    }

    #[must_use]
    pub fn zoom_command(&self) -> ZoomCommand {
        self.shared.command.load()
    }

    /// Queue a pan; an unconsumed earlier request is overwritten
    pub fn set_pan_request(&self, dx: f64, dy: f64) {
        let mut pan = self
            .shared
            .pan
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *pan = PanRequest {
            dx: dx.clamp(-1.0, 1.0),
            dy: dy.clamp(-1.0, 1.0),
            pending: true,
        };
    }

    #[must_use]
    pub fn pending_pan(&self) -> Option<(f64, f64)> {
        let pan = self
            .shared
            .pan
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pan.pending.then_some((pan.dx, pan.dy))
    }

    /// Restore the initial view on the compute loop's next running tick
    pub fn reset_view(&self) {
        self.shared.reset_requested.store(true, Ordering::Release);
    }

    /// Consistent copy of all four view parameters
    #[must_use]
    pub fn view_snapshot(&self) -> ViewState {
        *self
            .shared
            .view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn stats_snapshot(&self) -> ComputeStats {
        *self
            .shared
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Compute thread shutdown failed: {e}");
        }
    }
}
