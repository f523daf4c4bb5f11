//! Compute loop - runs on its own thread

use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::time::Instant;

use log::{debug, info, warn};

use super::controller::{ComputeConfig, SharedState};
use super::frame::FrameExchange;
use super::generator::ImageGenerator;
use super::view::ThreadState;
use super::zoom;

/// What a single tick did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Published,
    GenerateFailed,
    Skipped,
}

pub(crate) struct ComputeLoop {
    config: ComputeConfig,
    shared: Arc<SharedState>,
    exchange: Arc<FrameExchange>,
    generator: Arc<dyn ImageGenerator>,
    last_scale: f64,
}

impl ComputeLoop {
    pub(crate) fn new(
        config: ComputeConfig,
        shared: Arc<SharedState>,
        exchange: Arc<FrameExchange>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let last_scale = config.initial_decay;
        Self {
            config,
            shared,
            exchange,
            generator,
            last_scale,
        }
    }

    /// Loop until the thread state becomes `Terminated`
    pub(crate) fn run(mut self) {
        info!(
            "Compute loop started ({}x{}, tick {:?})",
            self.config.width, self.config.height, self.config.tick_interval
        );
        loop {
            std::thread::sleep(self.config.tick_interval);
            match self.shared.thread_state.load() {
                ThreadState::Terminated => break,
                ThreadState::Paused => continue,
                ThreadState::Running => {
                    self.tick();
                }
            }
        }
        info!("Compute loop terminated");
    }

    /// Zoom step, pending pan, generate, publish
    pub(crate) fn tick(&mut self) -> TickOutcome {
        if self.shared.thread_state.load() == ThreadState::Paused {
            return TickOutcome::Skipped;
        }

        let view = {
            let mut view = self
                .shared
                .view
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if self.shared.reset_requested.swap(false, Ordering::AcqRel) {
                debug!("Resetting view to initial parameters");
                *view = self.config.initial_view;
                self.last_scale = self.config.initial_decay;
            }

            let command = self.shared.command.load();
            let next = zoom::step(view.scale_a, self.last_scale, command, &self.config.zoom);
            view.scale_a = next.scale_a;
            self.last_scale = next.last_scale;

            let pan = self
                .shared
                .pan
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some((dx, dy)) = pan {
                view.apply_pan(dx, dy);
                debug!(
                    "Applied pan ({dx:.4}, {dy:.4}) -> center ({}, {})",
                    view.offset_x, view.offset_y
                );
            }

            *view
        };

        let started = Instant::now();
        let result = self
            .generator
            .generate(&view, self.config.width, self.config.height);
        let elapsed = started.elapsed();

        let mut stats = self
            .shared
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        stats.ticks += 1;
        match result {
            Ok(frame) => {
                stats.frames_published += 1;
                stats.last_generate = elapsed;
                drop(stats);
                self.exchange.publish(frame);
                TickOutcome::Published
            }
            Err(e) => {
                stats.generate_failures += 1;
                drop(stats);
                warn!("Frame generation failed, keeping previous frame: {e}");
                TickOutcome::GenerateFailed
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn last_scale(&self) -> f64 {
        self.last_scale
    }
}
