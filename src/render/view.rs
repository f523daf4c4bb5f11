//! View parameters and the small pieces of state shared with the compute thread

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Offset and scale of the next frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ViewState {
    /// Real part of the frame center
    pub offset_x: f64,
    /// Imaginary part of the frame center
    pub offset_y: f64,
    /// Zoom scale; always strictly positive
    pub scale_a: f64,
    /// Secondary divisor, `scale_a / (width / scale_b)` is the per-pixel step
    pub scale_b: f64,
}

impl ViewState {
    /// Distance in the complex plane between neighbouring pixels
    #[must_use]
    pub fn pixel_step(&self, width: usize) -> f64 {
        self.scale_a / (width.max(1) as f64 / self.scale_b)
    }

    /// Shift the center by a normalized pan, scaled by the current zoom
    pub fn apply_pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx * self.scale_a;
        self.offset_y += dy * self.scale_a;
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            offset_x: -0.5,
            offset_y: 0.0,
            scale_a: 1.0,
            scale_b: 4.0,
        }
    }
}

/// A pointer press waiting to be applied to the view
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PanRequest {
    pub dx: f64,
    pub dy: f64,
    pub pending: bool,
}

impl PanRequest {
    /// Map a pixel position to [-1, 1] on both axes.
    ///
    /// Returns `None` when the display has no extent.
    #[must_use]
    pub fn normalize(x: f64, y: f64, width: f64, height: f64) -> Option<(f64, f64)> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let dx = (x * (2.0 / width) - 1.0).clamp(-1.0, 1.0);
        let dy = (y * (2.0 / height) - 1.0).clamp(-1.0, 1.0);
        Some((dx, dy))
    }

    /// Take the request if pending, leaving it cleared
    pub fn take(&mut self) -> Option<(f64, f64)> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some((self.dx, self.dy))
    }
}

/// Lifecycle of the compute thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadState {
    #[default]
    Terminated,
    Running,
    Paused,
}

impl ThreadState {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadState::Terminated => "terminated",
            ThreadState::Running => "running",
            ThreadState::Paused => "paused",
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            ThreadState::Terminated => 0,
            ThreadState::Running => 1,
            ThreadState::Paused => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => ThreadState::Running,
            2 => ThreadState::Paused,
            _ => ThreadState::Terminated,
        }
    }
}

impl std::fmt::Display for ThreadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomically updated [`ThreadState`], polled by the compute loop every tick
#[derive(Debug, Default)]
pub struct AtomicThreadState(AtomicU8);

impl AtomicThreadState {
    pub fn load(&self) -> ThreadState {
        ThreadState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ThreadState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Move from `from` to `to`; on failure returns the state actually found
    pub fn transition(&self, from: ThreadState, to: ThreadState) -> Result<(), ThreadState> {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ThreadState::from_u8)
    }
}

/// Counters the compute loop keeps for the overlay
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComputeStats {
    pub frames_published: u64,
    pub generate_failures: u64,
    pub last_generate: Duration,
    pub ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_edges_and_center() {
        assert_eq!(PanRequest::normalize(0.0, 0.0, 200.0, 100.0), Some((-1.0, -1.0)));
        assert_eq!(PanRequest::normalize(100.0, 50.0, 200.0, 100.0), Some((0.0, 0.0)));
        assert_eq!(PanRequest::normalize(200.0, 100.0, 200.0, 100.0), Some((1.0, 1.0)));
        assert_eq!(PanRequest::normalize(500.0, -3.0, 200.0, 100.0), Some((1.0, -1.0)));
        assert_eq!(PanRequest::normalize(1.0, 1.0, 0.0, 100.0), None);
    }

    #[test]
    fn pan_request_is_taken_once() {
        let mut pan = PanRequest {
            dx: 0.5,
            dy: -0.25,
            pending: true,
        };
        assert_eq!(pan.take(), Some((0.5, -0.25)));
        assert_eq!(pan.take(), None);
    }

    #[test]
    fn pan_distance_scales_with_zoom() {
        let mut view = ViewState {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_a: 0.5,
            scale_b: 4.0,
        };
        view.apply_pan(1.0, -0.5);
        assert_eq!(view.offset_x, 0.5);
        assert_eq!(view.offset_y, -0.25);
    }

    #[test]
    fn pixel_step_uses_both_scales() {
        let view = ViewState {
            scale_a: 1.0,
            scale_b: 4.0,
            ..ViewState::default()
        };
        assert!((view.pixel_step(200) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn thread_state_transition_checks_source() {
        let state = AtomicThreadState::default();
        assert_eq!(state.load(), ThreadState::Terminated);
        assert_eq!(
            state.transition(ThreadState::Running, ThreadState::Paused),
            Err(ThreadState::Terminated)
        );
        state.store(ThreadState::Running);
        assert_eq!(
            state.transition(ThreadState::Running, ThreadState::Paused),
            Ok(())
        );
        assert_eq!(state.load(), ThreadState::Paused);
    }
}
