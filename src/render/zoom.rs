//! Zoom state machine
//!
//! Scale evolves by an exponentially decaying step. Each tick the step is
//! `alpha * scale_a * exp(-beta * last_scale)`, where `last_scale` accumulates
//! the steps already taken, so a long zoom in one direction slows down
//! smoothly while reversing direction speeds it up again.

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Discrete zoom intent selected by the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomCommand {
    /// Hold the current scale
    Pause,
    /// Grow the scale (see more of the plane)
    ZoomOut,
    /// Shrink the scale (magnify)
    #[default]
    ZoomIn,
}

impl ZoomCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ZoomCommand::Pause => "pause",
            ZoomCommand::ZoomOut => "zoom out",
            ZoomCommand::ZoomIn => "zoom in",
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            ZoomCommand::Pause => 0,
            ZoomCommand::ZoomOut => 1,
            ZoomCommand::ZoomIn => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => ZoomCommand::Pause,
            1 => ZoomCommand::ZoomOut,
            _ => ZoomCommand::ZoomIn,
        }
    }
}

/// Last-write-wins cell holding the current [`ZoomCommand`]
#[derive(Debug)]
pub struct AtomicZoomCommand(AtomicU8);

impl AtomicZoomCommand {
    #[must_use]
    pub const fn new(command: ZoomCommand) -> Self {
        Self(AtomicU8::new(command.to_u8()))
    }

    pub fn load(&self) -> ZoomCommand {
        ZoomCommand::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, command: ZoomCommand) {
        self.0.store(command.to_u8(), Ordering::Release);
    }
}

impl Default for AtomicZoomCommand {
    fn default() -> Self {
        Self::new(ZoomCommand::default())
    }
}

/// Constants shaping the zoom curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ZoomParams {
    /// Fraction of the current scale taken per tick before decay
    pub alpha: f64,
    /// Decay rate applied to the accumulated scale history
    pub beta: f64,
    /// Zoom-out steps at or above this size are dropped
    pub max_delta: f64,
    /// Smallest scale ever produced
    pub min_scale: f64,
}

impl ZoomParams {
    pub const DEFAULT_MIN_SCALE: f64 = 1e-13;
}

impl Default for ZoomParams {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            beta: 2.5,
            max_delta: 0.5,
            min_scale: Self::DEFAULT_MIN_SCALE,
        }
    }
}

/// Result of one zoom step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomStep {
    pub scale_a: f64,
    pub last_scale: f64,
}

/// Advance the scale by one tick.
///
/// Zoom-out steps that reach `max_delta` are discarded to keep the scale from
/// running away. Zoom-in is not clamped against `max_delta`, but neither
/// direction may produce a scale at or below zero: the result is floored at
/// `min_scale` and the accumulator records the step that was really applied.
#[must_use]
pub fn step(scale_a: f64, last_scale: f64, command: ZoomCommand, params: &ZoomParams) -> ZoomStep {
    let magnitude = params.alpha * scale_a * (-params.beta * last_scale).exp();
    let mut delta = match command {
        ZoomCommand::Pause => 0.0,
        ZoomCommand::ZoomOut => {
            if magnitude >= params.max_delta {
                0.0
            } else {
                magnitude
            }
        }
        ZoomCommand::ZoomIn => -magnitude,
    };
    if !delta.is_finite() {
        delta = 0.0;
    }

    let floor = params.min_scale.max(f64::MIN_POSITIVE);
    let mut next = scale_a + delta;
    if !next.is_finite() {
        next = scale_a;
        delta = 0.0;
    }
    if next < floor {
        next = floor;
        delta = next - scale_a;
    }

    ZoomStep {
        scale_a: next,
        last_scale: last_scale - delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params() -> ZoomParams {
        ZoomParams {
            alpha: 0.4,
            beta: 2.5,
            max_delta: 10.0,
            min_scale: 1e-13,
        }
    }

    #[test]
    fn zoom_in_matches_reference_values() {
        let out = step(1.1, 0.0000055, ZoomCommand::ZoomIn, &params());
        let delta = -0.4 * 1.1 * (-2.5f64 * 0.0000055).exp();
        assert!((delta + 0.44).abs() < 1e-4);
        assert!((out.scale_a - (1.1 + delta)).abs() < 1e-12);
        assert!((out.scale_a - 0.66).abs() < 1e-4);
        assert!((out.last_scale - (0.0000055 - delta)).abs() < 1e-12);
    }

    #[test]
    fn pause_holds_scale_for_many_ticks() {
        let mut scale = 0.75;
        let mut acc = 0.3;
        for _ in 0..100 {
            let out = step(scale, acc, ZoomCommand::Pause, &params());
            assert_eq!(out.scale_a, 0.75);
            assert_eq!(out.last_scale, 0.3);
            scale = out.scale_a;
            acc = out.last_scale;
        }
    }

    #[test]
    fn zoom_out_grows_scale_and_shrinks_accumulator() {
        let out = step(1.0, 0.0, ZoomCommand::ZoomOut, &params());
        assert!((out.scale_a - 1.4).abs() < 1e-12);
        assert!((out.last_scale + 0.4).abs() < 1e-12);
    }

    #[test]
    fn zoom_out_step_at_limit_is_dropped() {
        let p = ZoomParams {
            max_delta: 0.4,
            ..params()
        };
        let out = step(1.0, 0.0, ZoomCommand::ZoomOut, &p);
        assert_eq!(out.scale_a, 1.0);
        assert_eq!(out.last_scale, 0.0);
    }

    #[test]
    fn zoom_in_is_not_limited_by_max_delta() {
        let p = ZoomParams {
            max_delta: 0.01,
            ..params()
        };
        let out = step(1.0, 0.0, ZoomCommand::ZoomIn, &p);
        assert!((out.scale_a - 0.6).abs() < 1e-12);
    }

    #[test]
    fn overshooting_zoom_in_is_floored() {
        let p = ZoomParams {
            alpha: 3.0,
            ..params()
        };
        let out = step(1.0, 0.0, ZoomCommand::ZoomIn, &p);
        assert_eq!(out.scale_a, p.min_scale);
        assert!((out.last_scale - (1.0 - p.min_scale)).abs() < 1e-12);
    }

    #[test]
    fn non_finite_step_is_ignored() {
        let out = step(1.0, -1e308, ZoomCommand::ZoomIn, &params());
        assert_eq!(out.scale_a, 1.0);
        assert_eq!(out.last_scale, -1e308);
    }

    #[test]
    fn atomic_command_is_last_write_wins() {
        let cell = AtomicZoomCommand::default();
        assert_eq!(cell.load(), ZoomCommand::ZoomIn);
        cell.store(ZoomCommand::ZoomOut);
        cell.store(ZoomCommand::Pause);
        assert_eq!(cell.load(), ZoomCommand::Pause);
    }

    fn command() -> impl Strategy<Value = ZoomCommand> {
        prop_oneof![
            Just(ZoomCommand::Pause),
            Just(ZoomCommand::ZoomOut),
            Just(ZoomCommand::ZoomIn),
        ]
    }

    proptest! {
        #[test]
        fn scale_stays_positive(
            commands in prop::collection::vec(command(), 1..400),
            alpha in 0.001f64..3.0,
            beta in 0.0f64..10.0,
            max_delta in 0.001f64..100.0,
            start in 1e-6f64..10.0,
        ) {
            let p = ZoomParams { alpha, beta, max_delta, min_scale: 1e-13 };
            let mut scale = start;
            let mut acc = 0.0000055;
            for cmd in commands {
                let out = step(scale, acc, cmd, &p);
                prop_assert!(out.scale_a > 0.0, "scale went to {}", out.scale_a);
                prop_assert!(out.scale_a.is_finite());
                scale = out.scale_a;
                acc = out.last_scale;
            }
        }

        #[test]
        fn pause_is_identity(scale in 1e-9f64..100.0, acc in -10.0f64..10.0) {
            let out = step(scale, acc, ZoomCommand::Pause, &params());
            prop_assert_eq!(out.scale_a, scale);
            prop_assert_eq!(out.last_scale, acc);
        }
    }
}
