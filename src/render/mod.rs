//! Fractal rendering: zoom state, compute thread and frame hand-off

mod controller;
mod frame;
mod generator;
mod view;
mod worker;
mod zoom;

pub use controller::{ComputeConfig, Controller, LifecycleError};
pub use frame::{BYTES_PER_PIXEL, FrameError, FrameExchange, PixelBuffer};
pub use generator::{GenerateError, ImageGenerator, MandelbrotGenerator};
pub use view::{ComputeStats, PanRequest, ThreadState, ViewState};
pub use zoom::{AtomicZoomCommand, ZoomCommand, ZoomParams, ZoomStep, step};
