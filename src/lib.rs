// Export modules for use in tests
pub mod display;
pub mod event_source;
pub mod export;
pub mod main_app;
pub mod palette;
pub mod panic_handler;
pub mod render;
pub mod settings;
pub mod widget;

pub mod test_utils;

// Re-export main app components
pub use display::{DisplaySink, Overlay, TerminalSink};
pub use main_app::{App, AppAction, run_app_with_event_source};
pub use render::{
    ComputeConfig, Controller, FrameExchange, ImageGenerator, LifecycleError,
    MandelbrotGenerator, PixelBuffer, ViewState, ZoomCommand,
};
pub use settings::Settings;
