use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use log::{debug, error, info, warn};

use crate::display::{DisplaySink, Overlay};
use crate::event_source::EventSource;
use crate::export::{ExportFormat, ParameterDump, dump_parameters, export_to_dir};
use crate::render::{Controller, LifecycleError, PanRequest, PixelBuffer, ThreadState, ZoomCommand};
use crate::settings::Settings;
use crate::widget::hud_message::{HudMessage, HudMode};
use crate::widget::overlay::{OverlayStats, PointerInfo};

/// Events handled per tick before the frame is drawn
const MAX_EVENTS_PER_TICK: usize = 50;

const BLANK_PIXEL: [u8; 4] = [0, 0, 0, 255];

const COMPUTE_FAILURE_HUD_DURATION: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

pub struct App {
    controller: Controller,
    settings: Settings,
    show_overlay: bool,
    show_crosshair: bool,
    pointer: Option<PointerInfo>,
    hud_message: Option<HudMessage>,
    export_dir: PathBuf,
    export_format: ExportFormat,
}

impl App {
    pub fn new(controller: Controller, settings: Settings) -> Self {
        Self {
            controller,
            show_overlay: settings.display.show_overlay,
            show_crosshair: settings.display.show_crosshair,
            pointer: None,
            hud_message: None,
            export_dir: settings.display.export_dir.clone(),
            export_format: settings.display.export_format,
            settings,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn show_overlay(&self) -> bool {
        self.show_overlay
    }

    pub fn show_crosshair(&self) -> bool {
        self.show_crosshair
    }

    pub fn pointer(&self) -> Option<PointerInfo> {
        self.pointer
    }

    pub fn hud_message(&self) -> Option<&HudMessage> {
        self.hud_message.as_ref()
    }

    fn show_info(&mut self, message: impl Into<String>) {
        self.hud_message = Some(HudMessage::info(message));
    }

    fn show_error(&mut self, message: impl Into<String>) {
        self.hud_message = Some(HudMessage::error(message));
    }

    /// Drop the HUD message once its time is up; true when one was removed
    pub fn update_hud_message(&mut self) -> bool {
        if self.hud_message.as_ref().is_some_and(HudMessage::is_expired) {
            self.hud_message = None;
            return true;
        }
        false
    }

    pub fn handle_key_event(
        &mut self,
        key: KeyEvent,
        sink: &dyn DisplaySink,
    ) -> Option<AppAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(AppAction::Quit);
            }
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppAction::Quit),
            KeyCode::Char('1') => self.set_zoom(ZoomCommand::ZoomIn),
            KeyCode::Char('2') => self.set_zoom(ZoomCommand::Pause),
            KeyCode::Char('3') => self.set_zoom(ZoomCommand::ZoomOut),
            KeyCode::Char('p') => self.toggle_compute_pause(),
            KeyCode::Char('o') => {
                self.show_overlay = !self.show_overlay;
                debug!("Overlay {}", if self.show_overlay { "on" } else { "off" });
            }
            KeyCode::Char('c') => {
                self.show_crosshair = !self.show_crosshair;
                debug!("Crosshair {}", if self.show_crosshair { "on" } else { "off" });
            }
            KeyCode::Char('r') => {
                self.controller.reset_view();
                self.show_info("View reset");
            }
            KeyCode::Char('s') => self.export_frame(sink),
            KeyCode::Char('d') => self.dump_parameters(),
            _ => {}
        }
        None
    }

    fn set_zoom(&mut self, command: ZoomCommand) {
        debug!("Zoom command: {}", command.as_str());
        self.controller.set_zoom_command(command);
    }

    fn toggle_compute_pause(&mut self) {
        let result = match self.controller.thread_state() {
            ThreadState::Paused => self.controller.resume_compute_thread(),
            _ => self.controller.pause_compute_thread(),
        };
        match result {
            Ok(()) => {
                let state = self.controller.thread_state();
                debug!("Compute thread {state}");
                self.show_info(format!("Compute {state}"));
            }
            Err(e @ LifecycleError::InvalidTransition { .. }) => {
                warn!("{e}");
                self.show_error("Compute thread is not running");
            }
            Err(e) => {
                warn!("{e}");
                self.show_error(e.to_string());
            }
        }
    }

    fn export_frame(&mut self, sink: &dyn DisplaySink) {
        let Some(frame) = sink.current_frame() else {
            self.show_error("No frame to export");
            return;
        };
        match export_to_dir(frame, &self.export_dir, self.export_format) {
            Ok(path) => self.show_info(format!("Saved {}", path.display())),
            Err(e) => {
                warn!("Export failed: {e}");
                self.show_error(e.to_string());
            }
        }
    }

    fn dump_parameters(&mut self) {
        let dump = ParameterDump::from_controller(&self.controller);
        match dump_parameters(&dump, &self.export_dir) {
            Ok(path) => self.show_info(format!("Saved {}", path.display())),
            Err(e) => {
                warn!("Parameter dump failed: {e}");
                self.show_error(e.to_string());
            }
        }
    }

    /// Notice a compute thread that exited on its own; true when one was found
    pub fn check_compute_thread(&mut self) -> bool {
        let Some(e) = self.controller.reap_exited_thread() else {
            return false;
        };
        error!("Compute thread stopped: {e}");
        self.hud_message = Some(HudMessage::new(
            format!("Compute thread stopped: {e}"),
            COMPUTE_FAILURE_HUD_DURATION,
            HudMode::Error,
        ));
        true
    }

    fn pointer_at(column: u16, row: u16, sink: &dyn DisplaySink) -> Option<PointerInfo> {
        let pixel = sink.to_pixel(column, row)?;
        let (width, height) = sink.display_size();
        let normalized = PanRequest::normalize(pixel.0, pixel.1, f64::from(width), f64::from(height))?;
        Some(PointerInfo { pixel, normalized })
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent, sink: &dyn DisplaySink) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let pointer = Self::pointer_at(mouse.column, mouse.row, sink);
                if let Some(p) = pointer {
                    let (dx, dy) = p.normalized;
                    debug!("Pan request ({dx:.4}, {dy:.4})");
                    self.controller.set_pan_request(dx, dy);
                }
                self.pointer = pointer;
            }
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                self.pointer = Self::pointer_at(mouse.column, mouse.row, sink);
            }
            _ => {}
        }
    }

    /// Neutral frame shown until the compute thread publishes
    pub fn blank_frame(&self) -> Result<PixelBuffer> {
        let config = self.controller.config();
        Ok(PixelBuffer::filled(config.width, config.height, BLANK_PIXEL)?)
    }

    pub fn overlay(&self, fps: u16) -> Overlay {
        let lines = if self.show_overlay {
            OverlayStats {
                fps_cap: self.settings.display.fps_cap,
                fps,
                view: self.controller.view_snapshot(),
                frame_width: self.controller.config().width,
                compute: self.controller.stats_snapshot(),
                command: self.controller.zoom_command(),
                thread_state: self.controller.thread_state(),
                pointer: self.pointer,
            }
            .lines()
        } else {
            Vec::new()
        };
        Overlay {
            lines,
            crosshair: self.show_crosshair,
            hud: self.hud_message.clone(),
        }
    }
}

pub struct FPSCounter {
    last_measure: Instant,
    ticks: u16,
    current_fps: u16,
}

impl Default for FPSCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FPSCounter {
    pub fn new() -> FPSCounter {
        FPSCounter {
            last_measure: Instant::now(),
            ticks: 0,
            current_fps: 0,
        }
    }

    fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        let elapsed = self.last_measure.elapsed();
        if elapsed > Duration::from_secs(1) {
            self.current_fps = self.ticks;
            self.last_measure = Instant::now();
            self.ticks = 0;
        }
    }

    pub fn current_fps(&self) -> u16 {
        self.current_fps
    }
}

/// Display loop: pump input, pick up fresh frames, present at a capped rate.
///
/// Returns after a quit key once the compute thread has been joined.
pub fn run_app_with_event_source<S: DisplaySink>(
    sink: &mut S,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()> {
    let frame_budget = app.settings.frame_budget();
    let mut fps_counter = FPSCounter::new();

    if sink.current_frame().is_none() {
        sink.upload(app.blank_frame()?)?;
    }

    loop {
        let tick_start = Instant::now();
        let mut events_processed = 0;
        let mut should_quit = false;
        fps_counter.tick();

        while events_processed < MAX_EVENTS_PER_TICK && event_source.poll(Duration::ZERO)? {
            let event = event_source.read()?;
            events_processed += 1;

            match event {
                Event::Key(key) => {
                    if app.handle_key_event(key, &*sink) == Some(AppAction::Quit) {
                        should_quit = true;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse_event(mouse, &*sink),
                Event::Resize(_cols, _rows) => {
                    if let Err(e) = sink.handle_resize() {
                        warn!("Resize failed: {e:#}");
                    }
                }
                _ => {}
            }

            if should_quit {
                break;
            }
        }

        if should_quit {
            break;
        }

        if let Some(frame) = app.controller.exchange().take_if_dirty() {
            sink.upload(frame)?;
        }
        app.check_compute_thread();
        app.update_hud_message();
        sink.present(&app.overlay(fps_counter.current_fps()))?;

        // Input arriving early must not start the next tick before the deadline
        let deadline = tick_start + frame_budget;
        if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            let _ = event_source.poll(remaining)?;
        }
        if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(remaining);
        }
    }

    info!("Display loop finished, shutting down compute thread");
    app.controller.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::TerminalSink;
    use crate::event_source::SimulatedEventSource;
    use crate::render::{ComputeConfig, GenerateError, ViewState};
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    fn app() -> App {
        let generator = Arc::new(|_: &ViewState, w: usize, h: usize| {
            PixelBuffer::filled(w, h, [1, 2, 3, 255]).map_err(GenerateError::from)
        });
        let config = ComputeConfig {
            width: 8,
            height: 8,
            ..ComputeConfig::default()
        };
        App::new(Controller::new(config, generator), Settings::default())
    }

    fn sink() -> TerminalSink<TestBackend> {
        TerminalSink::new(Terminal::new(TestBackend::new(22, 12)).unwrap(), "test").unwrap()
    }

    fn key(c: char) -> KeyEvent {
        match SimulatedEventSource::char_key(c) {
            Event::Key(k) => k,
            _ => unreachable!(),
        }
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        let sink = sink();
        assert_eq!(app.handle_key_event(key('q'), &sink), Some(AppAction::Quit));
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::empty());
        assert_eq!(app.handle_key_event(esc, &sink), Some(AppAction::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key_event(ctrl_c, &sink), Some(AppAction::Quit));
        assert_eq!(app.handle_key_event(key('c'), &sink), None);
    }

    #[test]
    fn digit_keys_set_zoom_command() {
        let mut app = app();
        let sink = sink();
        app.handle_key_event(key('2'), &sink);
        assert_eq!(app.controller().zoom_command(), ZoomCommand::Pause);
        app.handle_key_event(key('3'), &sink);
        assert_eq!(app.controller().zoom_command(), ZoomCommand::ZoomOut);
        app.handle_key_event(key('1'), &sink);
        assert_eq!(app.controller().zoom_command(), ZoomCommand::ZoomIn);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut app = app();
        let sink = sink();
        let mut release = key('q');
        release.kind = KeyEventKind::Release;
        assert_eq!(app.handle_key_event(release, &sink), None);
    }

    #[test]
    fn click_sets_normalized_pan() {
        let mut app = app();
        let sink = sink();
        // 20x20 px grid inside the border; cell (16, 1) is pixel (15.5, 1.0)
        let Event::Mouse(click) = SimulatedEventSource::left_click(16, 1) else {
            unreachable!()
        };
        app.handle_mouse_event(click, &sink);
        let (dx, dy) = app.controller().pending_pan().unwrap();
        assert!((dx - 0.55).abs() < 1e-12);
        assert!((dy + 0.9).abs() < 1e-12);
        assert!(app.pointer().is_some());
    }

    #[test]
    fn click_on_border_is_ignored() {
        let mut app = app();
        let sink = sink();
        let Event::Mouse(click) = SimulatedEventSource::left_click(0, 0) else {
            unreachable!()
        };
        app.handle_mouse_event(click, &sink);
        assert_eq!(app.controller().pending_pan(), None);
    }

    #[test]
    fn mouse_move_updates_pointer_only() {
        let mut app = app();
        let sink = sink();
        let Event::Mouse(moved) = SimulatedEventSource::mouse_move(11, 6) else {
            unreachable!()
        };
        app.handle_mouse_event(moved, &sink);
        let pointer = app.pointer().unwrap();
        assert_eq!(pointer.pixel, (10.5, 11.0));
        assert_eq!(app.controller().pending_pan(), None);
    }

    #[test]
    fn pause_key_without_thread_reports_error() {
        let mut app = app();
        let sink = sink();
        app.handle_key_event(key('p'), &sink);
        assert_eq!(app.controller().thread_state(), ThreadState::Terminated);
        assert_eq!(
            app.hud_message().unwrap().mode,
            crate::widget::hud_message::HudMode::Error
        );
    }

    #[test]
    fn pause_key_toggles_running_thread() {
        let mut app = app();
        let sink = sink();
        app.controller_mut().create_compute_thread().unwrap();
        app.handle_key_event(key('p'), &sink);
        assert_eq!(app.controller().thread_state(), ThreadState::Paused);
        app.handle_key_event(key('p'), &sink);
        assert_eq!(app.controller().thread_state(), ThreadState::Running);
        app.controller_mut().shutdown().unwrap();
    }

    #[test]
    fn overlay_toggle_hides_lines() {
        let mut app = app();
        let sink = sink();
        assert!(!app.overlay(0).lines.is_empty());
        app.handle_key_event(key('o'), &sink);
        assert!(app.overlay(0).lines.is_empty());
    }

    #[test]
    fn export_without_frame_reports_error() {
        let mut app = app();
        let sink = sink();
        app.handle_key_event(key('s'), &sink);
        assert_eq!(app.hud_message().unwrap().message, "No frame to export");
    }

    #[test]
    fn loop_uploads_blank_frame_and_quits() {
        let mut app = app();
        let mut sink = sink();
        let mut events = SimulatedEventSource::new(vec![SimulatedEventSource::char_key('q')]);
        run_app_with_event_source(&mut sink, &mut app, &mut events).unwrap();

        let frame = sink.current_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 8));
        assert_eq!(frame.pixel(0, 0), Some(BLANK_PIXEL));
        assert_eq!(app.controller().thread_state(), ThreadState::Terminated);
    }

    #[test]
    fn crosshair_key_toggles_marker() {
        let mut app = app();
        let sink = sink();
        assert!(app.overlay(0).crosshair);
        app.handle_key_event(key('c'), &sink);
        assert!(!app.show_crosshair());
        assert!(!app.overlay(0).crosshair);
        app.handle_key_event(key('c'), &sink);
        assert!(app.overlay(0).crosshair);
    }

    #[test]
    fn dump_key_writes_parameters() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.display.export_dir = dir.path().to_path_buf();
        let generator = Arc::new(|_: &ViewState, w: usize, h: usize| {
            PixelBuffer::filled(w, h, [1, 2, 3, 255]).map_err(GenerateError::from)
        });
        let mut app = App::new(Controller::new(ComputeConfig::default(), generator), settings);
        app.controller().set_pan_request(0.5, 0.0);
        app.handle_key_event(key('2'), &sink());
        app.handle_key_event(key('d'), &sink());

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(json["zoom_command"], "pause");
        assert_eq!(json["view"]["scale_a"], app.controller().view_snapshot().scale_a);
        assert_eq!(json["zoom"]["beta"], ComputeConfig::default().zoom.beta);
        assert!(app.hud_message().unwrap().message.starts_with("Saved "));
    }

    #[test]
    fn dump_to_missing_dir_reports_error() {
        let mut app = app();
        app.export_dir = PathBuf::from("/nonexistent/mandelzoom");
        app.handle_key_event(key('d'), &sink());
        assert_eq!(
            app.hud_message().unwrap().mode,
            crate::widget::hud_message::HudMode::Error
        );
    }

    #[test]
    fn panicked_compute_thread_is_reported() {
        let generator = Arc::new(
            |_: &ViewState, _: usize, _: usize| -> Result<PixelBuffer, GenerateError> {
                panic!("generator blew up")
            },
        );
        let config = ComputeConfig {
            width: 4,
            height: 4,
            tick_interval: Duration::from_millis(1),
            ..ComputeConfig::default()
        };
        let mut app = App::new(Controller::new(config, generator), Settings::default());
        app.controller_mut().create_compute_thread().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.check_compute_thread() {
            assert!(Instant::now() < deadline, "compute thread never exited");
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(app.controller().thread_state(), ThreadState::Terminated);
        let hud = app.hud_message().unwrap();
        assert_eq!(hud.mode, crate::widget::hud_message::HudMode::Error);
        assert!(hud.message.starts_with("Compute thread stopped"));
        assert!(!app.check_compute_thread());
        app.controller_mut().shutdown().unwrap();
    }

    #[test]
    fn export_uses_configured_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.display.export_dir = dir.path().to_path_buf();
        settings.display.export_format = ExportFormat::Ppm;
        let mut app = App::new(app().controller, settings);
        let mut sink = sink();
        sink.upload(app.blank_frame().unwrap()).unwrap();

        app.handle_key_event(key('s'), &sink);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension().unwrap(), "ppm");
        assert!(std::fs::read(&files[0]).unwrap().starts_with(b"P6"));
    }
}
