//! Statistics overlay drawn over the fractal

use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Clear, Paragraph, Widget},
};

use crate::render::{ComputeStats, ThreadState, ViewState, ZoomCommand};

/// Pointer location in display pixels and its normalized value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInfo {
    pub pixel: (f64, f64),
    pub normalized: (f64, f64),
}

/// Everything the overlay shows, captured once per display tick
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStats {
    pub fps_cap: u32,
    pub fps: u16,
    pub view: ViewState,
    pub frame_width: usize,
    pub compute: ComputeStats,
    pub command: ZoomCommand,
    pub thread_state: ThreadState,
    pub pointer: Option<PointerInfo>,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl OverlayStats {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("FPS limit: {} average: {}", self.fps_cap, self.fps),
            format!(
                "Last compute time: {:.2} ms ({} frames, {} failed)",
                millis(self.compute.last_generate),
                self.compute.frames_published,
                self.compute.generate_failures
            ),
            format!("Scale alpha: {:.12e}", self.view.scale_a),
            format!("Scale delta: {:.12e}", self.view.pixel_step(self.frame_width)),
            format!("C.x: {:.17}", self.view.offset_x),
            format!("C.y: {:.17}", self.view.offset_y),
            format!(
                "Zoom: {}  thread: {}",
                self.command.as_str(),
                self.thread_state
            ),
        ];
        if let Some(p) = self.pointer {
            lines.push(format!(
                "Mouse: ({:.0},{:.0}) => ({:.4},{:.4})",
                p.pixel.0, p.pixel.1, p.normalized.0, p.normalized.1
            ));
        }
        lines
    }
}

/// Text block anchored to the top-left corner
pub struct StatsOverlay<'a> {
    lines: &'a [String],
}

impl<'a> StatsOverlay<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        Self { lines }
    }

    /// Area the overlay covers inside `area`
    pub fn area_within(&self, area: Rect) -> Rect {
        let width = self
            .lines
            .iter()
            .map(|l| l.chars().count() as u16 + 2)
            .max()
            .unwrap_or(0)
            .min(area.width);
        let height = (self.lines.len() as u16).min(area.height);
        Rect::new(area.x, area.y, width, height)
    }
}

impl Widget for StatsOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let target = self.area_within(area);
        if target.width == 0 || target.height == 0 {
            return;
        }
        let lines: Vec<Line> = self
            .lines
            .iter()
            .map(|l| Line::from(format!(" {l}")))
            .collect();
        Clear.render(target, buf);
        Paragraph::new(lines)
            .style(Style::default().fg(Color::White).bg(Color::Rgb(10, 10, 10)))
            .render(target, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> OverlayStats {
        OverlayStats {
            fps_cap: 60,
            fps: 58,
            view: ViewState {
                offset_x: -0.5,
                offset_y: 0.25,
                scale_a: 1.0,
                scale_b: 4.0,
            },
            frame_width: 200,
            compute: ComputeStats {
                frames_published: 3,
                generate_failures: 1,
                last_generate: Duration::from_micros(1500),
                ticks: 4,
            },
            command: ZoomCommand::Pause,
            thread_state: ThreadState::Running,
            pointer: None,
        }
    }

    #[test]
    fn lines_include_core_parameters() {
        let lines = stats().lines();
        assert_eq!(lines[0], "FPS limit: 60 average: 58");
        assert!(lines[1].starts_with("Last compute time: 1.50 ms"));
        assert!(lines[3].contains("2.000000000000e-2"));
        assert!(lines.iter().any(|l| l == "Zoom: pause  thread: running"));
        assert!(!lines.iter().any(|l| l.starts_with("Mouse")));
    }

    #[test]
    fn pointer_line_is_optional() {
        let mut s = stats();
        s.pointer = Some(PointerInfo {
            pixel: (10.0, 20.0),
            normalized: (-0.5, 0.25),
        });
        let lines = s.lines();
        assert_eq!(lines.last().unwrap(), "Mouse: (10,20) => (-0.5000,0.2500)");
    }

    #[test]
    fn overlay_area_is_clamped() {
        let lines = vec!["abcdef".to_string(), "xy".to_string()];
        let overlay = StatsOverlay::new(&lines);
        assert_eq!(overlay.area_within(Rect::new(2, 3, 40, 10)), Rect::new(2, 3, 8, 2));
        assert_eq!(overlay.area_within(Rect::new(0, 0, 4, 1)), Rect::new(0, 0, 4, 1));
    }
}
