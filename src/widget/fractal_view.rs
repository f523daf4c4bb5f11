//! Half-block rendering of an RGBA frame
//!
//! Every terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀`, the lower one as the background. The frame is
//! resampled nearest-neighbour to whatever area it is given, so a resize
//! never needs a new frame.

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use crate::render::PixelBuffer;

const UPPER_HALF_BLOCK: &str = "▀";

/// Map a cell-space area to frame pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    pub area: Rect,
}

impl PixelGrid {
    /// Width and height of the area in display pixels
    pub fn extent(&self) -> (u32, u32) {
        (u32::from(self.area.width), u32::from(self.area.height) * 2)
    }

    /// Display-pixel position of the center of a terminal cell, `None` when
    /// the cell lies outside the area
    pub fn cell_to_pixel(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let a = self.area;
        if a.width == 0 || a.height == 0 {
            return None;
        }
        if column < a.x || row < a.y || column >= a.x + a.width || row >= a.y + a.height {
            return None;
        }
        let x = f64::from(column - a.x) + 0.5;
        let y = f64::from(row - a.y) * 2.0 + 1.0;
        Some((x, y))
    }
}

/// Nearest source index for a destination index
fn sample(dst: usize, dst_len: usize, src_len: usize) -> usize {
    ((dst * src_len) / dst_len.max(1)).min(src_len.saturating_sub(1))
}

fn rgb(px: [u8; 4]) -> Color {
    Color::Rgb(px[0], px[1], px[2])
}

pub struct FractalView<'a> {
    frame: &'a PixelBuffer,
    crosshair: Option<Color>,
}

impl<'a> FractalView<'a> {
    pub fn new(frame: &'a PixelBuffer) -> Self {
        Self {
            frame,
            crosshair: None,
        }
    }

    pub fn crosshair(mut self, color: Option<Color>) -> Self {
        self.crosshair = color;
        self
    }
}

impl Widget for FractalView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let frame = self.frame;
        let cols = usize::from(area.width);
        let rows = usize::from(area.height) * 2;

        for cy in 0..area.height {
            let top_row = sample(usize::from(cy) * 2, rows, frame.height());
            let bottom_row = sample(usize::from(cy) * 2 + 1, rows, frame.height());
            for cx in 0..area.width {
                let src_x = sample(usize::from(cx), cols, frame.width());
                let (Some(top), Some(bottom)) =
                    (frame.pixel(src_x, top_row), frame.pixel(src_x, bottom_row))
                else {
                    continue;
                };
                if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                    cell.set_symbol(UPPER_HALF_BLOCK)
                        .set_fg(rgb(top))
                        .set_bg(rgb(bottom));
                }
            }
        }

        if let Some(color) = self.crosshair {
            let mid_x = area.x + area.width / 2;
            let mid_y = area.y + area.height / 2;
            if let Some(cell) = buf.cell_mut((mid_x, mid_y)) {
                cell.set_symbol("+").set_fg(color);
            }
        }
    }
}
