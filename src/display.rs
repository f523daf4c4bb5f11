//! Where finished frames end up

use anyhow::Result;
use ratatui::{
    Terminal,
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::render::PixelBuffer;
use crate::widget::fractal_view::{FractalView, PixelGrid};
use crate::widget::hud_message::HudMessage;
use crate::widget::overlay::StatsOverlay;

/// Per-tick decorations drawn over the frame
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    /// Statistics lines; empty hides the overlay
    pub lines: Vec<String>,
    /// Draw the center marker, if the sink has one configured
    pub crosshair: bool,
    pub hud: Option<HudMessage>,
}

/// Display side of the frame pipeline
pub trait DisplaySink {
    /// Replace the displayed frame
    fn upload(&mut self, frame: PixelBuffer) -> Result<()>;

    /// Draw the current frame and overlay
    fn present(&mut self, overlay: &Overlay) -> Result<()>;

    /// Display area in pixels
    fn display_size(&self) -> (u32, u32);

    /// Pixel position under a pointer event, `None` outside the frame
    fn to_pixel(&self, column: u16, row: u16) -> Option<(f64, f64)>;

    /// Last uploaded frame
    fn current_frame(&self) -> Option<&PixelBuffer>;

    /// Pick up a new terminal size
    fn handle_resize(&mut self) -> Result<()>;
}

/// Frame area inside the bordered window
fn frame_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// Half-block renderer on a ratatui terminal
pub struct TerminalSink<B: Backend> {
    terminal: Terminal<B>,
    title: String,
    crosshair: Option<Color>,
    frame: Option<PixelBuffer>,
    grid: PixelGrid,
}

impl<B: Backend> TerminalSink<B>
where
    B::Error: Send + Sync + 'static,
{
    pub fn new(terminal: Terminal<B>, title: impl Into<String>) -> Result<Self> {
        let size = terminal.size()?;
        Ok(Self {
            terminal,
            title: title.into(),
            crosshair: None,
            frame: None,
            grid: PixelGrid {
                area: frame_area(Rect::new(0, 0, size.width, size.height)),
            },
        })
    }

    pub fn with_crosshair(mut self, rgb: [u8; 3]) -> Self {
        self.crosshair = Some(Color::Rgb(rgb[0], rgb[1], rgb[2]));
        self
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.terminal.backend_mut()
    }

    pub fn into_terminal(self) -> Terminal<B> {
        self.terminal
    }
}

impl<B: Backend> DisplaySink for TerminalSink<B>
where
    B::Error: Send + Sync + 'static,
{
    fn upload(&mut self, frame: PixelBuffer) -> Result<()> {
        self.frame = Some(frame);
        Ok(())
    }

    fn present(&mut self, overlay: &Overlay) -> Result<()> {
        let title = format!(" {} ", self.title);
        let frame = self.frame.as_ref();
        let crosshair = self.crosshair.filter(|_| overlay.crosshair);
        let mut drawn_area = self.grid.area;

        self.terminal.draw(|f| {
            let outer = f.area();
            let block = Block::default()
                .borders(Borders::ALL)
                .title(title.as_str())
                .style(Style::default().fg(Color::Gray));
            let inner = block.inner(outer);
            f.render_widget(block, outer);
            drawn_area = inner;

            let buf = f.buffer_mut();
            if let Some(frame) = frame {
                FractalView::new(frame)
                    .crosshair(crosshair)
                    .render(inner, buf);
            }
            if !overlay.lines.is_empty() {
                StatsOverlay::new(&overlay.lines).render(inner, buf);
            }
            let hud = overlay.hud.as_ref().filter(|h| !h.is_expired());
            if let (Some(hud), true) = (hud, inner.height > 0) {
                let hud_area = Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1);
                Paragraph::new(hud.styled_line()).render(hud_area, buf);
            }
        })?;

        self.grid = PixelGrid { area: drawn_area };
        Ok(())
    }

    fn display_size(&self) -> (u32, u32) {
        self.grid.extent()
    }

    fn to_pixel(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        self.grid.cell_to_pixel(column, row)
    }

    fn current_frame(&self) -> Option<&PixelBuffer> {
        self.frame.as_ref()
    }

    fn handle_resize(&mut self) -> Result<()> {
        self.terminal.autoresize()?;
        let size = self.terminal.size()?;
        self.grid = PixelGrid {
            area: frame_area(Rect::new(0, 0, size.width, size.height)),
        };
        Ok(())
    }
}
