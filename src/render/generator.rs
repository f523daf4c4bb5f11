//! Image generation seam and the CPU Mandelbrot implementation

use rayon::prelude::*;

use super::frame::{BYTES_PER_PIXEL, FrameError, PixelBuffer};
use super::view::ViewState;
use crate::palette::PaletteId;

/// Errors from image generators
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("scale must be positive and finite, got scale_a={scale_a} scale_b={scale_b}")]
    InvalidScale { scale_a: f64, scale_b: f64 },

    #[error("{detail}")]
    Generic { detail: String },
}

impl GenerateError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Produces a complete RGBA frame for a view.
///
/// Implementations are called from the compute thread only, but must be
/// shareable so the controller can hand the same generator to a restarted
/// thread.
pub trait ImageGenerator: Send + Sync {
    fn generate(
        &self,
        view: &ViewState,
        width: usize,
        height: usize,
    ) -> Result<PixelBuffer, GenerateError>;
}

impl<F> ImageGenerator for F
where
    F: Fn(&ViewState, usize, usize) -> Result<PixelBuffer, GenerateError> + Send + Sync,
{
    fn generate(
        &self,
        view: &ViewState,
        width: usize,
        height: usize,
    ) -> Result<PixelBuffer, GenerateError> {
        self(view, width, height)
    }
}

/// Escape-time renderer, rows computed in parallel
#[derive(Clone, Debug)]
pub struct MandelbrotGenerator {
    max_iterations: u32,
    palette: PaletteId,
}

impl MandelbrotGenerator {
    pub const DEFAULT_ITERATIONS: u32 = 256;

    #[must_use]
    pub fn new(max_iterations: u32, palette: PaletteId) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            palette,
        }
    }

    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Iterations before `c` escapes the radius-2 disc, `None` if it never does
    fn escape_time(&self, cx: f64, cy: f64) -> Option<u32> {
        let (mut zx, mut zy) = (0.0f64, 0.0f64);
        for i in 0..self.max_iterations {
            let zx2 = zx * zx;
            let zy2 = zy * zy;
            if zx2 + zy2 > 4.0 {
                return Some(i);
            }
            zy = 2.0 * zx * zy + cy;
            zx = zx2 - zy2 + cx;
        }
        None
    }
}

impl Default for MandelbrotGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITERATIONS, PaletteId::default())
    }
}

impl ImageGenerator for MandelbrotGenerator {
    fn generate(
        &self,
        view: &ViewState,
        width: usize,
        height: usize,
    ) -> Result<PixelBuffer, GenerateError> {
        if !(view.scale_a > 0.0 && view.scale_a.is_finite())
            || !(view.scale_b > 0.0 && view.scale_b.is_finite())
        {
            return Err(GenerateError::InvalidScale {
                scale_a: view.scale_a,
                scale_b: view.scale_b,
            });
        }

        let len = PixelBuffer::byte_len(width, height)?;
        let mut data = vec![0u8; len];
        let step = view.pixel_step(width);
        let half_w = width as f64 / 2.0;
        let half_h = height as f64 / 2.0;
        let palette = self.palette.palette();
        let interior = palette.interior_rgba();
        let max = f64::from(self.max_iterations);

        data.par_chunks_mut(width * BYTES_PER_PIXEL)
            .enumerate()
            .for_each(|(y, row)| {
                let cy = view.offset_y + (y as f64 - half_h) * step;
                for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                    let cx = view.offset_x + (x as f64 - half_w) * step;
                    let rgba = match self.escape_time(cx, cy) {
                        Some(i) => palette.sample((f64::from(i) / max).sqrt()),
                        None => interior,
                    };
                    px.copy_from_slice(&rgba);
                }
            });

        Ok(PixelBuffer::from_rgba(width, height, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewState {
        ViewState {
            offset_x: -0.5,
            offset_y: 0.0,
            scale_a: 1.0,
            scale_b: 4.0,
        }
    }

    #[test]
    fn generates_requested_dimensions() {
        let generator = MandelbrotGenerator::new(64, PaletteId::Grayscale);
        let frame = generator.generate(&view(), 40, 30).unwrap();
        assert_eq!((frame.width(), frame.height()), (40, 30));
        assert_eq!(frame.as_bytes().len(), 40 * 30 * 4);
        assert!(frame.as_bytes().chunks_exact(4).all(|px| px[3] == 0xFF));
    }

    #[test]
    fn center_of_main_cardioid_is_interior() {
        let generator = MandelbrotGenerator::new(64, PaletteId::Grayscale);
        let frame = generator.generate(&view(), 41, 41).unwrap();
        // Pixel (20, 20) maps to roughly (-0.5, 0.0), inside the set.
        assert_eq!(frame.pixel(20, 20), Some([0, 0, 0, 255]));
        // Pixel (0, 0) maps to (-2.5, -2.0), which escapes immediately.
        assert_ne!(frame.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn rejects_non_positive_scale() {
        let generator = MandelbrotGenerator::default();
        let bad = ViewState {
            scale_a: 0.0,
            ..view()
        };
        assert!(matches!(
            generator.generate(&bad, 8, 8),
            Err(GenerateError::InvalidScale { .. })
        ));
    }

    #[test]
    fn rejects_empty_frame() {
        let generator = MandelbrotGenerator::default();
        assert!(matches!(
            generator.generate(&view(), 0, 8),
            Err(GenerateError::Frame(FrameError::EmptyDimensions { .. }))
        ));
    }

    #[test]
    fn closures_are_generators() {
        let solid = |_: &ViewState, w: usize, h: usize| {
            PixelBuffer::filled(w, h, [9, 9, 9, 255]).map_err(GenerateError::from)
        };
        let frame = solid.generate(&view(), 2, 2).unwrap();
        assert_eq!(frame.pixel(1, 1), Some([9, 9, 9, 255]));
    }
}
