//! Owned RGBA frames and the single-slot exchange between compute and display

use std::sync::{Mutex, PoisonError};

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Errors from constructing a [`PixelBuffer`]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: usize, height: usize },

    #[error("frame {width}x{height} is too large to address")]
    TooLarge { width: usize, height: usize },

    #[error("expected {expected} bytes for the frame, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Flat RGBA pixel data, row-major, `height` rows of `width` pixels
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    /// Number of bytes a `width` x `height` frame occupies
    pub fn byte_len(width: usize, height: usize) -> Result<usize, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }
        width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or(FrameError::TooLarge { width, height })
    }

    /// Wrap existing RGBA bytes, validating the length
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with a single colour
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Result<Self, FrameError> {
        let len = Self::byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / BYTES_PER_PIXEL {
            data.extend_from_slice(&rgba);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the raw bytes; the length cannot change through it
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value of the pixel at (x, y), or `None` outside the frame
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * BYTES_PER_PIXEL;
        let px = &self.data[start..start + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Iterate over rows as byte slices
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.width * BYTES_PER_PIXEL)
    }
}

#[derive(Debug, Default)]
struct Slot {
    buffer: Option<PixelBuffer>,
    dirty: bool,
}

/// Single-slot hand-off point for the most recently completed frame.
///
/// The producer moves a finished [`PixelBuffer`] in with [`publish`](Self::publish);
/// the consumer moves it out with [`take_if_dirty`](Self::take_if_dirty). Only
/// the ownership swap happens under the lock, so a reader can never observe a
/// frame that is still being written.
#[derive(Debug, Default)]
pub struct FrameExchange {
    slot: Mutex<Slot>,
}

impl FrameExchange {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished frame, dropping whatever the slot held before
    pub fn publish(&self, buffer: PixelBuffer) {
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.dirty = true;
            slot.buffer.replace(buffer)
        };
        // Deallocate outside the critical section.
        drop(previous);
    }

    /// Take the frame if one was published since the last take
    pub fn take_if_dirty(&self) -> Option<PixelBuffer> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if !slot.dirty {
            return None;
        }
        slot.dirty = false;
        slot.buffer.take()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dirty
    }

    /// Release the held frame and reset the dirty flag
    pub fn clear(&self) {
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.dirty = false;
            slot.buffer.take()
        };
        drop(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn patterned(width: usize, height: usize, seed: u8) -> PixelBuffer {
        let len = PixelBuffer::byte_len(width, height).unwrap();
        let data = (0..len).map(|i| (i as u8).wrapping_add(seed)).collect();
        PixelBuffer::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        let err = PixelBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            PixelBuffer::filled(0, 4, [0; 4]),
            Err(FrameError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        assert!(matches!(
            PixelBuffer::byte_len(usize::MAX, 2),
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let mut frame = PixelBuffer::filled(3, 2, [0, 0, 0, 255]).unwrap();
        let idx = (3 + 2) * BYTES_PER_PIXEL;
        frame.as_bytes_mut()[idx..idx + 4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(frame.pixel(3, 0), None);
        assert_eq!(frame.rows().count(), 2);
    }

    #[test]
    fn take_returns_published_frame_once() {
        let exchange = FrameExchange::new();
        let frame = patterned(8, 4, 7);
        exchange.publish(frame.clone());

        let taken = exchange.take_if_dirty().expect("frame was published");
        assert_eq!(taken.as_bytes(), frame.as_bytes());
        assert_eq!((taken.width(), taken.height()), (8, 4));
        assert!(exchange.take_if_dirty().is_none());
    }

    #[test]
    fn empty_exchange_has_nothing_to_take() {
        let exchange = FrameExchange::new();
        assert!(!exchange.is_dirty());
        assert!(exchange.take_if_dirty().is_none());
    }

    #[test]
    fn newer_publish_replaces_unconsumed_frame() {
        let exchange = FrameExchange::new();
        exchange.publish(patterned(4, 4, 1));
        exchange.publish(patterned(2, 2, 9));

        let taken = exchange.take_if_dirty().unwrap();
        assert_eq!((taken.width(), taken.height()), (2, 2));
        assert_eq!(taken.as_bytes(), patterned(2, 2, 9).as_bytes());
    }

    #[test]
    fn clear_drops_pending_frame() {
        let exchange = FrameExchange::new();
        exchange.publish(patterned(4, 4, 0));
        exchange.clear();
        assert!(!exchange.is_dirty());
        assert!(exchange.take_if_dirty().is_none());
    }

    #[test]
    fn concurrent_publish_and_take_never_tears() {
        const FRAMES: usize = 2_000;
        let exchange = Arc::new(FrameExchange::new());

        let producer = {
            let exchange = Arc::clone(&exchange);
            thread::spawn(move || {
                for n in 0..FRAMES {
                    // Every byte of a frame carries the same value, so a
                    // mixed frame would show up as differing bytes.
                    let value = (n % 251) as u8;
                    let frame = PixelBuffer::filled(64, 64, [value; 4]).unwrap();
                    exchange.publish(frame);
                }
            })
        };

        let mut seen = 0usize;
        while !producer.is_finished() || exchange.is_dirty() {
            if let Some(frame) = exchange.take_if_dirty() {
                assert_eq!((frame.width(), frame.height()), (64, 64));
                let bytes = frame.as_bytes();
                assert_eq!(bytes.len(), 64 * 64 * 4);
                let first = bytes[0];
                assert!(bytes.iter().all(|&b| b == first), "torn frame");
                seen += 1;
            }
        }
        producer.join().unwrap();
        assert!(seen >= 1);
    }
}
