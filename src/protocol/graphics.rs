//! # Bitmap Graphics Frames
//!
//! The printer keeps a scanline-addressed frame buffer. An image is sent one
//! scanline at a time, each scanline split into 128-dot chunks:
//!
//! ```text
//! BITMAP_WRITE  [0x10, yL, yH, chunk, d0 .. d15]   (20 bytes)
//! BITMAP_FLUSH  [0x11, hL, hH]                     (3 bytes)
//! ```
//!
//! ## Coordinate System
//!
//! ```text
//! (0,0) ──────────────────────► X (128 dots per chunk)
//!   │
//!   │   ████████  ← one byte = 8 horizontal dots
//!   │
//!   ▼
//!   Y (scanline, 16-bit little-endian on the wire)
//! ```
//!
//! ## Bit Packing
//!
//! Unlike ESC/POS style printers, this firmware packs **LSB first**:
//! - Bit 0 (LSB) = leftmost dot of the group
//! - Bit 7 (MSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0x0F = 00001111 = ████░░░░
//! Byte value 0xF0 = 11110000 = ░░░░████
//! Byte value 0x55 = 01010101 = █░█░█░█░
//! ```
//!
//! ## Black Test
//!
//! Input samples are RGBA as handed over by the renderer (already dithered).
//! A dot prints iff the sample is fully opaque and its first channel is 0.
//! Green and blue are not consulted.
//!
//! "Fully opaque" means alpha 255. The LIFF web client for this printer
//! only skips samples with alpha 0, so a half-transparent black dot prints
//! there but stays white here.

use std::path::Path;

use image::{Rgba, RgbaImage};

use super::commands::{Opcode, u16_le};
use super::frame::Frame;
use crate::error::{EncodeError, ThermolineError};

/// Packed bytes per BITMAP_WRITE frame.
pub const CHUNK_BYTES: usize = 16;

/// Dots covered by one BITMAP_WRITE frame.
pub const CHUNK_DOTS: u32 = CHUNK_BYTES as u32 * 8;

/// Total length of a BITMAP_WRITE frame (opcode, yL, yH, chunk, data).
pub const BITMAP_WRITE_LEN: usize = 4 + CHUNK_BYTES;

/// Widest raster the one-byte chunk index can address.
pub const MAX_WIDTH: u32 = CHUNK_DOTS * 256;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// # Monochrome Raster
///
/// A rectangular grid of RGBA samples, already thresholded or dithered by
/// the caller. Width is a multiple of 8 so every scanline packs into whole
/// bytes; height fits the 16-bit row address.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    image: RgbaImage,
}

impl Raster {
    /// Wrap an RGBA image, validating its shape.
    pub fn from_rgba(image: RgbaImage) -> Result<Self, EncodeError> {
        let (width, height) = image.dimensions();
        if width == 0 || width % 8 != 0 || width > MAX_WIDTH {
            return Err(EncodeError::InvalidWidth(width));
        }
        if height == 0 || height > u16::MAX as u32 {
            return Err(EncodeError::InvalidHeight(height));
        }
        Ok(Self { image })
    }

    /// Build a raster from a predicate; `true` marks a black dot.
    ///
    /// ## Example
    ///
    /// ```
    /// use thermoline::protocol::graphics::Raster;
    ///
    /// // Left half black
    /// let raster = Raster::from_fn(128, 100, |x, _| x < 64)?;
    /// assert!(raster.is_black(0, 0));
    /// assert!(!raster.is_black(64, 0));
    /// # Ok::<(), thermoline::error::EncodeError>(())
    /// ```
    pub fn from_fn(
        width: u32,
        height: u16,
        mut f: impl FnMut(u32, u32) -> bool,
    ) -> Result<Self, EncodeError> {
        let image = RgbaImage::from_fn(width, height as u32, |x, y| {
            if f(x, y) { BLACK } else { WHITE }
        });
        Self::from_rgba(image)
    }

    /// An all-white raster.
    pub fn blank(width: u32, height: u16) -> Result<Self, EncodeError> {
        Self::from_fn(width, height, |_, _| false)
    }

    /// Build a raster from a packed 1-bpp buffer.
    ///
    /// Rows are `width / 8` bytes, row-major, with the same LSB-first bit
    /// order the printer uses on the wire.
    pub fn from_packed(width: u32, height: u16, data: &[u8]) -> Result<Self, EncodeError> {
        if width == 0 || width % 8 != 0 {
            return Err(EncodeError::InvalidWidth(width));
        }
        let stride = (width / 8) as usize;
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(EncodeError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Self::from_fn(width, height, |x, y| {
            let byte = data[y as usize * stride + (x / 8) as usize];
            (byte >> (x % 8)) & 1 == 1
        })
    }

    /// Load an image file. The file must already be monochrome; no
    /// scaling or dithering happens here.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ThermolineError> {
        let image = image::open(path)?.to_rgba8();
        Ok(Self::from_rgba(image)?)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u16 {
        // Bounded by `from_rgba`.
        self.image.height() as u16
    }

    /// Number of BITMAP_WRITE frames per scanline.
    #[inline]
    pub fn chunks_per_row(&self) -> usize {
        self.width().div_ceil(CHUNK_DOTS) as usize
    }

    /// Whether the dot at (x, y) prints.
    #[inline]
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        is_black(self.image.get_pixel(x, y))
    }
}

/// Black test for one sample: fully opaque and zero on channel 0.
#[inline]
pub fn is_black(sample: &Rgba<u8>) -> bool {
    sample[3] == u8::MAX && sample[0] == 0
}

/// Pack up to 8 dots into a byte, first dot in the least significant bit.
///
/// ## Example
///
/// ```
/// use thermoline::protocol::graphics::pack_byte;
///
/// assert_eq!(pack_byte(&[true, false, false, false, false, false, false, false]), 0x01);
/// assert_eq!(pack_byte(&[true; 8]), 0xFF);
/// ```
#[inline]
pub fn pack_byte(dots: &[bool]) -> u8 {
    debug_assert!(dots.len() <= 8, "at most 8 dots per byte, got {}", dots.len());
    dots.iter()
        .enumerate()
        .fold(0, |acc, (i, &dot)| acc | ((dot as u8) << i))
}

/// # Encode One Scanline (BITMAP_WRITE 0x10)
///
/// Produces `ceil(width / 128)` frames for row `y`, chunk indices counting
/// up from 0. Every frame carries 16 data bytes; the tail of the last chunk
/// is zero padded when the raster width is not a multiple of 128.
///
/// ## Example
///
/// ```
/// use thermoline::protocol::graphics::{self, Raster};
///
/// let raster = Raster::from_fn(128, 1, |_, _| true)?;
/// let frames = graphics::encode_scanline(&raster, 0)?;
///
/// assert_eq!(frames.len(), 1);
/// assert_eq!(&frames[0].as_bytes()[..4], &[0x10, 0x00, 0x00, 0x00]);
/// assert_eq!(&frames[0].as_bytes()[4..], &[0xFF; 16]);
/// # Ok::<(), thermoline::error::EncodeError>(())
/// ```
pub fn encode_scanline(raster: &Raster, y: u16) -> Result<Vec<Frame>, EncodeError> {
    if y >= raster.height() {
        return Err(EncodeError::RowOutOfRange {
            y,
            height: raster.height(),
        });
    }

    Ok(scanline_frames(raster, y))
}

/// Chunk frames for a row already known to be in range.
pub(crate) fn scanline_frames(raster: &Raster, y: u16) -> Vec<Frame> {
    let row = y as u32;
    let width_bytes = (raster.width() / 8) as usize;
    let [yl, yh] = u16_le(y);

    (0..raster.chunks_per_row())
        .map(|chunk| {
            let mut payload = [0u8; 3 + CHUNK_BYTES];
            payload[..3].copy_from_slice(&[yl, yh, chunk as u8]);

            let first = chunk * CHUNK_BYTES;
            let last = (first + CHUNK_BYTES).min(width_bytes);
            for (slot, byte_index) in payload[3..].iter_mut().zip(first..last) {
                let x0 = byte_index as u32 * 8;
                let dots: [bool; 8] =
                    std::array::from_fn(|i| raster.is_black(x0 + i as u32, row));
                *slot = pack_byte(&dots);
            }

            Frame::new(Opcode::BitmapWrite, &payload)
        })
        .collect()
}

/// Encode every scanline, top to bottom.
pub fn encode_rows(raster: &Raster) -> Vec<Vec<Frame>> {
    (0..raster.height())
        .map(|y| scanline_frames(raster, y))
        .collect()
}

/// # Flush Bitmap (BITMAP_FLUSH 0x11 hL hH)
///
/// Ends the image transfer and prints `height` buffered scanlines.
///
/// ## Example
///
/// ```
/// use thermoline::protocol::graphics;
///
/// assert_eq!(graphics::encode_flush(100).as_bytes(), &[0x11, 100, 0]);
/// ```
pub fn encode_flush(height: u16) -> Frame {
    Frame::new(Opcode::BitmapFlush, &u16_le(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_width() {
        assert_eq!(
            Raster::blank(127, 1).unwrap_err(),
            EncodeError::InvalidWidth(127)
        );
        assert_eq!(Raster::blank(0, 1).unwrap_err(), EncodeError::InvalidWidth(0));
        assert!(Raster::blank(MAX_WIDTH + 8, 1).is_err());
    }

    #[test]
    fn test_rejects_zero_height() {
        assert_eq!(
            Raster::blank(128, 0).unwrap_err(),
            EncodeError::InvalidHeight(0)
        );
    }

    #[test]
    fn test_black_requires_opacity_and_zero_red() {
        assert!(is_black(&Rgba([0, 0, 0, 255])));
        // Only channel 0 is tested
        assert!(is_black(&Rgba([0, 200, 200, 255])));
        assert!(!is_black(&Rgba([1, 0, 0, 255])));
        // Transparent or partially transparent never prints
        assert!(!is_black(&Rgba([0, 0, 0, 0])));
        assert!(!is_black(&Rgba([0, 0, 0, 254])));
    }

    #[test]
    fn test_pack_byte_lsb_first() {
        let mut dots = [false; 8];
        for i in 0..8 {
            dots[i] = true;
            assert_eq!(pack_byte(&dots), 1 << i);
            dots[i] = false;
        }
        assert_eq!(
            pack_byte(&[true, false, true, false, true, false, true, false]),
            0x55
        );
        assert_eq!(pack_byte(&[true, true, true, true]), 0x0F);
    }

    #[test]
    fn test_one_frame_per_chunk() {
        for width in [8, 64, 128, 136, 256, 384] {
            let raster = Raster::blank(width, 2).unwrap();
            let frames = encode_scanline(&raster, 1).unwrap();
            assert_eq!(frames.len(), width.div_ceil(128) as usize, "width {}", width);
            for (i, frame) in frames.iter().enumerate() {
                assert_eq!(frame.len(), BITMAP_WRITE_LEN);
                assert_eq!(frame.payload()[2], i as u8);
            }
        }
    }

    #[test]
    fn test_partial_chunk_zero_padded() {
        let raster = Raster::from_fn(136, 1, |_, _| true).unwrap();
        let frames = encode_scanline(&raster, 0).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0].as_bytes()[4..], &[0xFF; 16]);
        let mut expected = [0u8; 16];
        expected[0] = 0xFF;
        assert_eq!(&frames[1].as_bytes()[4..], &expected);
    }

    #[test]
    fn test_row_address_little_endian() {
        let raster = Raster::blank(8, 300).unwrap();
        let frames = encode_scanline(&raster, 299).unwrap();
        assert_eq!(&frames[0].as_bytes()[..4], &[0x10, 0x2B, 0x01, 0x00]);
    }

    #[test]
    fn test_row_out_of_range() {
        let raster = Raster::blank(128, 100).unwrap();
        assert_eq!(
            encode_scanline(&raster, 100).unwrap_err(),
            EncodeError::RowOutOfRange { y: 100, height: 100 }
        );
    }

    #[test]
    fn test_from_packed_matches_wire_order() {
        let mut data = vec![0u8; 16 * 2];
        data[0] = 0x01;
        data[16 + 15] = 0x80;
        let raster = Raster::from_packed(128, 2, &data).unwrap();
        assert!(raster.is_black(0, 0));
        assert!(!raster.is_black(1, 0));
        assert!(raster.is_black(127, 1));

        let row0 = encode_scanline(&raster, 0).unwrap();
        let row1 = encode_scanline(&raster, 1).unwrap();
        assert_eq!(&row0[0].payload()[3..], &data[..16]);
        assert_eq!(&row1[0].payload()[3..], &data[16..]);
    }

    #[test]
    fn test_from_packed_size_mismatch() {
        assert_eq!(
            Raster::from_packed(128, 2, &[0; 31]).unwrap_err(),
            EncodeError::BufferSize {
                expected: 32,
                actual: 31
            }
        );
    }

    #[test]
    fn test_encode_rows_is_deterministic() {
        let raster = Raster::from_fn(256, 10, |x, y| (x * 7 + y * 3) % 5 == 0).unwrap();
        let first = encode_rows(&raster);
        let second = encode_rows(&raster);
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_flush() {
        assert_eq!(encode_flush(100).as_bytes(), &[0x11, 0x64, 0x00]);
        assert_eq!(encode_flush(0x0102).as_bytes(), &[0x11, 0x02, 0x01]);
    }
}
