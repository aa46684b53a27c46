//! Pixel-level primitives.
//! Owned RGB frames with explicit stride arithmetic, plus tolerance-based
//! color matching. A frame is handed over by the capture layer once and is
//! only ever read afterwards; cropping produces a new frame.

use anyhow::{Context, Result, bail};

pub const BYTES_PER_PIXEL: usize = 3;

/// An 8-bit RGB color. Alpha carries no signal for board detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses an `rrggbb` hex triple. A leading `#` is allowed.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 {
            bail!("Expected a 6-digit hex color like f0d9b5, got '{}'", hex);
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Invalid hex color '{}'", hex))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Manhattan distance summed over the three channels.
    pub fn distance(self, other: Color) -> u32 {
        self.r.abs_diff(other.r) as u32
            + self.g.abs_diff(other.g) as u32
            + self.b.abs_diff(other.b) as u32
    }

    /// Tolerance-based equality. Tolerance 0 is an exact match; non-zero
    /// values absorb anti-aliasing in the capture.
    pub fn matches(self, other: Color, tolerance: u32) -> bool {
        self.distance(other) <= tolerance
    }
}

/// A read-only view over one captured frame: raw RGB bytes, row-major,
/// `stride` bytes per row. The stride may exceed `width * 3` when the
/// source pads rows to an alignment boundary.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw capture bytes, rejecting malformed geometry up front so
    /// every later access can index without failure.
    pub fn from_raw(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("Captured empty {}x{} frame", width, height);
        }
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if stride < row_bytes {
            bail!("Stride {} is shorter than a row of {} pixels", stride, width);
        }
        let required = stride * (height as usize - 1) + row_bytes;
        if data.len() < required {
            bail!(
                "Frame data holds {} bytes, {}x{} with stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                required
            );
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Wraps tightly packed RGB bytes (stride == width * 3).
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, width as usize * BYTES_PER_PIXEL, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color at (x, y). Callers stay within `width`/`height`.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        debug_assert!(x < self.width && y < self.height);
        let i = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        Color::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    /// Copies a rectangle out into a new tightly packed frame.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelBuffer> {
        if x.saturating_add(width) > self.width || y.saturating_add(height) > self.height {
            bail!(
                "Crop bounds ({},{},{},{}) exceed frame dimensions {}x{}",
                x,
                y,
                width,
                height,
                self.width,
                self.height
            );
        }
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let start = row as usize * self.stride + x as usize * BYTES_PER_PIXEL;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        PixelBuffer::from_rgb(width, height, data)
    }

    /// Converts the frame into an `image` crate buffer for debug output.
    pub fn to_image(&self) -> image::RgbImage {
        let mut img = image::RgbImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.pixel(x, y);
                img.put_pixel(x, y, image::Rgb([c.r, c.g, c.b]));
            }
        }
        img
    }
}
