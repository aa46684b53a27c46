//! Screen capture module
//! Uses `xcap` for cross-platform screenshots, one full-resolution frame
//! per display. Everything above this layer runs on plain RGB buffers, so
//! the OS capture sits behind a small trait and tests substitute
//! in-memory frames.
//! Latency: 30-50ms per full-screen capture.
//! Permissions note: On macOS, grant "Screen & System Audio Recording"
//! permission to the terminal in System Settings > Privacy & Security.

use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::time::Instant;
use xcap::Monitor;

use crate::locate::BoardLocation;
use crate::pixel::{BYTES_PER_PIXEL, PixelBuffer};

/// Supplies display enumeration and raw frames in a fixed order.
pub trait ScreenSource {
    /// Number of available displays.
    fn display_count(&self) -> Result<usize>;

    /// Full-resolution capture of one display as tightly packed RGB.
    fn capture(&self, index: usize) -> Result<PixelBuffer>;
}

/// Captures through `xcap::Monitor`.
pub struct XcapSource;

impl ScreenSource for XcapSource {
    fn display_count(&self) -> Result<usize> {
        Ok(Monitor::all().context("Failed to enumerate monitors")?.len())
    }

    fn capture(&self, index: usize) -> Result<PixelBuffer> {
        let start = Instant::now();

        let monitors = Monitor::all().context("Failed to enumerate monitors")?;
        let monitor = monitors
            .get(index)
            .with_context(|| format!("No monitor with index {}", index))?;

        let screenshot = monitor.capture_image().context(
            "Failed to capture image. On macOS, ensure the terminal has Screen Recording permission in System Settings > Privacy & Security > Screen & System Audio Recording",
        )?;
        if screenshot.width() == 0 || screenshot.height() == 0 {
            bail!("Captured empty screenshot - possible permission issue or no display");
        }

        let frame = rgba_to_rgb(&screenshot)?;
        eprintln!("Capture latency for display {}: {:?}", index, start.elapsed());
        Ok(frame)
    }
}

/// Drops the alpha channel; board detection reads 24-bit RGB.
fn rgba_to_rgb(rgba: &image::RgbaImage) -> Result<PixelBuffer> {
    let (width, height) = rgba.dimensions();
    let mut data = Vec::with_capacity((width * height) as usize * BYTES_PER_PIXEL);
    for pixel in rgba.pixels() {
        data.extend_from_slice(&pixel.0[..3]);
    }
    PixelBuffer::from_rgb(width, height, data)
}

/// Saves the frame with the located rectangle outlined when the
/// `DEBUG_CAPTURE` env var is set.
/// Debug: run with `DEBUG_CAPTURE=1` and inspect `screenshots/located_board.png`.
pub fn save_debug_frame(frame: &PixelBuffer, location: &BoardLocation) -> Result<()> {
    if env::var_os("DEBUG_CAPTURE").is_none() {
        return Ok(());
    }
    let mut img = frame.to_image();
    let rect = imageproc::rect::Rect::at(location.x as i32, location.y as i32)
        .of_size(location.width, location.height);
    imageproc::drawing::draw_hollow_rect_mut(&mut img, rect, image::Rgb([255, 0, 0]));
    fs::create_dir_all("screenshots").context("Failed to create screenshots/ debug directory")?;
    img.save("screenshots/located_board.png")
        .context("Failed to save debug board image to screenshots/")?;
    Ok(())
}
