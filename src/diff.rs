//! Snapshot diffing.
//! Compares two crops of the located board and reports which of the 64
//! squares changed. Each square is sampled at two points: a border pixel
//! just inside the top-left corner and a center pixel where a piece's
//! visual mass sits. A square whose two samples agree shows flat
//! background; disagreement means something occupies it.

use crate::locate::SIDE_LENGTH;
use crate::pixel::{Color, PixelBuffer};

/// Pixel inset of the border sample from a square's top-left corner,
/// independent of square size.
const BORDER_INSET: f64 = 4.0;

/// Fractional position of the center sample inside a square. The vertical
/// fraction sits below the geometric center, where piece sprites carry
/// most of their color.
const CENTER_FRACTION: (f64, f64) = (0.5, 0.73);

/// A square on the 8x8 grid, (0, 0) at the top-left of the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SquareCoord {
    pub x: u8,
    pub y: u8,
}

/// Border and center samples of one square in one snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SquareSample {
    pub border: Color,
    pub center: Color,
}

impl SquareSample {
    /// Flat background: both samples captured the same color.
    pub fn is_uniform(&self) -> bool {
        self.border == self.center
    }
}

/// Samples square (x, y) of a board snapshot.
pub fn sample_square(snap: &PixelBuffer, x: u8, y: u8) -> SquareSample {
    let field_width = snap.width() as f64 / SIDE_LENGTH as f64;
    let field_height = snap.height() as f64 / SIDE_LENGTH as f64;
    let left = x as f64 * field_width;
    let top = y as f64 * field_height;
    let border = pixel_at(snap, left + BORDER_INSET, top + BORDER_INSET);
    let center = pixel_at(
        snap,
        left + field_width * CENTER_FRACTION.0,
        top + field_height * CENTER_FRACTION.1,
    );
    SquareSample { border, center }
}

/// Rounds a fractional sample position and clamps it onto the snapshot.
fn pixel_at(snap: &PixelBuffer, x: f64, y: f64) -> Color {
    let px = (x.round() as u32).min(snap.width() - 1);
    let py = (y.round() as u32).min(snap.height() - 1);
    snap.pixel(px, py)
}

/// Squares whose visual state differs between two same-size snapshots.
///
/// A square is reported when its uniform/non-uniform status flipped, or
/// when it is occupied in both snapshots with different center colors.
/// Comparison is exact pixel equality: both snapshots cover the same
/// identified rectangle, and a genuine piece change moves the sampled
/// colors far. Squares uniform in both snapshots are never reported even
/// if their absolute color drifted, so a global brightness shift does not
/// light up the whole board.
pub fn changed_squares(previous: &PixelBuffer, current: &PixelBuffer) -> Vec<SquareCoord> {
    let mut changed = Vec::new();
    if previous.width() != current.width() || previous.height() != current.height() {
        return changed;
    }
    for y in 0..SIDE_LENGTH as u8 {
        for x in 0..SIDE_LENGTH as u8 {
            let last = sample_square(previous, x, y);
            let now = sample_square(current, x, y);
            if now.is_uniform() != last.is_uniform() {
                changed.push(SquareCoord { x, y });
            } else if !now.is_uniform() && now.center != last.center {
                changed.push(SquareCoord { x, y });
            }
        }
    }
    changed
}
