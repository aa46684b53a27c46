//! Board location scan.
//! Finds the pixel rectangle a chessboard covers inside an arbitrary
//! full-screen frame, knowing only the two square colors. One row-major
//! seek pass finds the first pixel matching either color; two runs from
//! that seed then measure the extent, rightward for the width and
//! downward for the height.

use crate::pixel::{Color, PixelBuffer};

/// Chessboards are always 8x8.
pub const SIDE_LENGTH: u32 = 8;

/// Candidates narrower or shorter than this are noise, not boards.
pub const DEFAULT_MINIMUM_SIZE: u32 = 32;

/// Every 40 pixels of measured extent buy one pixel of tolerated gap,
/// enough to ride over thin grid lines and anti-aliased edges without
/// letting small noise regions grow.
const GAP_DIVISOR: u32 = 40;

/// Where a located board sits inside one display's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardLocation {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoardLocation {
    /// Pixel size of a single square.
    pub fn field_size(&self) -> (f64, f64) {
        (
            self.width as f64 / SIDE_LENGTH as f64,
            self.height as f64 / SIDE_LENGTH as f64,
        )
    }
}

/// Scan parameters: the two reference square colors plus the color match
/// tolerance and the minimum accepted board size.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    pub light: Color,
    pub dark: Color,
    pub tolerance: u32,
    pub minimum_size: u32,
}

impl ScanParams {
    pub fn new(light: Color, dark: Color) -> Self {
        Self {
            light,
            dark,
            tolerance: 0,
            minimum_size: DEFAULT_MINIMUM_SIZE,
        }
    }

    fn is_square_color(&self, color: Color) -> bool {
        color.matches(self.light, self.tolerance) || color.matches(self.dark, self.tolerance)
    }
}

/// Locates a board in `frame`, or `None` when no rectangle of the two
/// square colors meets the minimum size.
///
/// The first matching pixel anchors the candidate; there is no second
/// candidate within the same frame. The caller moves on to the next
/// display when this returns `None`.
pub fn locate_board(frame: &PixelBuffer, params: &ScanParams) -> Option<BoardLocation> {
    let (x, y) = seek_first_match(frame, params)?;
    let width = measure_run(params, (x + 1..frame.width()).map(|cx| frame.pixel(cx, y)));
    let height = measure_run(params, (y + 1..frame.height()).map(|cy| frame.pixel(x, cy)));
    if width < params.minimum_size || height < params.minimum_size {
        return None;
    }
    Some(BoardLocation {
        x,
        y,
        width,
        height,
    })
}

/// Row-major scan for the first pixel matching either square color.
fn seek_first_match(frame: &PixelBuffer, params: &ScanParams) -> Option<(u32, u32)> {
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            if params.is_square_color(frame.pixel(x, y)) {
                return Some((x, y));
            }
        }
    }
    None
}

/// Measures a run of square-colored pixels along one axis.
///
/// The run starts on the seed pixel, which is known to match, and grows
/// while pixels keep matching. At the first miss a gap budget of
/// `ceil(extent_so_far / 40)` consecutive misses is fixed for the rest of
/// the run. Missed pixels bridged by a later match count toward the
/// extent; a trailing gap does not. The run also ends at the frame edge.
fn measure_run(params: &ScanParams, pixels: impl Iterator<Item = Color>) -> u32 {
    let mut extent = 1u32; // the seed pixel
    let mut gap = 0u32;
    let mut budget: Option<u32> = None;
    for color in pixels {
        if params.is_square_color(color) {
            extent += gap + 1;
            gap = 0;
        } else {
            let budget = *budget.get_or_insert_with(|| (extent - 1).div_ceil(GAP_DIVISOR));
            gap += 1;
            if gap >= budget {
                break;
            }
        }
    }
    extent
}
