//! Board registry.
//! Owns everything remembered between polls: which display the board was
//! found on, where it sits, the reference colors of the last scan, and
//! the last committed snapshot. One registry per polling loop; operations
//! are synchronous and the caller serializes access.

use anyhow::Result;

use crate::capture::{ScreenSource, save_debug_frame};
use crate::diff::{self, SquareCoord};
use crate::locate::{self, BoardLocation, ScanParams};
use crate::pixel::PixelBuffer;

pub struct BoardRegistry<S: ScreenSource> {
    source: S,
    /// Colors and thresholds of the most recent scan attempt.
    params: Option<ScanParams>,
    board: Option<FoundBoard>,
}

/// State retained for a located board.
struct FoundBoard {
    screen_index: usize,
    location: BoardLocation,
    last_snapshot: PixelBuffer,
}

impl<S: ScreenSource> BoardRegistry<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            params: None,
            board: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.board.is_some()
    }

    pub fn screen_index(&self) -> Option<usize> {
        self.board.as_ref().map(|b| b.screen_index)
    }

    pub fn location(&self) -> Option<BoardLocation> {
        self.board.as_ref().map(|b| b.location)
    }

    /// Scans every display in enumeration order and registers the first
    /// accepted rectangle, including an initial snapshot cropped from the
    /// same frame. Returns `Ok(None)` when no display shows a board; any
    /// scan attempt clears the previously registered board first. Capture
    /// errors propagate.
    pub fn locate_board(&mut self, params: ScanParams) -> Result<Option<BoardLocation>> {
        self.params = Some(params);
        self.board = None;
        for index in 0..self.source.display_count()? {
            let frame = self.source.capture(index)?;
            let Some(location) = locate::locate_board(&frame, &params) else {
                continue;
            };
            save_debug_frame(&frame, &location)?;
            let snapshot = frame.crop(location.x, location.y, location.width, location.height)?;
            self.board = Some(FoundBoard {
                screen_index: index,
                location,
                last_snapshot: snapshot,
            });
            return Ok(Some(location));
        }
        Ok(None)
    }

    /// Re-runs the display scan with the colors of the most recent scan
    /// attempt. `Ok(None)` when no scan has ever been requested.
    pub fn relocate(&mut self) -> Result<Option<BoardLocation>> {
        match self.params {
            Some(params) => self.locate_board(params),
            None => Ok(None),
        }
    }

    /// Replaces the retained snapshot with a fresh crop of the registered
    /// rectangle. Safe no-op while no board is found.
    pub fn refresh_snapshot(&mut self) -> Result<()> {
        let Some(board) = self.board.as_mut() else {
            return Ok(());
        };
        board.last_snapshot = crop_board(&self.source, board.screen_index, board.location)?;
        Ok(())
    }

    /// Diffs a fresh capture of the registered rectangle against the last
    /// committed snapshot. The fresh capture is not retained; call
    /// [`Self::refresh_snapshot`] to commit the current state. Empty while
    /// no board is found.
    pub fn changed_squares(&self) -> Result<Vec<SquareCoord>> {
        let Some(board) = self.board.as_ref() else {
            return Ok(Vec::new());
        };
        let current = crop_board(&self.source, board.screen_index, board.location)?;
        Ok(diff::changed_squares(&board.last_snapshot, &current))
    }
}

fn crop_board<S: ScreenSource>(
    source: &S,
    screen_index: usize,
    location: BoardLocation,
) -> Result<PixelBuffer> {
    let frame = source.capture(screen_index)?;
    frame.crop(location.x, location.y, location.width, location.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{BYTES_PER_PIXEL, Color};
    use anyhow::{Context, bail};
    use std::cell::RefCell;
    use std::rc::Rc;

    const LIGHT: Color = Color::new(240, 217, 181);
    const DARK: Color = Color::new(181, 136, 99);
    const WHITE: Color = Color::new(255, 255, 255);

    /// In-memory displays. Tests hold a clone to swap frames mid-run.
    #[derive(Clone)]
    struct FakeSource(Rc<RefCell<Vec<PixelBuffer>>>);

    impl FakeSource {
        fn new(frames: Vec<PixelBuffer>) -> Self {
            Self(Rc::new(RefCell::new(frames)))
        }

        fn set_frame(&self, index: usize, frame: PixelBuffer) {
            self.0.borrow_mut()[index] = frame;
        }
    }

    impl ScreenSource for FakeSource {
        fn display_count(&self) -> Result<usize> {
            Ok(self.0.borrow().len())
        }

        fn capture(&self, index: usize) -> Result<PixelBuffer> {
            self.0
                .borrow()
                .get(index)
                .cloned()
                .with_context(|| format!("No monitor with index {}", index))
        }
    }

    struct FailingSource;

    impl ScreenSource for FailingSource {
        fn display_count(&self) -> Result<usize> {
            Ok(1)
        }

        fn capture(&self, _index: usize) -> Result<PixelBuffer> {
            bail!("screen capture failed");
        }
    }

    fn set_pixel(data: &mut [u8], width: u32, x: u32, y: u32, color: Color) {
        let i = (y * width + x) as usize * BYTES_PER_PIXEL;
        data[i] = color.r;
        data[i + 1] = color.g;
        data[i + 2] = color.b;
    }

    fn black_frame(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_rgb(width, height, vec![0; (width * height) as usize * BYTES_PER_PIXEL])
            .unwrap()
    }

    /// Raw 300x300 frame with a 128px board (16px squares) at `origin`.
    fn board_frame_data(origin: (u32, u32)) -> Vec<u8> {
        let mut data = vec![0u8; 300 * 300 * BYTES_PER_PIXEL];
        for dy in 0..128 {
            for dx in 0..128 {
                let color = if ((dx / 16) + (dy / 16)) % 2 == 0 {
                    LIGHT
                } else {
                    DARK
                };
                set_pixel(&mut data, 300, origin.0 + dx, origin.1 + dy, color);
            }
        }
        data
    }

    fn frame_with_board(origin: (u32, u32)) -> PixelBuffer {
        PixelBuffer::from_rgb(300, 300, board_frame_data(origin)).unwrap()
    }

    /// Full-frame pixel the differ samples as the center of square (x, y),
    /// for a 16px-square board at `origin`.
    fn center_on_screen(origin: (u32, u32), x: u32, y: u32) -> (u32, u32) {
        let cx = (x as f64 * 16.0 + 8.0).round() as u32;
        let cy = (y as f64 * 16.0 + 16.0 * 0.73).round() as u32;
        (origin.0 + cx, origin.1 + cy)
    }

    fn params() -> ScanParams {
        ScanParams::new(LIGHT, DARK)
    }

    #[test]
    fn test_locate_board_takes_first_display_with_a_board() {
        let source = FakeSource::new(vec![black_frame(300, 300), frame_with_board((30, 40))]);
        let mut registry = BoardRegistry::new(source);

        let location = registry.locate_board(params()).unwrap().expect("not found");
        assert_eq!(
            location,
            BoardLocation {
                x: 30,
                y: 40,
                width: 128,
                height: 128
            }
        );
        assert!(registry.is_found());
        assert_eq!(registry.screen_index(), Some(1));
        assert_eq!(registry.location(), Some(location));
    }

    #[test]
    fn test_locate_board_not_found_anywhere() {
        let source = FakeSource::new(vec![black_frame(300, 300), black_frame(300, 300)]);
        let mut registry = BoardRegistry::new(source);

        assert_eq!(registry.locate_board(params()).unwrap(), None);
        assert!(!registry.is_found());
        assert_eq!(registry.screen_index(), None);
    }

    #[test]
    fn test_scan_attempt_clears_previous_board() {
        let source = FakeSource::new(vec![frame_with_board((30, 40))]);
        let mut registry = BoardRegistry::new(source.clone());
        registry.locate_board(params()).unwrap().expect("not found");

        source.set_frame(0, black_frame(300, 300));
        assert_eq!(registry.locate_board(params()).unwrap(), None);
        assert!(!registry.is_found());

        // the attempt colors survive a failed scan
        source.set_frame(0, frame_with_board((30, 40)));
        assert!(registry.relocate().unwrap().is_some());
    }

    #[test]
    fn test_changed_squares_and_refresh_cycle() {
        let origin = (30, 40);
        let source = FakeSource::new(vec![frame_with_board(origin)]);
        let mut registry = BoardRegistry::new(source.clone());
        registry.locate_board(params()).unwrap().expect("not found");

        // nothing moved yet
        assert!(registry.changed_squares().unwrap().is_empty());

        // a piece appears on square (2, 3)
        let mut data = board_frame_data(origin);
        let (px, py) = center_on_screen(origin, 2, 3);
        set_pixel(&mut data, 300, px, py, WHITE);
        source.set_frame(0, PixelBuffer::from_rgb(300, 300, data).unwrap());

        let changed = registry.changed_squares().unwrap();
        assert_eq!(changed, vec![SquareCoord { x: 2, y: 3 }]);

        // the diff is read-only: asking again reports the same squares
        assert_eq!(registry.changed_squares().unwrap(), changed);

        // committing the fresh state clears the diff
        registry.refresh_snapshot().unwrap();
        assert!(registry.changed_squares().unwrap().is_empty());
    }

    #[test]
    fn test_queries_without_board_are_safe_noops() {
        let source = FakeSource::new(vec![black_frame(300, 300)]);
        let mut registry = BoardRegistry::new(source);

        assert!(registry.changed_squares().unwrap().is_empty());
        registry.refresh_snapshot().unwrap();
        assert_eq!(registry.relocate().unwrap(), None);
    }

    #[test]
    fn test_relocate_reuses_stored_colors() {
        let source = FakeSource::new(vec![frame_with_board((30, 40))]);
        let mut registry = BoardRegistry::new(source.clone());
        registry.locate_board(params()).unwrap().expect("not found");

        source.set_frame(0, frame_with_board((100, 60)));
        let location = registry.relocate().unwrap().expect("not found after move");
        assert_eq!(
            location,
            BoardLocation {
                x: 100,
                y: 60,
                width: 128,
                height: 128
            }
        );
    }

    #[test]
    fn test_capture_failure_propagates() {
        let mut registry = BoardRegistry::new(FailingSource);
        let err = registry.locate_board(params()).unwrap_err();
        assert!(err.to_string().contains("screen capture failed"));
    }
}
