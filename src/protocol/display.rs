//! Geometry of the Lighthouse display.
//!
//! A display frame is a flat sequence of RGB triples, one per window, in
//! row-major order.

/// Number of window rows.
pub const LIGHTHOUSE_ROWS: usize = 14;
/// Number of windows per row.
pub const LIGHTHOUSE_COLS: usize = 28;
/// Total number of windows.
pub const LIGHTHOUSE_WINDOWS: usize = LIGHTHOUSE_ROWS * LIGHTHOUSE_COLS;
/// Bytes per window (red, green, blue).
pub const LIGHTHOUSE_COLOR_CHANNELS: usize = 3;
/// Size of one display frame in bytes.
pub const LIGHTHOUSE_FRAME_BYTES: usize = LIGHTHOUSE_WINDOWS * LIGHTHOUSE_COLOR_CHANNELS;

/// Byte offset of the window at (`row`, `col`) in a display frame.
///
/// Returns `None` outside the display.
#[must_use]
pub const fn window_offset(row: usize, col: usize) -> Option<usize> {
    if row >= LIGHTHOUSE_ROWS || col >= LIGHTHOUSE_COLS {
        return None;
    }
    Some((row * LIGHTHOUSE_COLS + col) * LIGHTHOUSE_COLOR_CHANNELS)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn frame_holds_every_window() {
        assert_eq!(LIGHTHOUSE_WINDOWS, 392);
        assert_eq!(LIGHTHOUSE_FRAME_BYTES, 1176);
    }

    #[rstest]
    #[case(0, 0, Some(0))]
    #[case(0, 1, Some(3))]
    #[case(1, 0, Some(84))]
    #[case(13, 27, Some(1173))]
    #[case(14, 0, None)]
    #[case(0, 28, None)]
    fn offsets_are_row_major(#[case] row: usize, #[case] col: usize, #[case] expected: Option<usize>) {
        assert_eq!(window_offset(row, col), expected);
    }
}
