//! # ESC/POS Commands
//!
//! Byte sequences understood by ESC/POS compatible thermal printers. Only
//! the subset needed to print raster images is covered: reset, justification,
//! line feed, `GS v 0` raster images and paper cut.
//!
//! Multi-byte integers are **little-endian**: `u16` 0x1234 is sent as
//! `[0x34, 0x12]`.

use crate::transport::Align;

/// ESC (Escape) - command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - extended command prefix
pub const GS: u8 = 0x1D;

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and restores default modes.
pub fn reset() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Justification (ESC a n)
///
/// | n | Position |
/// |---|----------|
/// | 0 | left     |
/// | 1 | center   |
/// | 2 | right    |
pub fn align(align: Align) -> Vec<u8> {
    let n = match align {
        Align::Left => 0x00,
        Align::Center => 0x01,
        Align::Right => 0x02,
    };
    vec![ESC, b'a', n]
}

/// # Print and Feed n Lines (ESC d n)
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH)
///
/// Normal density (`m = 0`). Must be followed by exactly
/// `bytes_per_row * rows` bytes of packed bitmap.
pub fn raster_header(bytes_per_row: u16, rows: u16) -> Vec<u8> {
    let [xl, xh] = bytes_per_row.to_le_bytes();
    let [yl, yh] = rows.to_le_bytes();
    vec![GS, b'v', b'0', 0x00, xl, xh, yl, yh]
}

/// Cut commands, in the order they are tried.
///
/// Firmware disagrees on which `GS V` form it accepts, so the function A/B
/// forms (`GS V m`) and the feed-and-cut function B forms (`GS V m n`) are
/// both listed.
pub const CUT_CANDIDATES: [&[u8]; 4] = [
    &[GS, b'V', 0x42, 0x00], // feed and full cut
    &[GS, b'V', 0x42, 0x01], // feed and partial cut
    &[GS, b'V', 0x00],       // full cut
    &[GS, b'V', 0x01],       // partial cut
];
