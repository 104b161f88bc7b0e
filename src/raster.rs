//! Bit packing for the ESC/POS `GS v 0` raster command.
//!
//! Rows are packed MSB first: column `x` of row `y` lives in byte
//! `y * bytes_per_row + x / 8` at bit `7 - x % 8`. A set bit prints black.
//! Padding bits at the end of a row are always zero.

use crate::{
    dither::{BinaryImage, THRESHOLD},
    error::{Error, Result},
    strip::Strip,
};

/// Packed 1-bit image ready to be sent as one or more raster commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBand {
    bytes_per_row: usize,
    row_count: usize,
    data: Vec<u8>,
}

impl RasterBand {
    fn pack(width: usize, height: usize, is_ink: impl Fn(usize, usize) -> bool) -> Self {
        let bytes_per_row = (width + 7) / 8;
        let mut data = vec![0u8; bytes_per_row * height];

        for y in 0..height {
            let row = &mut data[y * bytes_per_row..(y + 1) * bytes_per_row];
            for x in 0..width {
                if is_ink(x, y) {
                    row[x >> 3] |= 0x80 >> (x & 7);
                }
            }
        }

        RasterBand {
            bytes_per_row,
            row_count: height,
            data,
        }
    }

    pub fn encode(image: &BinaryImage) -> Self {
        Self::pack(image.width(), image.height(), |x, y| image.is_ink(x, y))
    }

    /// Encode a strip by its red channel.
    pub fn from_strip(strip: &Strip) -> Self {
        let width = strip.width();
        let pixels = strip.pixels();
        Self::pack(width, strip.height(), |x, y| {
            pixels[(y * width + x) * 4] < THRESHOLD
        })
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read back the bit for (x, y).
    pub fn bit(&self, x: usize, y: usize) -> bool {
        self.data[y * self.bytes_per_row + (x >> 3)] & (0x80 >> (x & 7)) != 0
    }

    /// Split into consecutive bands of at most `max_rows` rows.
    pub fn bands(&self, max_rows: usize) -> Result<Bands<'_>> {
        if max_rows == 0 {
            return Err(Error::InvalidConfig(
                "rows per band must be positive".to_string(),
            ));
        }
        if self.bytes_per_row > usize::from(u16::MAX) {
            return Err(Error::InvalidConfig(format!(
                "{} bytes per row does not fit a raster header",
                self.bytes_per_row
            )));
        }
        let max_rows = max_rows.min(usize::from(u16::MAX));
        Ok(Bands {
            bytes_per_row: self.bytes_per_row,
            chunks: self.data.chunks(self.bytes_per_row * max_rows),
        })
    }
}

/// Borrowed slice of rows of a [`RasterBand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSlice<'a> {
    pub bytes_per_row: u16,
    pub row_count: u16,
    pub data: &'a [u8],
}

pub struct Bands<'a> {
    bytes_per_row: usize,
    chunks: std::slice::Chunks<'a, u8>,
}

impl<'a> Iterator for Bands<'a> {
    type Item = BandSlice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.chunks.next()?;
        Some(BandSlice {
            bytes_per_row: self.bytes_per_row as u16,
            row_count: (data.len() / self.bytes_per_row) as u16,
            data,
        })
    }
}
