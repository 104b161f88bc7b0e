//! RGBA to luminance conversion.

use crate::error::{Error, Result};

/// Single channel 8-bit image, row-major, `width * height` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayscaleBuffer {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if data.len() != width * height {
            return Err(Error::InvalidConfig(format!(
                "grayscale buffer holds {} samples, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(GrayscaleBuffer {
            width,
            height,
            data,
        })
    }

    /// Convert an RGBA buffer using ITU-R BT.709 luma weights. Alpha is ignored.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8]) -> Result<Self> {
        check_dimensions(width, height)?;
        if rgba.len() != width * height * 4 {
            return Err(Error::InvalidConfig(format!(
                "RGBA buffer is {} bytes, expected {}x{}x4",
                rgba.len(),
                width,
                height
            )));
        }

        let data = rgba
            .chunks_exact(4)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();

        Ok(GrayscaleBuffer {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// `round(0.2126 R + 0.7152 G + 0.0722 B)`
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.2126 * f64::from(r) + 0.7152 * f64::from(g) + 0.0722 * f64::from(b);
    y.round().clamp(0.0, 255.0) as u8
}

pub(crate) fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidConfig(format!(
            "image dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(())
}
