//! Printable strips and page tesselation.
//!
//! A page wider than the printer head is cut into strips that are printed
//! one after another and glued together afterwards.

use crate::{
    dither::BinaryImage,
    error::{Error, Result},
    grayscale::check_dimensions,
};

/// One printable unit of a job: an RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strip {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Strip {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if pixels.len() != width * height * 4 {
            return Err(Error::InvalidConfig(format!(
                "strip holds {} bytes, expected {}x{}x4",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Strip {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

impl From<&BinaryImage> for Strip {
    fn from(image: &BinaryImage) -> Self {
        Strip {
            width: image.width(),
            height: image.height(),
            pixels: image.to_rgba(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Columns of `span` pixels, left to right.
    Vertical,
    /// Rows of `span` pixels, top to bottom, each turned 90 degrees
    /// counter-clockwise so it runs along the paper.
    Horizontal,
}

/// Cut `image` into strips of `span` pixels. The last strip may be narrower.
pub fn tesselate(image: &BinaryImage, span: usize, direction: Direction) -> Result<Vec<Strip>> {
    if span == 0 {
        return Err(Error::InvalidConfig("strip span must be positive".to_string()));
    }
    let (w, h) = (image.width(), image.height());
    let src = image.as_slice();

    let strips = match direction {
        Direction::Vertical => (0..w)
            .step_by(span)
            .map(|x0| {
                let x1 = (x0 + span).min(w);
                let mut pixels = Vec::with_capacity((x1 - x0) * h * 4);
                for y in 0..h {
                    for &v in &src[y * w + x0..y * w + x1] {
                        pixels.extend_from_slice(&[v, v, v, 255]);
                    }
                }
                Strip {
                    width: x1 - x0,
                    height: h,
                    pixels,
                }
            })
            .collect(),
        Direction::Horizontal => (0..h)
            .step_by(span)
            .map(|y0| {
                let rows = (y0 + span).min(h) - y0;
                // Rotated: new width is the band height, new height the page width.
                let mut pixels = Vec::with_capacity(rows * w * 4);
                for ny in 0..w {
                    let x = w - 1 - ny;
                    for nx in 0..rows {
                        let v = src[(y0 + nx) * w + x];
                        pixels.extend_from_slice(&[v, v, v, 255]);
                    }
                }
                Strip {
                    width: rows,
                    height: w,
                    pixels,
                }
            })
            .collect(),
    };
    Ok(strips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grayscale::GrayscaleBuffer;

    fn image(width: usize, height: usize, data: Vec<u8>) -> BinaryImage {
        BinaryImage::threshold(GrayscaleBuffer::new(width, height, data).unwrap())
    }

    fn red(strip: &Strip) -> Vec<u8> {
        strip.pixels().chunks(4).map(|px| px[0]).collect()
    }

    #[test]
    fn vertical_strips_cover_width() {
        let img = image(5, 2, vec![0, 255, 0, 255, 0, 255, 255, 0, 0, 0]);
        let strips = tesselate(&img, 2, Direction::Vertical).unwrap();
        assert_eq!(strips.len(), 3);
        assert_eq!(
            strips.iter().map(Strip::width).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
        assert!(strips.iter().all(|s| s.height() == 2));
        assert_eq!(red(&strips[0]), vec![0, 255, 255, 255]);
        assert_eq!(red(&strips[2]), vec![0, 0]);
    }

    #[test]
    fn horizontal_strips_are_rotated_counter_clockwise() {
        // 3x2:
        //   a b c
        //   d e f
        // rotated 90 ccw:
        //   c f
        //   b e
        //   a d
        let (a, b, c, d, e, f) = (0, 255, 0, 255, 255, 0);
        let img = image(3, 2, vec![a, b, c, d, e, f]);
        let strips = tesselate(&img, 2, Direction::Horizontal).unwrap();
        assert_eq!(strips.len(), 1);
        assert_eq!(strips[0].width(), 2);
        assert_eq!(strips[0].height(), 3);
        assert_eq!(red(&strips[0]), vec![c, f, b, e, a, d]);
    }

    #[test]
    fn zero_span_is_rejected() {
        let img = image(1, 1, vec![0]);
        assert!(tesselate(&img, 0, Direction::Vertical).is_err());
    }

    #[test]
    fn strip_checks_pixel_length() {
        assert!(Strip::new(2, 2, vec![0; 16]).is_ok());
        assert!(Strip::new(2, 2, vec![0; 12]).is_err());
    }
}
