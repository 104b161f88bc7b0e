//! Dithering algorithms for converting grayscale images to black-and-white.
//!
//! Three transforms are available and selected through [`DitherSettings`]:
//!
//! - **Invert**: `255 - v` for every sample, applied first when requested.
//! - **Floyd-Steinberg**: serpentine error diffusion. Even rows run left to
//!   right, odd rows right to left, and the weights mirror with the scan
//!   direction:
//!
//! ```text
//!            X   7/16          7/16  X
//!     3/16  5/16 1/16          1/16 5/16 3/16
//!       (even rows)              (odd rows)
//! ```
//!
//! - **Halftone**: the image is tiled into `cell_size` squares and each cell
//!   becomes one black dot whose radius grows with the cell's darkness.
//!
//! The pipeline always finishes with a hard threshold at 128 so the result
//! is a [`BinaryImage`] whatever algorithm ran.

use log::debug;

use crate::{
    error::{Error, Result},
    grayscale::GrayscaleBuffer,
    DEFAULT_CELL_SIZE,
};

/// Samples below this value are considered ink.
pub const THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Plain threshold, no spatial patterning.
    None,
    FloydSteinberg,
    Halftone,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::FloydSteinberg
    }
}

/// Dithering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherSettings {
    invert: bool,
    algorithm: Algorithm,
    cell_size: usize,
}

impl Default for DitherSettings {
    fn default() -> Self {
        DitherSettings {
            invert: false,
            algorithm: Algorithm::default(),
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl DitherSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert luminance before dithering.
    pub fn invert(self, invert: bool) -> Self {
        DitherSettings { invert, ..self }
    }

    pub fn algorithm(self, algorithm: Algorithm) -> Self {
        DitherSettings { algorithm, ..self }
    }

    /// Halftone cell edge in pixels. Ignored by the other algorithms.
    pub fn cell_size(self, cell_size: usize) -> Self {
        DitherSettings { cell_size, ..self }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cell_size == 0 {
            return Err(Error::InvalidConfig(
                "halftone cell size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The transforms to run, in order.
    pub fn ditherers(&self) -> Vec<Ditherer> {
        let mut steps = Vec::with_capacity(2);
        if self.invert {
            steps.push(Ditherer::Invert);
        }
        match self.algorithm {
            Algorithm::None => {}
            Algorithm::FloydSteinberg => steps.push(Ditherer::FloydSteinberg),
            Algorithm::Halftone => steps.push(Ditherer::Halftone {
                cell_size: self.cell_size,
            }),
        }
        steps
    }
}

/// One grayscale to grayscale transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ditherer {
    Invert,
    FloydSteinberg,
    Halftone { cell_size: usize },
}

impl Ditherer {
    pub fn apply(&self, mut gray: GrayscaleBuffer) -> GrayscaleBuffer {
        let (width, height) = (gray.width(), gray.height());
        match *self {
            Self::Invert => {
                invert(gray.as_mut_slice());
                gray
            }
            Self::FloydSteinberg => {
                floyd_steinberg(gray.as_mut_slice(), width, height);
                gray
            }
            Self::Halftone { cell_size } => {
                let out = halftone(gray.as_slice(), width, height, cell_size);
                // Same dimensions as the input, so this cannot fail.
                GrayscaleBuffer::new(width, height, out).unwrap_or(gray)
            }
        }
    }
}

pub fn invert(samples: &mut [u8]) {
    for v in samples.iter_mut() {
        *v = 255 - *v;
    }
}

/// Serpentine Floyd-Steinberg, in place. Every sample ends up 0 or 255.
pub fn floyd_steinberg(samples: &mut [u8], width: usize, height: usize) {
    debug_assert_eq!(samples.len(), width * height);
    let mut error = vec![0f32; samples.len()];

    for y in 0..height {
        let forward = y % 2 == 0;
        for step in 0..width {
            let x = if forward { step } else { width - 1 - step };
            let i = y * width + x;

            let old = (f32::from(samples[i]) + error[i]).clamp(0.0, 255.0);
            let new = if old < f32::from(THRESHOLD) { 0u8 } else { 255u8 };
            let diff = old - f32::from(new);
            samples[i] = new;

            let ahead = neighbour(x, width, forward);
            let behind = neighbour(x, width, !forward);

            if let Some(nx) = ahead {
                error[y * width + nx] += diff * 7.0 / 16.0;
            }
            if y + 1 < height {
                let below = (y + 1) * width;
                if let Some(nx) = ahead {
                    error[below + nx] += diff / 16.0;
                }
                error[below + x] += diff * 5.0 / 16.0;
                if let Some(px) = behind {
                    error[below + px] += diff * 3.0 / 16.0;
                }
            }
        }
    }
}

fn neighbour(x: usize, width: usize, forward: bool) -> Option<usize> {
    if forward {
        Some(x + 1).filter(|&nx| nx < width)
    } else {
        x.checked_sub(1)
    }
}

/// Dot radius for a cell of average luminance `avg`.
///
/// White gives 0, black gives `cell_size / 2`.
pub fn dot_radius(avg: f64, cell_size: usize) -> f64 {
    let half = cell_size as f64 / 2.0;
    ((1.0 - avg / 255.0) * half).clamp(0.0, half)
}

/// Amplitude-modulated halftone. Returns a new buffer, `src` is untouched.
pub fn halftone(src: &[u8], width: usize, height: usize, cell_size: usize) -> Vec<u8> {
    debug_assert_eq!(src.len(), width * height);
    let mut out = vec![255u8; src.len()];
    if cell_size == 0 {
        return out;
    }

    for y0 in (0..height).step_by(cell_size) {
        for x0 in (0..width).step_by(cell_size) {
            let x1 = x0.saturating_add(cell_size).min(width);
            let y1 = y0.saturating_add(cell_size).min(height);

            let mut sum = 0u64;
            for yy in y0..y1 {
                sum += src[yy * width + x0..yy * width + x1]
                    .iter()
                    .map(|&v| u64::from(v))
                    .sum::<u64>();
            }
            let count = ((x1 - x0) * (y1 - y0)) as f64;
            let radius = dot_radius(sum as f64 / count, cell_size);
            if radius <= 0.0 {
                continue;
            }

            let cx = x0 + (x1 - x0) / 2;
            let cy = y0 + (y1 - y0) / 2;
            let reach = radius.floor() as usize;
            let r2 = radius * radius;

            // Only visit the part of the disk that lies inside the image.
            let ys = cy.saturating_sub(reach)..=cy.saturating_add(reach).min(height - 1);
            let xs = cx.saturating_sub(reach)..=cx.saturating_add(reach).min(width - 1);
            for py in ys {
                let dy = py as f64 - cy as f64;
                for px in xs.clone() {
                    let dx = px as f64 - cx as f64;
                    if dx * dx + dy * dy <= r2 {
                        out[py * width + px] = 0;
                    }
                }
            }
        }
    }
    out
}

/// Grayscale image whose samples are all exactly 0 or 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BinaryImage {
    /// Hard threshold at [`THRESHOLD`].
    pub fn threshold(gray: GrayscaleBuffer) -> Self {
        let (width, height) = (gray.width(), gray.height());
        let mut data = gray.into_vec();
        for v in data.iter_mut() {
            *v = if *v < THRESHOLD { 0 } else { 255 };
        }
        BinaryImage {
            width,
            height,
            data,
        }
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

    /// `true` when the pixel at (x, y) should be printed black.
    pub fn is_ink(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] < THRESHOLD
    }

    /// Expand to opaque RGBA, R = G = B = sample.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.data.len() * 4);
        for &v in &self.data {
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
        rgba
    }
}

/// Grayscale conversion, optional inversion, dithering and final threshold.
pub fn process(
    width: usize,
    height: usize,
    rgba: &[u8],
    settings: &DitherSettings,
) -> Result<BinaryImage> {
    settings.validate()?;
    let mut gray = GrayscaleBuffer::from_rgba(width, height, rgba)?;

    for step in settings.ditherers() {
        debug!("{:?} on {}x{}", step, width, height);
        gray = step.apply(gray);
    }

    Ok(BinaryImage::threshold(gray))
}
