//! Thermal strip printer driver
//!
//! This crate turns images into 1-bit raster data and prints them on ESC/POS
//! compatible thermal printers, one strip at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use thermal_strip::{
//!     dither, tesselate, Algorithm, DeviceFilter, Direction, DitherSettings, PrinterTransport,
//!     TransportConfig, UsbChannel,
//! };
//!
//! # fn main() -> thermal_strip::Result<()> {
//! let (width, height) = (1024, 768);
//! let rgba = vec![200u8; width * height * 4];
//!
//! let settings = DitherSettings::new().algorithm(Algorithm::FloydSteinberg);
//! let page = dither::process(width, height, &rgba, &settings)?;
//! let strips = tesselate(&page, 576, Direction::Vertical)?;
//!
//! let config = TransportConfig::new().pause(false);
//! let channel = UsbChannel::open(&DeviceFilter::new(0x04b8), config.get_endpoint())?;
//! let report = PrinterTransport::new(channel, config)?.print(&strips)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod dither;
mod error;
mod grayscale;
mod raster;
mod strip;
mod transport;
mod usb;
mod worker;

pub use crate::{
    dither::{Algorithm, BinaryImage, DitherSettings, Ditherer},
    error::{Command, Error, Result},
    grayscale::{luma, GrayscaleBuffer},
    raster::{BandSlice, Bands, RasterBand},
    strip::{tesselate, Direction, Strip},
    transport::{
        Align, Channel, JobOutcome, JobReport, PrinterTransport, State, TransportConfig, Warning,
    },
    usb::{DeviceFilter, UsbChannel},
    worker::{DitherWorker, PendingImage},
};

/// Largest single write of raster payload, in bytes.
///
/// Band payloads are cut at this size regardless of row boundaries.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Upper bound for `ESC d n` feeds.
pub const MAX_FEED_LINES: u8 = 20;

/// Upper bound for rows in one `GS v 0` command.
pub const MAX_ROWS_PER_BAND: u16 = 1024;

/// Halftone cell edge used when none is configured.
pub const DEFAULT_CELL_SIZE: usize = 8;
