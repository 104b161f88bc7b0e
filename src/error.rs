//! Error types for dithering and printing operations.
//!
//! This module defines all errors that can stop a print job, from invalid
//! settings detected before any device I/O to write failures on the channel.

use std::fmt;
use thiserror::Error;

/// Main error type for thermal strip operations.
///
/// Non-fatal conditions (a printer that accepts none of the cut commands,
/// a caller declining to continue between strips) are not errors; they are
/// reported through [`JobReport`](crate::JobReport) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Settings or image data that cannot be printed.
    ///
    /// Raised for malformed image dimensions, a zero halftone cell size or
    /// feed and band values outside the range the protocol accepts. Always
    /// detected before the first byte is sent to the device.
    #[error("Invalid settings: {0}")]
    InvalidConfig(String),

    /// The printer could not be found, opened or claimed.
    #[error("Device channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Device has no bulk OUT endpoint {0:#04x}")]
    MissingEndpoint(u8),

    /// A bulk transfer or device query failed inside rusb.
    #[error(transparent)]
    Usb(#[from] rusb::Error),

    #[error("Short write: {written} of {expected} bytes accepted")]
    ShortWrite { written: usize, expected: usize },

    /// A mandatory command could not be delivered.
    ///
    /// The job is aborted at this point; strips already sent stay printed.
    #[error("Failed to transmit {command}: {source}")]
    Transmission {
        command: Command,
        #[source]
        source: Box<Error>,
    },

    #[error("Dithering worker stopped before answering")]
    WorkerGone,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn transmission(command: Command, source: Error) -> Self {
        Self::Transmission {
            command,
            source: Box::new(source),
        }
    }
}

/// Identifies the mandatory command that failed in a [`Error::Transmission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    Align,
    PostStripFeed { strip: usize },
    PreCutFeed { strip: usize },
    RasterHeader { strip: usize, band: usize },
    RasterPayload { strip: usize, band: usize, offset: usize },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Align => write!(f, "alignment"),
            Self::PostStripFeed { strip } => write!(f, "feed after strip {}", strip + 1),
            Self::PreCutFeed { strip } => write!(f, "feed before cutting strip {}", strip + 1),
            Self::RasterHeader { strip, band } => {
                write!(f, "raster header (strip {}, band {})", strip + 1, band + 1)
            }
            Self::RasterPayload {
                strip,
                band,
                offset,
            } => write!(
                f,
                "raster payload (strip {}, band {}, offset {})",
                strip + 1,
                band + 1,
                offset
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
