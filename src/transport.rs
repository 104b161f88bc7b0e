//! Print job state machine.
//!
//! A job moves through `Closed -> Initialized -> Aligned`, then for every
//! strip through one `StreamingBand` state per raster band and a
//! `StripDone` state, and ends in `Finished`. Every write blocks until the
//! channel accepted it, so commands never overlap and strip N (including
//! its cut) is complete before strip N+1 starts.

use log::{debug, info, warn};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::{
    command,
    error::{Command, Error, Result},
    raster::RasterBand,
    strip::Strip,
    CHUNK_SIZE, MAX_FEED_LINES, MAX_ROWS_PER_BAND,
};

/// An open, ready byte channel to the printer.
///
/// `write` returns once the whole buffer has been accepted or fails.
pub trait Channel {
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Default for Align {
    fn default() -> Self {
        Self::Left
    }
}

impl FromStr for Align {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(format!("unknown alignment '{}', use left, center or right", s)),
        }
    }
}

/// Job configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pause: bool,
    cut: bool,
    align: Align,
    endpoint: u8,
    pre_cut_feed_lines: u8,
    post_strip_feed_lines: u8,
    max_rows_per_band: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            pause: true,
            cut: true,
            align: Align::Left,
            endpoint: 1,
            pre_cut_feed_lines: 3,
            post_strip_feed_lines: 2,
            max_rows_per_band: 256,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the continuation hook before every strip but the first.
    pub fn pause(self, pause: bool) -> Self {
        TransportConfig { pause, ..self }
    }

    /// Cut the paper after every strip.
    pub fn cut(self, cut: bool) -> Self {
        TransportConfig { cut, ..self }
    }

    pub fn align(self, align: Align) -> Self {
        TransportConfig { align, ..self }
    }

    /// USB bulk OUT endpoint number.
    pub fn endpoint(self, endpoint: u8) -> Self {
        TransportConfig { endpoint, ..self }
    }

    pub fn pre_cut_feed_lines(self, lines: u8) -> Self {
        TransportConfig {
            pre_cut_feed_lines: lines,
            ..self
        }
    }

    pub fn post_strip_feed_lines(self, lines: u8) -> Self {
        TransportConfig {
            post_strip_feed_lines: lines,
            ..self
        }
    }

    /// Rows per `GS v 0` command. Some printers have small raster buffers.
    pub fn max_rows_per_band(self, rows: u16) -> Self {
        TransportConfig {
            max_rows_per_band: rows,
            ..self
        }
    }

    pub fn get_endpoint(&self) -> u8 {
        self.endpoint
    }

    pub fn validate(&self) -> Result<()> {
        if self.pre_cut_feed_lines > MAX_FEED_LINES {
            return Err(Error::InvalidConfig(format!(
                "pre-cut feed of {} lines exceeds {}",
                self.pre_cut_feed_lines, MAX_FEED_LINES
            )));
        }
        if self.post_strip_feed_lines > MAX_FEED_LINES {
            return Err(Error::InvalidConfig(format!(
                "post-strip feed of {} lines exceeds {}",
                self.post_strip_feed_lines, MAX_FEED_LINES
            )));
        }
        if self.max_rows_per_band == 0 || self.max_rows_per_band > MAX_ROWS_PER_BAND {
            return Err(Error::InvalidConfig(format!(
                "rows per band must be within 1..={}, got {}",
                MAX_ROWS_PER_BAND, self.max_rows_per_band
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Initialized,
    Aligned,
    StreamingBand { strip: usize, band: usize },
    StripDone { strip: usize },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The continuation hook declined after `after_strip` strips.
    Aborted { after_strip: usize },
}

/// Non-fatal problems met while printing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    #[error("printer accepted none of the cut commands after strip {}", .strip + 1)]
    CutUnsupported { strip: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub strips_printed: usize,
    pub outcome: JobOutcome,
    pub warnings: Vec<Warning>,
}

impl JobReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == JobOutcome::Completed
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            JobOutcome::Completed => write!(f, "{} strip(s) printed", self.strips_printed)?,
            JobOutcome::Aborted { after_strip } => {
                write!(f, "aborted after {} strip(s)", after_strip)?
            }
        }
        for warning in &self.warnings {
            write!(f, "; warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Owns the printer channel for the duration of a job.
pub struct PrinterTransport<C: Channel> {
    channel: C,
    config: TransportConfig,
    state: State,
}

impl<C: Channel> PrinterTransport<C> {
    pub fn new(channel: C, config: TransportConfig) -> Result<Self> {
        config.validate()?;
        Ok(PrinterTransport {
            channel,
            config,
            state: State::Closed,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Print all strips without stopping between them.
    pub fn print(&mut self, strips: &[Strip]) -> Result<JobReport> {
        self.print_with(strips, |_, _| true)
    }

    /// Print all strips. When `pause` is set, `proceed(done, total)` is called
    /// between strips; returning `false` ends the job early.
    pub fn print_with<F>(&mut self, strips: &[Strip], mut proceed: F) -> Result<JobReport>
    where
        F: FnMut(usize, usize) -> bool,
    {
        // Encode everything first so bad input never reaches the device.
        let max_rows = usize::from(self.config.max_rows_per_band);
        let rasters = strips.iter().map(RasterBand::from_strip).collect::<Vec<_>>();
        for raster in &rasters {
            raster.bands(max_rows)?;
        }

        info!("print job: {} strip(s), {:?}", strips.len(), self.config);
        self.state = State::Closed;

        self.send(&command::reset(), Command::Reset)?;
        self.state = State::Initialized;

        self.send(&command::align(self.config.align), Command::Align)?;
        self.state = State::Aligned;

        let total = rasters.len();
        let mut report = JobReport {
            strips_printed: 0,
            outcome: JobOutcome::Completed,
            warnings: Vec::new(),
        };

        for (strip, raster) in rasters.iter().enumerate() {
            info!("printing strip {}/{}", strip + 1, total);
            self.stream_strip(strip, raster, max_rows)?;

            if self.config.post_strip_feed_lines > 0 {
                self.send(
                    &command::feed_lines(self.config.post_strip_feed_lines),
                    Command::PostStripFeed { strip },
                )?;
            }
            if self.config.cut && !self.cut(strip)? {
                report.warnings.push(Warning::CutUnsupported { strip });
            }

            self.state = State::StripDone { strip };
            report.strips_printed += 1;

            if self.config.pause && strip + 1 < total && !proceed(strip + 1, total) {
                info!("job aborted after strip {}/{}", strip + 1, total);
                report.outcome = JobOutcome::Aborted {
                    after_strip: strip + 1,
                };
                break;
            }
        }

        self.state = State::Finished;
        Ok(report)
    }

    fn stream_strip(&mut self, strip: usize, raster: &RasterBand, max_rows: usize) -> Result<()> {
        for (band, slice) in raster.bands(max_rows)?.enumerate() {
            self.state = State::StreamingBand { strip, band };
            debug!(
                "band {}: {} bytes/row x {} rows",
                band, slice.bytes_per_row, slice.row_count
            );
            self.send(
                &command::raster_header(slice.bytes_per_row, slice.row_count),
                Command::RasterHeader { strip, band },
            )?;

            for (n, chunk) in slice.data.chunks(CHUNK_SIZE).enumerate() {
                self.send(
                    chunk,
                    Command::RasterPayload {
                        strip,
                        band,
                        offset: n * CHUNK_SIZE,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Pre-cut feed, then the first cut candidate the printer accepts.
    /// Returns `false` when none was accepted.
    fn cut(&mut self, strip: usize) -> Result<bool> {
        if self.config.pre_cut_feed_lines > 0 {
            self.send(
                &command::feed_lines(self.config.pre_cut_feed_lines),
                Command::PreCutFeed { strip },
            )?;
        }

        for candidate in command::CUT_CANDIDATES.iter() {
            match self.channel.write(candidate) {
                Ok(()) => {
                    debug!("cut accepted: {:02X?}", candidate);
                    return Ok(true);
                }
                Err(err) => debug!("cut {:02X?} rejected: {}", candidate, err),
            }
        }
        warn!("no cut command accepted after strip {}", strip + 1);
        Ok(false)
    }

    fn send(&mut self, data: &[u8], command: Command) -> Result<()> {
        self.channel
            .write(data)
            .map_err(|err| Error::transmission(command, err))
    }
}
