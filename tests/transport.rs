use pretty_assertions::assert_eq;
use thermal_strip::{
    command::CUT_CANDIDATES, Align, Channel, Command, Error, JobOutcome, PrinterTransport,
    Result, Strip, TransportConfig, Warning,
};

/// In-memory channel recording every attempted write. Writes for which
/// `reject` returns true fail with a pipe error.
struct ScriptedChannel {
    attempts: Vec<Vec<u8>>,
    reject: Box<dyn FnMut(&[u8]) -> bool>,
}

impl ScriptedChannel {
    fn accepting() -> Self {
        Self::rejecting(|_| false)
    }

    fn rejecting(reject: impl FnMut(&[u8]) -> bool + 'static) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        ScriptedChannel {
            attempts: Vec::new(),
            reject: Box::new(reject),
        }
    }

    fn cut_attempts(&self) -> usize {
        self.attempts.iter().filter(|w| is_cut(w)).count()
    }
}

impl Channel for ScriptedChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.attempts.push(data.to_vec());
        if (self.reject)(data) {
            Err(Error::Usb(rusb::Error::Pipe))
        } else {
            Ok(())
        }
    }
}

fn is_cut(data: &[u8]) -> bool {
    CUT_CANDIDATES.iter().any(|c| *c == data)
}

fn solid_strip(width: usize, height: usize, level: u8) -> Strip {
    let pixels = (0..width * height)
        .flat_map(|_| vec![level, level, level, 255])
        .collect();
    Strip::new(width, height, pixels).unwrap()
}

fn no_pause() -> TransportConfig {
    TransportConfig::new().pause(false)
}

#[test]
fn black_square_job_byte_stream() {
    let mut channel = ScriptedChannel::accepting();
    let report = PrinterTransport::new(&mut channel, no_pause().align(Align::Center))
        .unwrap()
        .print(&[solid_strip(16, 16, 0)])
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.strips_printed, 1);
    assert!(report.warnings.is_empty());
    assert_eq!(
        channel.attempts,
        vec![
            vec![0x1B, 0x40],
            vec![0x1B, 0x61, 0x01],
            vec![0x1D, 0x76, 0x30, 0x00, 0x02, 0x00, 0x10, 0x00],
            vec![0xFF; 32],
            vec![0x1B, 0x64, 0x02],
            vec![0x1B, 0x64, 0x03],
            vec![0x1D, 0x56, 0x42, 0x00],
        ]
    );
}

#[test]
fn zero_feeds_and_no_cut_emit_nothing_after_raster() {
    let mut channel = ScriptedChannel::accepting();
    let config = no_pause()
        .cut(false)
        .pre_cut_feed_lines(0)
        .post_strip_feed_lines(0);
    PrinterTransport::new(&mut channel, config)
        .unwrap()
        .print(&[solid_strip(8, 1, 255)])
        .unwrap();

    assert_eq!(channel.attempts.len(), 4);
    assert_eq!(channel.attempts[3], vec![0x00]);
}

#[test]
fn cut_falls_back_to_last_candidate() {
    let last = CUT_CANDIDATES[3];
    let mut channel = ScriptedChannel::rejecting(move |data| is_cut(data) && data != last);
    let report = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 8, 0)])
        .unwrap();

    assert!(report.is_complete());
    assert!(report.warnings.is_empty());
    assert_eq!(channel.cut_attempts(), 4);
    assert_eq!(channel.attempts.last().unwrap().as_slice(), last);
}

#[test]
fn unsupported_cut_is_a_warning() {
    let mut channel = ScriptedChannel::rejecting(is_cut);
    let report = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 2, 0), solid_strip(8, 2, 0)])
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.strips_printed, 2);
    assert_eq!(
        report.warnings,
        vec![
            Warning::CutUnsupported { strip: 0 },
            Warning::CutUnsupported { strip: 1 }
        ]
    );
    assert_eq!(channel.cut_attempts(), 8);
}

#[test]
fn tall_strip_is_split_into_bands() {
    let mut channel = ScriptedChannel::accepting();
    PrinterTransport::new(&mut channel, no_pause().cut(false).max_rows_per_band(256))
        .unwrap()
        .print(&[solid_strip(24, 600, 0)])
        .unwrap();

    let headers: Vec<&Vec<u8>> = channel
        .attempts
        .iter()
        .filter(|w| w.starts_with(&[0x1D, 0x76, 0x30, 0x00]))
        .collect();
    let rows: Vec<u16> = headers
        .iter()
        .map(|h| u16::from_le_bytes([h[6], h[7]]))
        .collect();
    assert_eq!(rows, vec![256, 256, 88]);
    assert!(headers.iter().all(|h| h[4] == 3 && h[5] == 0));
    assert_eq!(rows.iter().map(|&r| usize::from(r)).sum::<usize>(), 600);
}

#[test]
fn band_payload_is_sent_in_16k_chunks() {
    let mut channel = ScriptedChannel::accepting();
    // 72 bytes per row * 600 rows = 43200 bytes in one band
    PrinterTransport::new(&mut channel, no_pause().cut(false).max_rows_per_band(1024))
        .unwrap()
        .print(&[solid_strip(576, 600, 0)])
        .unwrap();

    let sizes: Vec<usize> = channel.attempts[3..6].iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![16384, 16384, 10432]);
    assert_eq!(
        channel.attempts[2],
        vec![0x1D, 0x76, 0x30, 0x00, 72, 0x00, 0x58, 0x02]
    );
}

#[test]
fn payload_failure_aborts_job() {
    let mut channel = ScriptedChannel::rejecting(|data| data.len() == 16384);
    let err = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(576, 600, 0), solid_strip(8, 8, 0)])
        .unwrap_err();

    match err {
        Error::Transmission { command, .. } => assert_eq!(
            command,
            Command::RasterPayload {
                strip: 0,
                band: 0,
                offset: 0
            }
        ),
        other => panic!("unexpected error {:?}", other),
    }
    // reset, align, first header, failed chunk; nothing after
    assert_eq!(channel.attempts.len(), 4);
}

#[test]
fn reset_failure_is_fatal() {
    let mut channel = ScriptedChannel::rejecting(|data| data == [0x1B, 0x40]);
    let err = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 8, 0)])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transmission {
            command: Command::Reset,
            ..
        }
    ));
    assert_eq!(channel.attempts.len(), 1);
}

#[test]
fn declining_at_pause_stops_remaining_strips() {
    let mut channel = ScriptedChannel::accepting();
    let mut asked = 0;
    let report = PrinterTransport::new(&mut channel, TransportConfig::new())
        .unwrap()
        .print_with(
            &[solid_strip(8, 1, 0), solid_strip(8, 1, 0), solid_strip(8, 1, 0)],
            |done, total| {
                asked += 1;
                assert_eq!((done, total), (1, 3));
                false
            },
        )
        .unwrap();

    assert_eq!(asked, 1);
    assert_eq!(report.strips_printed, 1);
    assert_eq!(report.outcome, JobOutcome::Aborted { after_strip: 1 });
    let headers = channel
        .attempts
        .iter()
        .filter(|w| w.starts_with(&[0x1D, 0x76, 0x30]))
        .count();
    assert_eq!(headers, 1);
}

#[test]
fn strips_complete_in_order() {
    let mut channel = ScriptedChannel::accepting();
    PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 1, 0), solid_strip(16, 1, 0)])
        .unwrap();

    let first_cut = channel.attempts.iter().position(|w| is_cut(w)).unwrap();
    let second_header = channel
        .attempts
        .iter()
        .position(|w| w.starts_with(&[0x1D, 0x76, 0x30, 0x00, 0x02]))
        .unwrap();
    assert!(first_cut < second_header);
    // init and align are sent once per job
    assert_eq!(
        channel
            .attempts
            .iter()
            .filter(|w| w.as_slice() == [0x1B, 0x40])
            .count(),
        1
    );
}

#[test]
fn oversized_row_is_rejected_before_io() {
    let mut channel = ScriptedChannel::accepting();
    let wide = solid_strip(65536 * 8 + 1, 1, 255);
    let err = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[wide])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(channel.attempts.is_empty());
}

fn failed_command(err: Error) -> Command {
    match err {
        Error::Transmission { command, .. } => command,
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn align_failure_is_fatal() {
    let mut channel = ScriptedChannel::rejecting(|data| data.starts_with(&[0x1B, 0x61]));
    let err = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 8, 0)])
        .unwrap_err();
    assert_eq!(failed_command(err), Command::Align);
    assert_eq!(channel.attempts.len(), 2);
}

#[test]
fn header_failure_names_strip_and_band() {
    // Second header overall is the first band of the second strip.
    let mut headers = 0;
    let mut channel = ScriptedChannel::rejecting(move |data| {
        if data.starts_with(&[0x1D, 0x76, 0x30, 0x00]) {
            headers += 1;
            headers == 2
        } else {
            false
        }
    });
    let err = PrinterTransport::new(&mut channel, no_pause().max_rows_per_band(4))
        .unwrap()
        .print(&[solid_strip(8, 4, 0), solid_strip(8, 12, 0)])
        .unwrap_err();

    assert_eq!(
        failed_command(err),
        Command::RasterHeader { strip: 1, band: 0 }
    );
    assert!(channel
        .attempts
        .last()
        .unwrap()
        .starts_with(&[0x1D, 0x76, 0x30, 0x00]));
}

#[test]
fn post_strip_feed_failure_is_fatal() {
    let mut channel = ScriptedChannel::rejecting(|data| data == [0x1B, 0x64, 0x02]);
    let err = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 1, 0), solid_strip(8, 1, 0)])
        .unwrap_err();

    assert_eq!(failed_command(err), Command::PostStripFeed { strip: 0 });
    // reset, align, header, payload, failed feed
    assert_eq!(channel.attempts.len(), 5);
    assert_eq!(channel.cut_attempts(), 0);
}

#[test]
fn pre_cut_feed_failure_is_fatal() {
    let mut channel = ScriptedChannel::rejecting(|data| data == [0x1B, 0x64, 0x03]);
    let err = PrinterTransport::new(&mut channel, no_pause())
        .unwrap()
        .print(&[solid_strip(8, 1, 0), solid_strip(8, 1, 0)])
        .unwrap_err();

    assert_eq!(failed_command(err), Command::PreCutFeed { strip: 0 });
    assert_eq!(
        channel.attempts.last().unwrap().as_slice(),
        &[0x1B, 0x64, 0x03]
    );
    assert_eq!(channel.attempts.len(), 6);
    assert_eq!(channel.cut_attempts(), 0);
}

#[test]
fn zero_pre_cut_feed_cuts_right_after_post_strip_feed() {
    let mut channel = ScriptedChannel::accepting();
    PrinterTransport::new(&mut channel, no_pause().cut(true).pre_cut_feed_lines(0))
        .unwrap()
        .print(&[solid_strip(8, 1, 0)])
        .unwrap();

    assert_eq!(
        channel.attempts[4..].to_vec(),
        vec![vec![0x1B, 0x64, 0x02], CUT_CANDIDATES[0].to_vec()]
    );
}
