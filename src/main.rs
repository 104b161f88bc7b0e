//! # thermal-strip
//!
//! ```bash
//! # Dither a poster into 72 mm strips and save them as PNG
//! thermal-strip split poster.jpg --width 1680 --strip-px 576 --out strips/
//!
//! # Print the same strips on an Epson TM printer, pausing between strips
//! thermal-strip print poster.jpg --width 1680 --vendor-id 0x04b8 --product-id 0x0202
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use thermal_strip::{
    tesselate, Algorithm, Align, DeviceFilter, Direction, DitherSettings, DitherWorker, Error,
    PrinterTransport, Result, Strip, TransportConfig, UsbChannel,
};

/// Dither images and print them as strips on ESC/POS thermal printers
#[derive(Parser, Debug)]
#[command(name = "thermal-strip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dither an image, cut it into strips and save them as PNG files
    Split {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output folder
        #[arg(long, default_value = "strips")]
        out: PathBuf,
    },
    /// Dither an image, cut it into strips and print them over USB
    Print {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// USB vendor id (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_id)]
        vendor_id: u16,

        /// USB product id (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_id)]
        product_id: Option<u16>,

        /// USB serial number
        #[arg(long)]
        serial: Option<String>,

        /// Bulk OUT endpoint number
        #[arg(long, default_value_t = 1)]
        endpoint: u8,

        /// Print all strips without asking between them
        #[arg(long)]
        no_pause: bool,

        /// Do not cut after each strip
        #[arg(long)]
        no_cut: bool,

        /// left, center or right
        #[arg(long, default_value = "left")]
        align: Align,

        /// Lines fed before cutting (0-20)
        #[arg(long, default_value_t = 3)]
        pre_cut_feed: u8,

        /// Lines fed after each strip (0-20)
        #[arg(long, default_value_t = 2)]
        post_strip_feed: u8,

        /// Rows per raster command (1-1024)
        #[arg(long, default_value_t = 256)]
        max_rows: u16,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Source image
    image: PathBuf,

    /// Resize to this many dots wide before dithering, keeping aspect ratio
    #[arg(long)]
    width: Option<u32>,

    /// Strip span in dots (72 mm at 8 dots/mm by default)
    #[arg(long, default_value_t = 576)]
    strip_px: usize,

    #[arg(long, value_enum, default_value_t = StripDirection::Vertical)]
    direction: StripDirection,

    #[arg(long, value_enum, default_value_t = Dither::Floyd)]
    dither: Dither,

    /// Halftone cell size in dots
    #[arg(long, default_value_t = thermal_strip::DEFAULT_CELL_SIZE)]
    cell: usize,

    /// Invert luminance before dithering
    #[arg(long)]
    invert: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StripDirection {
    Vertical,
    Horizontal,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Dither {
    Floyd,
    Halftone,
    None,
}

fn parse_id(s: &str) -> std::result::Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid USB id '{}': {}", s, err))
}

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Split { pipeline, out } => {
            let strips = prepare(&pipeline)?;
            save_strips(&strips, &out)
        }
        Commands::Print {
            pipeline,
            vendor_id,
            product_id,
            serial,
            endpoint,
            no_pause,
            no_cut,
            align,
            pre_cut_feed,
            post_strip_feed,
            max_rows,
        } => {
            let config = TransportConfig::new()
                .pause(!no_pause)
                .cut(!no_cut)
                .align(align)
                .endpoint(endpoint)
                .pre_cut_feed_lines(pre_cut_feed)
                .post_strip_feed_lines(post_strip_feed)
                .max_rows_per_band(max_rows);
            config.validate()?;

            let strips = prepare(&pipeline)?;

            let mut filter = DeviceFilter::new(vendor_id);
            if let Some(pid) = product_id {
                filter = filter.product_id(pid);
            }
            if let Some(serial) = serial {
                filter = filter.serial(serial);
            }

            let channel = UsbChannel::open(&filter, config.get_endpoint())?;
            let mut transport = PrinterTransport::new(channel, config)?;
            let report = transport.print_with(&strips, confirm)?;
            println!("{}", report);
            Ok(())
        }
    }
}

/// Load, resize, dither and tesselate the source image.
fn prepare(args: &PipelineArgs) -> Result<Vec<Strip>> {
    let mut img = image::open(&args.image)?.to_rgba8();
    if let Some(width) = args.width {
        let (w, h) = img.dimensions();
        let height = ((u64::from(h) * u64::from(width) + u64::from(w) / 2) / u64::from(w)).max(1);
        img = image::imageops::resize(
            &img,
            width,
            height as u32,
            image::imageops::FilterType::Lanczos3,
        );
    }
    let (w, h) = img.dimensions();
    info!("{} loaded as {}x{}", args.image.display(), w, h);

    let settings = DitherSettings::new()
        .invert(args.invert)
        .cell_size(args.cell)
        .algorithm(match args.dither {
            Dither::Floyd => Algorithm::FloydSteinberg,
            Dither::Halftone => Algorithm::Halftone,
            Dither::None => Algorithm::None,
        });

    let page = Strip::new(w as usize, h as usize, img.into_raw())?;
    let worker = DitherWorker::spawn()?;
    let binary = worker.submit(page, settings)?.wait()?;

    let direction = match args.direction {
        StripDirection::Vertical => Direction::Vertical,
        StripDirection::Horizontal => Direction::Horizontal,
    };
    let strips = tesselate(&binary, args.strip_px, direction)?;
    info!("{} strip(s) of {} dots", strips.len(), args.strip_px);
    Ok(strips)
}

fn save_strips(strips: &[Strip], out: &Path) -> Result<()> {
    std::fs::create_dir_all(out)?;
    for (idx, strip) in strips.iter().enumerate() {
        let path = out.join(format!("strip_{:02}.png", idx + 1));
        let buf = image::RgbaImage::from_raw(
            strip.width() as u32,
            strip.height() as u32,
            strip.pixels().to_vec(),
        )
        .ok_or_else(|| Error::InvalidConfig("strip buffer does not match its size".to_string()))?;
        buf.save(&path)?;
        println!("{}", path.display());
    }
    Ok(())
}

/// Ask on stdin whether to print the next strip.
fn confirm(done: usize, total: usize) -> bool {
    print!(
        "Strip {}/{} printed. Tear it off and continue? [Y/n] ",
        done, total
    );
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => !matches!(line.trim().to_lowercase().as_str(), "n" | "no"),
    }
}
