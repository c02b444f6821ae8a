//! # Thermoline CLI
//!
//! Command-line interface for BLE thermal printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print a 128x100 black-and-white PNG
//! thermoline image picture.png
//!
//! # Print two lines of text
//! thermoline text "HELLO" "WORLD"
//!
//! # Print text records from a JSON file
//! thermoline text --records lines.json
//!
//! # Print the firmware test page
//! thermoline control test-page
//!
//! # Show the frames an image would produce without a printer
//! thermoline encode picture.png
//!
//! # Run any job against an in-memory transport
//! thermoline --dry-run text "HI"
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use thermoline::{
    PrintJob, PrintSequencer, PrinterConfig, ThermolineError, Transport,
    protocol::{
        Frame, commands,
        graphics::{self, Raster},
        text::{TEXT_BAND_DOTS, TextMode, TextRecord},
    },
    sequencer::LogObserver,
    transport::RecordingTransport,
};

/// Thermoline - BLE thermal printer utility
#[derive(Parser, Debug)]
#[command(name = "thermoline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Printer profile (JSON); defaults to the LINE Things printer
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Printer name or address to connect to (first found if omitted)
    #[arg(long, global = true)]
    device: Option<String>,

    /// Seconds to scan for printers
    #[arg(long, global = true, default_value = "5")]
    scan_secs: u64,

    /// Send frames to an in-memory transport and print them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log every frame
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a monochrome image file
    Image {
        /// Image file, already black and white at the printer's resolution
        path: PathBuf,
    },

    /// Print lines of text
    Text {
        /// One record per argument, placed on consecutive 8-dot rows
        lines: Vec<String>,

        /// Load records from a JSON array instead
        #[arg(long, value_name = "FILE", conflicts_with = "lines")]
        records: Option<PathBuf>,

        /// Row of the first line (must be a multiple of 8)
        #[arg(long, default_value = "0")]
        y: u16,

        /// Column of every line
        #[arg(long, default_value = "0")]
        x: u16,

        /// Font size hint
        #[arg(long, default_value = "0")]
        size: u8,

        /// Use TEXT_PRINT instead of TEXT_PRINTLN
        #[arg(long)]
        no_newline: bool,
    },

    /// Send a single control command
    Control {
        action: ControlAction,

        /// Lines to feed (for `feed`)
        #[arg(long, default_value = "1")]
        lines: u8,
    },

    /// Print the frames for an image as hex without sending them
    Encode { path: PathBuf },

    /// List printers in range
    Scan,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ControlAction {
    Reset,
    Test,
    TestPage,
    SetDefault,
    Wake,
    Sleep,
    Feed,
}

impl ControlAction {
    fn frame(self, lines: u8) -> Frame {
        match self {
            Self::Reset => commands::reset(),
            Self::Test => commands::test(),
            Self::TestPage => commands::test_page(),
            Self::SetDefault => commands::set_default(),
            Self::Wake => commands::wake(),
            Self::Sleep => commands::sleep(),
            Self::Feed => commands::feed(lines),
        }
    }
}

/// What to do once a transport is available.
enum Action {
    Job(PrintJob),
    Control(Frame),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "thermoline=debug" } else { "thermoline=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), ThermolineError> {
    let config = match &cli.config {
        Some(path) => PrinterConfig::from_json_file(path)?,
        None => PrinterConfig::default(),
    };

    let action = match cli.command {
        Commands::Encode { path } => {
            let raster = load_raster(&path, &config)?;
            for (y, row) in graphics::encode_rows(&raster).iter().enumerate() {
                for frame in row {
                    println!("{}: {}", y, frame);
                }
            }
            println!("{}", graphics::encode_flush(raster.height()));
            return Ok(());
        }
        Commands::Scan => return scan(cli.scan_secs, &config).await,
        Commands::Image { path } => Action::Job(PrintJob::Image(load_raster(&path, &config)?)),
        Commands::Text {
            lines,
            records,
            y,
            x,
            size,
            no_newline,
        } => {
            let records = match records {
                Some(path) => {
                    let contents = std::fs::read_to_string(&path)?;
                    serde_json::from_str(&contents).map_err(|e| {
                        ThermolineError::Config(format!(
                            "Failed to parse {}: {}",
                            path.display(),
                            e
                        ))
                    })?
                }
                None => {
                    let mode = if no_newline {
                        TextMode::Print
                    } else {
                        TextMode::Println
                    };
                    stack_lines(lines, x, y, size, mode)?
                }
            };
            Action::Job(PrintJob::Text(records))
        }
        Commands::Control { action, lines } => Action::Control(action.frame(lines)),
    };

    if cli.dry_run {
        let mut sequencer = PrintSequencer::with_config(RecordingTransport::new(), config);
        execute(&mut sequencer, action).await?;
        for frame in sequencer.transport().written() {
            println!("{}", Frame::from_bytes(frame).map(|f| f.to_string()).unwrap_or_default());
        }
        return Ok(());
    }

    connect_and_execute(cli.device.as_deref(), cli.scan_secs, config, action).await
}

async fn execute<T: Transport + 'static>(
    sequencer: &mut PrintSequencer<T>,
    action: Action,
) -> Result<(), ThermolineError> {
    match action {
        Action::Job(job) => {
            let report = sequencer.run_with(&job, &mut LogObserver::default()).await?;
            for skipped in &report.skipped {
                println!("Skipped record {}: {}", skipped.index, skipped.error);
            }
            println!(
                "Printed {} job ({} frames) on {}",
                report.kind,
                report.frames_written,
                sequencer.transport().device_id()
            );
        }
        Action::Control(frame) => {
            sequencer.send_control(frame).await?;
        }
    }
    Ok(())
}

/// One record per line, each on the next 8-dot band below `y`.
fn stack_lines(
    lines: Vec<String>,
    x: u16,
    y: u16,
    size: u8,
    mode: TextMode,
) -> Result<Vec<TextRecord>, ThermolineError> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| -> Result<TextRecord, ThermolineError> {
            let row = u16::try_from(i)
                .ok()
                .and_then(|i| i.checked_mul(TEXT_BAND_DOTS))
                .and_then(|offset| y.checked_add(offset))
                .ok_or_else(|| {
                    ThermolineError::Config(format!(
                        "line {} starting at row {} runs past row {}",
                        i + 1,
                        y,
                        u16::MAX
                    ))
                })?;
            Ok(TextRecord::new(line).at(x, row).font_size(size).mode(mode))
        })
        .collect()
}

fn load_raster(path: &Path, config: &PrinterConfig) -> Result<Raster, ThermolineError> {
    let raster = Raster::open(path)?;
    if raster.width() != config.width_dots as u32 || raster.height() != config.height_dots {
        return Err(ThermolineError::Config(format!(
            "{} is {}x{}, printer expects {}x{} (scale and dither it first)",
            path.display(),
            raster.width(),
            raster.height(),
            config.width_dots,
            config.height_dots
        )));
    }
    Ok(raster)
}

#[cfg(feature = "ble")]
async fn scan(scan_secs: u64, config: &PrinterConfig) -> Result<(), ThermolineError> {
    use std::time::Duration;
    use thermoline::transport::BleTransport;

    let found = BleTransport::scan(config, Duration::from_secs(scan_secs)).await?;
    if found.is_empty() {
        println!("No printers found.");
    }
    for printer in found {
        println!(
            "{}  {}  rssi {}",
            printer.id,
            printer.name.as_deref().unwrap_or("<unnamed>"),
            printer.rssi.map(|r| r.to_string()).unwrap_or_else(|| "?".into())
        );
    }
    Ok(())
}

#[cfg(feature = "ble")]
async fn connect_and_execute(
    device: Option<&str>,
    scan_secs: u64,
    config: PrinterConfig,
    action: Action,
) -> Result<(), ThermolineError> {
    use std::time::Duration;
    use thermoline::device::DeviceRegistry;
    use thermoline::transport::BleTransport;

    let scan_time = Duration::from_secs(scan_secs);
    let mut registry = DeviceRegistry::new();
    let found = BleTransport::scan(&config, scan_time).await?;
    for printer in &found {
        registry.discover(&printer.id, printer.name.clone(), printer.rssi);
    }

    let target = found
        .into_iter()
        .find(|d| match device {
            Some(wanted) => d.name.as_deref() == Some(wanted) || d.id == wanted,
            None => true,
        })
        .ok_or_else(|| ThermolineError::Config("no matching printer found".into()))?;

    let id = target.id.clone();
    registry.begin_connect(&id)?;
    let transport = match BleTransport::open(&config, target).await {
        Ok(transport) => {
            registry.mark_connected(&id)?;
            transport
        }
        Err(e) => {
            registry.mark_failed(&id)?;
            return Err(e);
        }
    };
    registry.require_connected(&id)?;

    let mut sequencer = PrintSequencer::with_config(transport, config);
    let result = execute(&mut sequencer, action).await;
    if let Err(e) = sequencer.transport().disconnect().await {
        tracing::warn!("{}", e);
    }
    registry.mark_disconnected(&id)?;
    result
}

#[cfg(not(feature = "ble"))]
async fn scan(_scan_secs: u64, _config: &PrinterConfig) -> Result<(), ThermolineError> {
    Err(no_ble())
}

#[cfg(not(feature = "ble"))]
async fn connect_and_execute(
    _device: Option<&str>,
    _scan_secs: u64,
    _config: PrinterConfig,
    _action: Action,
) -> Result<(), ThermolineError> {
    Err(no_ble())
}

#[cfg(not(feature = "ble"))]
fn no_ble() -> ThermolineError {
    ThermolineError::Config(
        "built without Bluetooth support; rebuild with --features ble or use --dry-run".into(),
    )
}
