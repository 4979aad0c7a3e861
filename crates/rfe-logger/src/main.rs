//! rfe-logger: sweep and log with an RF Explorer analyzer.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use rfe_logger::{sweep_band_until, BandLog, Location, LoggerConfig, LoggerResult};
use rfe_protocol::{
    available_ports, csv_file_name, write_csv, ProtocolSession, RfeError, SerialTransport,
    SweepResult,
};

#[derive(Parser, Debug)]
#[command(name = "rfe-logger", version, about = "RF Explorer sweeps and band logging")]
struct Cli {
    /// Serial device of the analyzer (overrides the config file).
    #[arg(long, short, global = true)]
    port: Option<String>,

    /// YAML config file.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log protocol traffic at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports.
    Ports,
    /// Take the first frame of a new sweep configuration.
    Quick {
        start_khz: u32,
        end_khz: u32,
        /// CSV file to write instead of stdout.
        #[arg(long, short)]
        output: Option<String>,
    },
    /// Max-hold sweep for a number of seconds.
    Timed {
        start_khz: u32,
        end_khz: u32,
        secs: u64,
        /// CSV file to write instead of stdout.
        #[arg(long, short)]
        output: Option<String>,
    },
    /// Log chunk maxima across the configured band until Ctrl-C.
    Log {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Stop after this many band passes.
        #[arg(long)]
        passes: Option<u32>,
        /// Log file (defaults to a timestamped name).
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long)]
        start_khz: Option<u32>,
        #[arg(long)]
        end_khz: Option<u32>,
        #[arg(long)]
        chunk_khz: Option<u32>,
        #[arg(long)]
        dwell_secs: Option<u64>,
        /// Amplitude recorded for chunks that deliver no data.
        #[arg(long, allow_negative_numbers = true)]
        fallback_dbm: Option<i32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> LoggerResult<()> {
    let mut config = match &cli.config {
        Some(path) => LoggerConfig::load(path)?,
        None => LoggerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command {
        Command::Ports => {
            let ports = available_ports().map_err(RfeError::from)?;
            if ports.is_empty() {
                warn!("no serial ports found");
            }
            for port in ports {
                println!("{}", port);
            }
            Ok(())
        }
        Command::Quick {
            start_khz,
            end_khz,
            output,
        } => {
            let mut session = connect(&config)?;
            let result = session.quick_sweep(start_khz, end_khz)?;
            emit(&result, output.as_deref())?;
            session.disconnect()?;
            Ok(())
        }
        Command::Timed {
            start_khz,
            end_khz,
            secs,
            output,
        } => {
            let mut session = connect(&config)?;
            let result = session.timed_sweep(start_khz, end_khz, Duration::from_secs(secs))?;
            emit(&result, output.as_deref())?;
            session.disconnect()?;
            Ok(())
        }
        Command::Log {
            lat,
            lon,
            passes,
            output,
            start_khz,
            end_khz,
            chunk_khz,
            dwell_secs,
            fallback_dbm,
        } => {
            let band = &mut config.band;
            band.start_khz = start_khz.unwrap_or(band.start_khz);
            band.end_khz = end_khz.unwrap_or(band.end_khz);
            band.chunk_khz = chunk_khz.unwrap_or(band.chunk_khz);
            band.dwell_secs = dwell_secs.unwrap_or(band.dwell_secs);
            if fallback_dbm.is_some() {
                config.fallback_dbm = fallback_dbm;
            }
            let location = Location {
                latitude: lat,
                longitude: lon,
            };
            log_band(&config, location, passes, output)
        }
    }
}

fn connect(config: &LoggerConfig) -> LoggerResult<ProtocolSession<SerialTransport>> {
    let settings = &config.session;
    let transport = SerialTransport::open_with(&config.port, settings.baud_rate, settings.read_timeout)
        .map_err(RfeError::from)?;
    let mut session = ProtocolSession::new(transport, settings.clone());
    let setup = session.initialize()?;

    match &setup.device {
        Some(device) => info!(
            "Connected to {} (model {}, expansion {}, firmware {})",
            config.port, device.main_model, device.expansion_model, device.firmware
        ),
        None => info!("Connected to {} ({})", config.port, setup.raw_info),
    }
    debug!(
        "device plan: {} Hz + {} Hz steps",
        setup.plan.start_hz(),
        setup.plan.step_hz()
    );
    Ok(session)
}

fn emit(result: &SweepResult, output: Option<&str>) -> LoggerResult<()> {
    match output {
        Some(name) => {
            let path = csv_file_name(name);
            let mut file = File::create(&path)?;
            write_csv(&mut file, result)?;
            info!("Wrote {} rows to {}", result.len(), path);
        }
        None => write_csv(&mut io::stdout().lock(), result)?,
    }
    Ok(())
}

fn log_band(
    config: &LoggerConfig,
    location: Location,
    passes: Option<u32>,
    output: Option<PathBuf>,
) -> LoggerResult<()> {
    let plan = config.band.plan()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))?;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(chrono::Local::now().format("rfe-%Y%m%d-%H%M%S.csv").to_string())
    });
    let mut log = BandLog::create(BufWriter::new(File::create(&path)?), &plan)?;
    info!(
        "Logging {} chunks of {} kHz to {}",
        plan.chunk_starts().len(),
        plan.chunk_khz,
        path.display()
    );

    let mut session = connect(config)?;
    while running.load(Ordering::SeqCst) && passes.map_or(true, |n| (log.rows() as u32) < n) {
        let stopped = || !running.load(Ordering::SeqCst);
        let Some(band) = sweep_band_until(&mut session, &plan, config.fallback_dbm, stopped)? else {
            break;
        };
        if band.fallback_count() > 0 {
            warn!("{} chunks used the fallback amplitude", band.fallback_count());
        }
        log.write_row(location, &band)?;
        info!("Pass {} written", log.rows());
    }
    if !running.load(Ordering::SeqCst) {
        info!("Interrupted, stopping after {} passes", log.rows());
    }

    session.disconnect()?;
    Ok(())
}
