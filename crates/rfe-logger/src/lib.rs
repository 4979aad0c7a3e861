//! RF Explorer Logger
//!
//! Command line front end for [`rfe_protocol`]: one-off sweeps written as
//! CSV rows, and band logging, where a wide band is split into chunks and
//! the strongest signal of each chunk is recorded per location.
//!
//! # Example
//!
//! ```rust,ignore
//! use rfe_logger::{sweep_band, BandLog, Location, LoggerConfig};
//!
//! let config = LoggerConfig::load("rfe.yaml".as_ref())?;
//! let plan = config.band.plan()?;
//! let mut log = BandLog::create(std::io::stdout(), &plan)?;
//! let band = sweep_band(&mut session, &plan, config.fallback_dbm)?;
//! log.write_row(Location { latitude: 44.97, longitude: -93.26 }, &band)?;
//! ```

pub mod band;
pub mod config;
pub mod error;
pub mod logfile;

pub use band::{sweep_band, sweep_band_until, BandPlan, BandSweep, ChunkReading, ChunkSweeper};
pub use config::{BandConfig, LoggerConfig, DEFAULT_PORT};
pub use error::{LoggerError, LoggerResult};
pub use logfile::{BandLog, Location};
