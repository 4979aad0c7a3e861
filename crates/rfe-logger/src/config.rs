//! Logger configuration loaded from YAML.
//!
//! ```yaml
//! port: /dev/ttyUSB0
//! fallback_dbm: -120
//! band:
//!   start_khz: 100000
//!   end_khz: 2700000
//!   chunk_khz: 100000
//!   dwell_secs: 5
//! session:
//!   settle_delay: 250
//!   max_handshake_attempts: 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rfe_protocol::SessionConfig;

use crate::band::BandPlan;
use crate::error::{LoggerError, LoggerResult};

/// Default serial device.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Everything the logger needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Serial device of the analyzer.
    pub port: String,
    /// Session timing and retry settings.
    pub session: SessionConfig,
    /// Band split into chunks for logging.
    pub band: BandConfig,
    /// Amplitude recorded for a chunk whose sweep keeps failing.
    pub fallback_dbm: Option<i32>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            port: DEFAULT_PORT.to_string(),
            session: SessionConfig::default(),
            band: BandConfig::default(),
            fallback_dbm: None,
        }
    }
}

impl LoggerConfig {
    /// Load a config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> LoggerResult<LoggerConfig> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse config text.
    pub fn from_yaml(text: &str) -> LoggerResult<LoggerConfig> {
        let config: LoggerConfig = serde_yaml::from_str(text)?;
        config.band.plan()?;
        Ok(config)
    }
}

/// Band window for logging, in kHz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// First frequency of the band.
    pub start_khz: u32,
    /// End of the band.
    pub end_khz: u32,
    /// Width of each chunk swept on its own.
    pub chunk_khz: u32,
    /// Seconds of max-hold per chunk.
    pub dwell_secs: u64,
}

impl Default for BandConfig {
    fn default() -> Self {
        BandConfig {
            start_khz: 100_000,
            end_khz: 2_700_000,
            chunk_khz: 100_000,
            dwell_secs: 5,
        }
    }
}

impl BandConfig {
    /// Validate and turn into a [`BandPlan`].
    pub fn plan(&self) -> LoggerResult<BandPlan> {
        if self.chunk_khz == 0 {
            return Err(LoggerError::Config("chunk_khz must be positive".to_string()));
        }
        if self.end_khz < self.start_khz + self.chunk_khz {
            return Err(LoggerError::Config(format!(
                "band {}-{} kHz is narrower than one {} kHz chunk",
                self.start_khz, self.end_khz, self.chunk_khz
            )));
        }
        Ok(BandPlan {
            start_khz: self.start_khz,
            end_khz: self.end_khz,
            chunk_khz: self.chunk_khz,
            dwell: Duration::from_secs(self.dwell_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.band.start_khz, 100_000);
        assert_eq!(config.band.end_khz, 2_700_000);
        assert_eq!(config.band.chunk_khz, 100_000);
        assert_eq!(config.band.dwell_secs, 5);
        assert_eq!(config.fallback_dbm, None);
    }

    #[test]
    fn test_partial_yaml() {
        let config = LoggerConfig::from_yaml(
            "port: /dev/ttyACM0\nfallback_dbm: -120\nband:\n  dwell_secs: 2\nsession:\n  settle_delay: 0\n",
        )
        .unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.fallback_dbm, Some(-120));
        assert_eq!(config.band.dwell_secs, 2);
        assert_eq!(config.band.chunk_khz, 100_000);
        assert_eq!(config.session.settle_delay, Duration::ZERO);
        assert_eq!(config.session.baud_rate, 500_000);
    }

    #[test]
    fn test_rejects_empty_band() {
        let err = LoggerConfig::from_yaml("band:\n  start_khz: 100000\n  end_khz: 150000\n").unwrap_err();
        assert!(matches!(err, LoggerError::Config(_)));
        let err = LoggerConfig::from_yaml("band:\n  chunk_khz: 0\n").unwrap_err();
        assert!(matches!(err, LoggerError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "band:\n  start_khz: 240000\n  end_khz: 960000").unwrap();
        let config = LoggerConfig::load(file.path()).unwrap();
        assert_eq!(config.band.plan().unwrap().chunk_starts().len(), 7);
    }
}
