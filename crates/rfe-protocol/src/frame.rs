//! Frame parsing.
//!
//! The analyzer talks in loosely framed lines. A line is one of:
//!
//! ```text
//! #C2-M:<main>,<expansion>,<firmware>\r\n        setup acknowledgement
//! #C2-F:<start>,<step>,<top>,<bottom>,...\r\n    current configuration
//! $Sp<112 raw sample bytes>\r\n                   sweep data
//! #...                                           other control traffic
//! ```
//!
//! Nothing here touches the transport; the session feeds lines in.

use crate::constants::*;
use crate::error::ConfigurationError;

// ============================================================================
// Line Classification
// ============================================================================

/// One classified line of device traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Setup acknowledgement (`#C2-M:`), payload kept raw.
    Setup(String),
    /// Current configuration (`#C2-F:`).
    Config(ConfigFrame),
    /// Sweep data (`$S`).
    Data(DataFrame),
    /// Any other `#`-prefixed line.
    Control(String),
    /// Anything else, including empty reads.
    Unrecognized(Vec<u8>),
}

impl Frame {
    /// Classify a raw line.
    ///
    /// A line carrying a known marker whose payload is unusable is reported
    /// as [`Frame::Unrecognized`] for data and as [`Frame::Control`] for
    /// configuration, so callers can tell desync apart from noise.
    pub fn classify(line: &[u8]) -> Frame {
        if is_data_line(line) {
            return match decode_data_line(line) {
                Ok(frame) => Frame::Data(frame),
                Err(_) => Frame::Unrecognized(line.to_vec()),
            };
        }
        if !is_control_line(line) {
            return Frame::Unrecognized(line.to_vec());
        }
        let (marker, payload) = split_marker(line);
        match marker.as_str() {
            MARKER_SETUP => Frame::Setup(payload),
            MARKER_CONFIG => match ConfigFrame::parse_payload(&payload) {
                Ok(config) => Frame::Config(config),
                Err(_) => Frame::Control(printable(line)),
            },
            _ => Frame::Control(printable(line)),
        }
    }
}

/// Whether a line starts with the data marker.
pub fn is_data_line(line: &[u8]) -> bool {
    line.starts_with(MARKER_DATA)
}

/// Whether a line starts with the control marker `#`.
pub fn is_control_line(line: &[u8]) -> bool {
    line.first() == Some(&COMMAND_MARKER)
}

/// Split a line on its first `:` into the marker token and the payload.
///
/// The line terminator is removed from the payload. A line without `:`
/// yields the whole trimmed line as marker and an empty payload.
pub fn split_marker(line: &[u8]) -> (String, String) {
    let text = String::from_utf8_lossy(strip_line_ending(line));
    match text.split_once(':') {
        Some((marker, payload)) => (marker.to_string(), payload.to_string()),
        None => (text.to_string(), String::new()),
    }
}

/// Render a line for log and error output.
pub fn printable(line: &[u8]) -> String {
    String::from_utf8_lossy(strip_line_ending(line))
        .chars()
        .map(|c| if c.is_control() { '.' } else { c })
        .collect()
}

/// Drop a trailing `\n`, and the `\r` before it if present.
pub fn strip_line_ending(line: &[u8]) -> &[u8] {
    match line.strip_suffix(b"\n") {
        Some(rest) => rest.strip_suffix(b"\r").unwrap_or(rest),
        None => line,
    }
}

// ============================================================================
// Device Information
// ============================================================================

/// Identity reported in the setup acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Main board model code.
    pub main_model: String,
    /// Expansion module model code (`255` when none is fitted).
    pub expansion_model: String,
    /// Firmware version string.
    pub firmware: String,
}

impl DeviceInfo {
    /// Parse a `#C2-M:` payload. Returns `None` unless all three fields are present.
    pub fn parse(payload: &str) -> Option<DeviceInfo> {
        let mut fields = payload.trim().split(',').map(str::trim);
        let main_model = fields.next().filter(|f| !f.is_empty())?;
        let expansion_model = fields.next()?;
        let firmware = fields.next()?;
        Some(DeviceInfo {
            main_model: main_model.to_string(),
            expansion_model: expansion_model.to_string(),
            firmware: firmware.to_string(),
        })
    }
}

// ============================================================================
// Configuration Frame
// ============================================================================

/// The analyzer's current configuration as echoed in a `#C2-F:` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFrame {
    /// Sweep start frequency in kHz.
    pub start_khz: u64,
    /// Distance between sweep points in Hz.
    pub step_hz: u64,
    /// Top of the amplitude scale in dBm.
    pub amp_top_dbm: i32,
    /// Bottom of the amplitude scale in dBm.
    pub amp_bottom_dbm: i32,
    /// Number of points per sweep.
    pub sweep_steps: u32,
    /// Whether the expansion module is active.
    pub expansion_module_active: bool,
    /// Current operating mode code.
    pub mode: u16,
    /// Lowest frequency the active module supports, in kHz.
    pub min_freq_khz: u64,
    /// Highest frequency the active module supports, in kHz.
    pub max_freq_khz: u64,
    /// Widest span the active module supports, in kHz.
    pub max_span_khz: u64,
    /// Resolution bandwidth in kHz.
    pub rbw_khz: u32,
}

impl ConfigFrame {
    /// Parse a full `#C2-F:` line.
    pub fn parse_line(line: &[u8]) -> Result<ConfigFrame, ConfigurationError> {
        let (marker, payload) = split_marker(line);
        if marker != MARKER_CONFIG {
            return Err(ConfigurationError::MalformedConfigFrame(format!(
                "missing {} marker in {:?}",
                MARKER_CONFIG,
                printable(line)
            )));
        }
        Self::parse_payload(&payload)
    }

    /// Parse the comma separated payload after the marker.
    pub fn parse_payload(payload: &str) -> Result<ConfigFrame, ConfigurationError> {
        let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
        if fields.len() < CONFIG_FIELD_COUNT {
            return Err(ConfigurationError::MalformedConfigFrame(format!(
                "expected {} fields, got {}",
                CONFIG_FIELD_COUNT,
                fields.len()
            )));
        }

        Ok(ConfigFrame {
            start_khz: field(&fields, 0, "start frequency")?,
            step_hz: field(&fields, 1, "frequency step")?,
            amp_top_dbm: field(&fields, 2, "amplitude top")?,
            amp_bottom_dbm: field(&fields, 3, "amplitude bottom")?,
            sweep_steps: field(&fields, 4, "sweep steps")?,
            expansion_module_active: field::<u8>(&fields, 5, "expansion module")? != 0,
            mode: field(&fields, 6, "mode")?,
            min_freq_khz: field(&fields, 7, "min frequency")?,
            max_freq_khz: field(&fields, 8, "max frequency")?,
            max_span_khz: field(&fields, 9, "max span")?,
            rbw_khz: field(&fields, 10, "resolution bandwidth")?,
        })
    }

    /// Sweep start frequency in Hz.
    pub fn start_hz(&self) -> u64 {
        self.start_khz * 1000
    }
}

fn field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
) -> Result<T, ConfigurationError> {
    fields[index].parse().map_err(|_| {
        ConfigurationError::MalformedConfigFrame(format!("{} is not a number: {:?}", name, fields[index]))
    })
}

// ============================================================================
// Data Frame
// ============================================================================

/// One sweep worth of raw amplitude samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    samples: Vec<u8>,
}

impl DataFrame {
    /// Wrap raw samples. Fails unless there are exactly [`SWEEP_POINTS`] of them.
    pub fn new(samples: Vec<u8>) -> Result<DataFrame, RetryReason> {
        if samples.len() != SWEEP_POINTS {
            return Err(RetryReason::WrongLength(samples.len()));
        }
        Ok(DataFrame { samples })
    }

    /// Raw device bytes.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Samples converted to dBm.
    pub fn amplitudes(&self) -> Vec<i32> {
        self.samples.iter().map(|&b| sample_to_dbm(b)).collect()
    }

    /// Number of samples (always [`SWEEP_POINTS`]).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Convert a raw sample to dBm. The device reports in half-dB steps.
pub fn sample_to_dbm(sample: u8) -> i32 {
    -((sample / 2) as i32)
}

/// Why a read did not yield a data frame. Every reason means "try again".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// A control line arrived where data was expected.
    Desync(String),
    /// The data line had no sample block.
    MissingSampleBlock,
    /// The sample block did not hold a full sweep.
    WrongLength(usize),
    /// Only noise or timeouts were read.
    NoDataLine {
        /// Lines read and discarded.
        skipped: usize,
    },
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryReason::Desync(line) => write!(f, "control line while waiting for data: {}", line),
            RetryReason::MissingSampleBlock => write!(f, "data line without sample block"),
            RetryReason::WrongLength(n) => {
                write!(f, "sample block has {} samples, expected {}", n, SWEEP_POINTS)
            }
            RetryReason::NoDataLine { skipped } => {
                write!(f, "no data line after {} reads", skipped)
            }
        }
    }
}

/// Outcome of trying to pull one data frame off the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// A complete sweep.
    Frame(DataFrame),
    /// Nothing usable; the caller should read again.
    Retry(RetryReason),
}

impl FrameRead {
    /// The frame, if one was read.
    pub fn into_frame(self) -> Option<DataFrame> {
        match self {
            FrameRead::Frame(frame) => Some(frame),
            FrameRead::Retry(_) => None,
        }
    }
}

/// Decode a `$S` line into a data frame.
///
/// The sample block follows the `p` byte right after the marker (on the
/// wire this byte is the sample count, 112). The line terminator is
/// stripped before the length check.
pub fn decode_data_line(line: &[u8]) -> Result<DataFrame, RetryReason> {
    let body = line
        .strip_prefix(MARKER_DATA)
        .ok_or(RetryReason::MissingSampleBlock)?;
    let block = match body.split_first() {
        Some((&MARKER_SAMPLES, rest)) => rest,
        _ => return Err(RetryReason::MissingSampleBlock),
    };
    DataFrame::new(strip_line_ending(block).to_vec())
}
