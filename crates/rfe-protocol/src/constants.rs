//! Protocol constants
//!
//! Command bytes, response markers and device limits used by the RF Explorer
//! serial protocol.

use std::time::Duration;

// ============================================================================
// Link Settings
// ============================================================================

/// Baud rate the analyzer's USB serial bridge runs at.
pub const BAUD_RATE: u32 = 500_000;
/// Per-read timeout of the serial link.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Command Framing (host → device)
// ============================================================================

/// Leading byte of every host command.
pub const COMMAND_MARKER: u8 = b'#';

/// Start sweeping and echo the current setup.
pub const CODE_GO: &[u8; 2] = b"C0";
/// Halt sweeping.
pub const CODE_STOP: &[u8; 2] = b"CH";
/// Switch the LCD off.
pub const CODE_LCD_OFF: &[u8; 2] = b"L0";
/// Switch the LCD on.
pub const CODE_LCD_ON: &[u8; 2] = b"L1";
/// Power the unit down. Not reliable on real hardware, never sent.
pub const CODE_SHUTDOWN: &[u8; 2] = b"CS";
/// Prefix of the sweep configuration command payload.
pub const CODE_SET_SWEEP: &str = "C2-F:";

// ============================================================================
// Response Markers (device → host)
// ============================================================================

/// Marker token of the current-configuration frame (before the `:`).
pub const MARKER_CONFIG: &str = "#C2-F";
/// Marker token of the setup-acknowledgement frame (before the `:`).
pub const MARKER_SETUP: &str = "#C2-M";
/// Prefix accepted as a control response while resynchronizing.
pub const MARKER_CONTROL: &str = "#C";
/// Leading bytes of a sweep data frame.
pub const MARKER_DATA: &[u8] = b"$S";
/// Byte introducing the sample block inside a data frame.
pub const MARKER_SAMPLES: u8 = b'p';

// ============================================================================
// Device Limits
// ============================================================================

/// Number of amplitude samples in every sweep.
pub const SWEEP_POINTS: usize = 112;

/// Lowest start/end frequency accepted by the sweep command, in kHz.
pub const MIN_FREQ_KHZ: u32 = 15_000;
/// Highest start/end frequency accepted by the sweep command, in kHz.
pub const MAX_FREQ_KHZ: u32 = 27_000_000;
/// Lower bound of the documented 7-digit frequency field, in kHz (informational).
pub const NOMINAL_MIN_FREQ_KHZ: u32 = 240_000;
/// Upper bound of the documented 7-digit frequency field, in kHz (informational).
pub const NOMINAL_MAX_FREQ_KHZ: u32 = 959_888;
/// Width the frequency fields are zero-padded to.
pub const FREQ_FIELD_WIDTH: usize = 7;

/// Accepted range of the top amplitude, in dBm.
pub const AMP_TOP_RANGE: (i32, i32) = (-110, 5);
/// Accepted range of the bottom amplitude, in dBm.
pub const AMP_BOTTOM_RANGE: (i32, i32) = (-120, -5);
/// Exact width of an amplitude field, sign included.
pub const AMP_FIELD_WIDTH: usize = 4;

/// Top amplitude used by the sweep operations.
pub const DEFAULT_AMP_TOP: &str = "-010";
/// Bottom amplitude used by the sweep operations.
pub const DEFAULT_AMP_BOTTOM: &str = "-100";

/// Number of comma separated fields in a configuration frame.
pub const CONFIG_FIELD_COUNT: usize = 11;
