//! Error types for the RF Explorer protocol.
//!
//! Errors are split by how the caller is expected to react:
//! configuration errors are fail-fast, transport errors are fatal for the
//! session, protocol and data-integrity errors are only raised once the
//! internal retry budgets are spent.

use std::time::Duration;

use thiserror::Error;

use crate::session::ConnectionState;

/// Invalid sweep parameters or an unusable configuration frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A frequency is outside the range the sweep command accepts.
    #[error("{field} frequency {value} kHz out of bounds ({min}-{max} kHz)")]
    FrequencyOutOfBounds {
        /// Which field was rejected (`start` or `end`).
        field: &'static str,
        /// Offending value in kHz.
        value: u32,
        /// Lowest accepted value.
        min: u32,
        /// Highest accepted value.
        max: u32,
    },

    /// An amplitude is outside the range the sweep command accepts.
    #[error("{field} amplitude {value} dBm out of bounds ({min} to {max} dBm)")]
    AmplitudeOutOfBounds {
        /// Which field was rejected (`amp_top` or `amp_bottom`).
        field: &'static str,
        /// Offending value in dBm.
        value: i32,
        /// Lowest accepted value.
        min: i32,
        /// Highest accepted value.
        max: i32,
    },

    /// A field does not render to the width the wire format requires.
    #[error("{field} must be {expected} characters, got {actual:?}")]
    FieldWidth {
        /// Field name.
        field: &'static str,
        /// Required width.
        expected: usize,
        /// Rendered text.
        actual: String,
    },

    /// A field is not a number.
    #[error("{field} is not a valid number: {value:?}")]
    NotANumber {
        /// Field name.
        field: &'static str,
        /// Raw text.
        value: String,
    },

    /// The configuration frame could not be parsed.
    #[error("malformed configuration frame: {0}")]
    MalformedConfigFrame(String),

    /// The derived frequency plan does not have the device's point count.
    #[error("frequency plan has {actual} points, expected {expected}")]
    PlanLength {
        /// Required number of points.
        expected: usize,
        /// Number of points derived.
        actual: usize,
    },
}

/// Failure of the underlying serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on read, write, open, close or flush.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial backend refused to open or configure the port.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// The device did not follow the expected conversation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The handshake/resync loop ran out of attempts or time.
    #[error("handshake exhausted after {attempts} attempts ({elapsed:?})")]
    HandshakeExhausted {
        /// Resync attempts made.
        attempts: u32,
        /// Time spent in the handshake.
        elapsed: Duration,
    },

    /// A specific frame was required but something else arrived.
    #[error("expected {expected} frame, got {got:?}")]
    UnexpectedFrame {
        /// Name of the frame that was required.
        expected: &'static str,
        /// Printable rendering of what arrived.
        got: String,
    },

    /// The operation needs a synchronized session.
    #[error("session is not ready (state: {0:?})")]
    NotReady(ConnectionState),
}

/// No valid data frame could be collected within the retry budget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataIntegrityError {
    /// Every attempt failed to yield a full sweep.
    #[error("no valid {expected}-point data frame after {attempts} attempts ({elapsed:?})")]
    NoValidFrame {
        /// Required number of samples.
        expected: usize,
        /// Attempts made.
        attempts: u32,
        /// Time spent collecting.
        elapsed: Duration,
    },

    /// A frame was decoded but does not match the frequency plan.
    #[error("data frame has {actual} samples, frequency plan has {expected}")]
    LengthMismatch {
        /// Points in the plan.
        expected: usize,
        /// Samples in the frame.
        actual: usize,
    },

    /// A sweep finished without a single reading.
    #[error("sweep of {start_khz}-{end_khz} kHz returned no readings")]
    EmptySweep {
        /// Start of the swept window, kHz.
        start_khz: u32,
        /// End of the swept window, kHz.
        end_khz: u32,
    },
}

/// Any error returned by the protocol driver.
#[derive(Debug, Error)]
pub enum RfeError {
    /// Sweep parameters or device configuration are unusable.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The serial link failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device is out of step with the driver.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Sweep data never arrived intact.
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),
}

impl From<std::io::Error> for RfeError {
    fn from(err: std::io::Error) -> Self {
        RfeError::Transport(TransportError::Io(err))
    }
}

impl RfeError {
    /// Whether the error came from the serial link.
    pub fn is_transport(&self) -> bool {
        matches!(self, RfeError::Transport(_))
    }

    /// Whether a caller-supplied fallback amplitude may stand in for the reading.
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, RfeError::DataIntegrity(_))
    }
}

/// Result type alias for protocol operations.
pub type RfeResult<T> = Result<T, RfeError>;
