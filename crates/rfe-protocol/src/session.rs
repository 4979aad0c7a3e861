//! Protocol session: handshake, resync and sweep orchestration.
//!
//! A session owns the transport and the connection state. Frequency plans
//! are returned to the caller rather than kept between calls, so every
//! sweep works against the plan the device echoed for that sweep.
//!
//! ```text
//! Disconnected ──initialize──▶ Handshaking ──marker ok──▶ Ready
//!                                  │  ▲
//!                          bad marker  resync (bounded)
//!                                  ▼  │
//!                               (retry) ──budget spent──▶ Faulted
//! ```
//!
//! Transport failures at any point also move the session to `Faulted`.
//! `initialize` may be called again to recover.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::config::SweepConfig;
use crate::constants::*;
use crate::error::{DataIntegrityError, ProtocolError, RfeError, RfeResult, TransportError};
use crate::frame::{
    decode_data_line, is_control_line, is_data_line, printable, split_marker, ConfigFrame,
    DataFrame, DeviceInfo, FrameRead, RetryReason,
};
use crate::plan::FrequencyPlan;
use crate::result::{ResultAggregator, SweepResult};
use crate::transport::Transport;

// ============================================================================
// Configuration
// ============================================================================

/// Timing and retry settings of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Per-read timeout of the transport.
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    /// Pause between the steps of a resync (stop, close, reopen, flush).
    #[serde(with = "millis")]
    pub settle_delay: Duration,
    /// Resync attempts before the handshake gives up.
    pub max_handshake_attempts: u32,
    /// Wall-clock limit on the whole handshake.
    #[serde(with = "millis")]
    pub handshake_timeout: Duration,
    /// Non-data lines tolerated in one frame read before it is retried.
    pub max_skipped_lines: usize,
    /// Wall-clock budget for collecting the frame of a quick sweep.
    #[serde(with = "millis")]
    pub quick_sweep_budget: Duration,
    /// Extra reads allowed per poll of a timed sweep.
    pub poll_retries: u32,
    /// Top amplitude field used by sweeps.
    pub amp_top: String,
    /// Bottom amplitude field used by sweeps.
    pub amp_bottom: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            baud_rate: BAUD_RATE,
            read_timeout: READ_TIMEOUT,
            settle_delay: Duration::from_millis(250),
            max_handshake_attempts: 10,
            handshake_timeout: Duration::from_secs(30),
            max_skipped_lines: 32,
            quick_sweep_budget: Duration::from_secs(30),
            poll_retries: 2,
            amp_top: DEFAULT_AMP_TOP.to_string(),
            amp_bottom: DEFAULT_AMP_BOTTOM.to_string(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Link state as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not synchronized with the device.
    Disconnected,
    /// Handshake or resync in progress.
    Handshaking,
    /// Synchronized; sweeps may run.
    Ready,
    /// The handshake budget ran out or the transport failed.
    Faulted,
}

/// What the device reported during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    /// Parsed identity, if the acknowledgement carried one.
    pub device: Option<DeviceInfo>,
    /// Raw acknowledgement payload.
    pub raw_info: String,
    /// Frequency plan of the device's current configuration.
    pub plan: FrequencyPlan,
}

/// A single-device protocol session.
pub struct ProtocolSession<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: ConnectionState,
}

impl<T: Transport> ProtocolSession<T> {
    /// Create a session over an open transport.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        ProtocolSession {
            transport,
            config,
            state: ConnectionState::Disconnected,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    // ------------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------------

    /// Synchronize with the device and read its current configuration.
    ///
    /// Sends `GO` and expects a setup acknowledgement. Anything else starts
    /// the resync loop (stop, bounce the port, flush, `GO` again) until a
    /// control response arrives, the attempt limit is reached or the
    /// handshake timeout expires. Exhaustion leaves the session `Faulted`.
    pub fn initialize(&mut self) -> RfeResult<SessionSetup> {
        self.state = ConnectionState::Handshaking;
        let started = Instant::now();

        self.send(&Command::Go)?;
        let mut line = self.read_line()?;
        let (mut marker, mut payload) = split_marker(&line);

        if marker != MARKER_SETUP {
            let mut attempts = 0u32;
            loop {
                if attempts >= self.config.max_handshake_attempts
                    || started.elapsed() >= self.config.handshake_timeout
                {
                    self.state = ConnectionState::Faulted;
                    log::warn!("handshake gave up after {} resyncs", attempts);
                    return Err(ProtocolError::HandshakeExhausted {
                        attempts,
                        elapsed: started.elapsed(),
                    }
                    .into());
                }
                attempts += 1;
                log::debug!(
                    "unexpected handshake reply {:?}, resync attempt {}",
                    printable(&line),
                    attempts
                );

                self.resync()?;
                self.send(&Command::Go)?;
                line = self.read_line()?;
                (marker, payload) = split_marker(&line);
                if marker.starts_with(MARKER_CONTROL) {
                    break;
                }
            }
        }

        // The configuration usually follows the acknowledgement; a resync
        // may land directly on it.
        let config = if marker == MARKER_CONFIG {
            ConfigFrame::parse_payload(&payload).map_err(RfeError::from)
        } else {
            let next = self.read_line()?;
            self.expect_config(&next)
        };
        let plan = match config.and_then(|c| FrequencyPlan::from_config(&c).map_err(RfeError::from)) {
            Ok(plan) => plan,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                return Err(e.into());
            }
        };

        let device = if marker == MARKER_SETUP {
            DeviceInfo::parse(&payload)
        } else {
            None
        };
        log::debug!(
            "synchronized in {:?}: {:?}, {} points from {} Hz",
            started.elapsed(),
            device,
            plan.len(),
            plan.start_hz()
        );
        self.state = ConnectionState::Ready;
        Ok(SessionSetup {
            device,
            raw_info: payload.trim().to_string(),
            plan,
        })
    }

    /// Stop sweeping and bounce the port so the next read starts clean.
    pub fn resync(&mut self) -> RfeResult<()> {
        self.send(&Command::Stop)?;
        self.pause();
        self.link(|t| t.close())?;
        self.pause();
        self.link(|t| t.open())?;
        self.pause();
        self.link(|t| t.flush_input())?;
        Ok(())
    }

    /// Stop sweeping and close the link.
    pub fn disconnect(&mut self) -> RfeResult<()> {
        self.send(&Command::Stop)?;
        self.link(|t| t.close())?;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    /// Switch the analyzer's LCD on or off.
    pub fn set_lcd(&mut self, on: bool) -> RfeResult<()> {
        self.require_ready()?;
        let command = if on { Command::LcdOn } else { Command::LcdOff };
        self.send(&command)
    }

    // ------------------------------------------------------------------------
    // Sweep Configuration
    // ------------------------------------------------------------------------

    /// Validate sweep parameters and send them to the device.
    ///
    /// Validation happens before anything is written, so a rejected
    /// configuration leaves both the device and the session untouched.
    pub fn set_sweep_params(
        &mut self,
        start_khz: u32,
        end_khz: u32,
        amp_top: &str,
        amp_bottom: &str,
    ) -> RfeResult<SweepConfig> {
        let config = SweepConfig::new(start_khz, end_khz, amp_top, amp_bottom)?;
        self.apply_sweep_config(&config)?;
        Ok(config)
    }

    /// Send an already validated sweep configuration.
    pub fn apply_sweep_config(&mut self, config: &SweepConfig) -> RfeResult<()> {
        self.require_ready()?;
        self.send(&Command::SetSweep(config.clone()))
    }

    /// Read the configuration frame the device echoes and derive its plan.
    ///
    /// Stale data lines and empty reads are skipped; any other line is a
    /// protocol error.
    pub fn read_frequency_plan(&mut self) -> RfeResult<FrequencyPlan> {
        for _ in 0..=self.config.max_skipped_lines {
            let line = self.read_line()?;
            if line.is_empty() || is_data_line(&line) {
                log::trace!("skipping {} bytes while waiting for configuration", line.len());
                continue;
            }
            let config = self.expect_config(&line)?;
            return Ok(FrequencyPlan::from_config(&config)?);
        }
        Err(ProtocolError::UnexpectedFrame {
            expected: MARKER_CONFIG,
            got: "no configuration frame".to_string(),
        }
        .into())
    }

    fn expect_config(&self, line: &[u8]) -> RfeResult<ConfigFrame> {
        let (marker, _) = split_marker(line);
        if marker != MARKER_CONFIG {
            return Err(ProtocolError::UnexpectedFrame {
                expected: MARKER_CONFIG,
                got: printable(line),
            }
            .into());
        }
        Ok(ConfigFrame::parse_line(line)?)
    }

    // ------------------------------------------------------------------------
    // Data Collection
    // ------------------------------------------------------------------------

    /// Try to read one data frame within one read timeout.
    ///
    /// Lines that are neither data nor control are skipped up to the
    /// configured limit. A control line means the device is out of step;
    /// the read stops there and asks the caller to retry.
    pub fn read_frame(&mut self) -> RfeResult<FrameRead> {
        let deadline = Instant::now() + self.config.read_timeout;
        self.read_frame_until(deadline)
    }

    /// Like [`read_frame`](Self::read_frame), but keeps skipping lines
    /// until `deadline` instead of for one read timeout.
    ///
    /// At least one line is always read. A read already in progress when
    /// the deadline passes still runs to its own timeout.
    pub fn read_frame_until(&mut self, deadline: Instant) -> RfeResult<FrameRead> {
        let mut skipped = 0;
        loop {
            let line = self.read_line()?;
            if is_data_line(&line) {
                return Ok(match decode_data_line(&line) {
                    Ok(frame) => FrameRead::Frame(frame),
                    Err(reason) => {
                        log::debug!("discarding data line: {}", reason);
                        FrameRead::Retry(reason)
                    }
                });
            }
            if is_control_line(&line) {
                log::debug!("desync while waiting for data: {:?}", printable(&line));
                return Ok(FrameRead::Retry(RetryReason::Desync(printable(&line))));
            }
            skipped += 1;
            if skipped >= self.config.max_skipped_lines || Instant::now() >= deadline {
                return Ok(FrameRead::Retry(RetryReason::NoDataLine { skipped }));
            }
        }
    }

    /// Collect one frame from a device that is already sweeping `plan`.
    pub fn sweep_once(&mut self, plan: &FrequencyPlan) -> RfeResult<SweepResult> {
        self.require_ready()?;
        let frame = self.poll_frame()?;
        Ok(SweepResult::from_frame(plan, &frame)?)
    }

    /// Read frames until one is valid or the quick-sweep budget is spent.
    fn collect_within_budget(&mut self) -> RfeResult<DataFrame> {
        let started = Instant::now();
        let deadline = started + self.config.quick_sweep_budget;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if let FrameRead::Frame(frame) = self.read_frame_until(deadline)? {
                return Ok(frame);
            }
            if Instant::now() >= deadline {
                return Err(DataIntegrityError::NoValidFrame {
                    expected: SWEEP_POINTS,
                    attempts,
                    elapsed: started.elapsed(),
                }
                .into());
            }
        }
    }

    /// Read one frame, allowing `poll_retries` extra attempts of one read
    /// timeout each.
    fn poll_frame(&mut self) -> RfeResult<DataFrame> {
        let started = Instant::now();
        let attempts = self.config.poll_retries + 1;
        for _ in 0..attempts {
            if let FrameRead::Frame(frame) = self.read_frame()? {
                return Ok(frame);
            }
        }
        Err(DataIntegrityError::NoValidFrame {
            expected: SWEEP_POINTS,
            attempts,
            elapsed: started.elapsed(),
        }
        .into())
    }

    // ------------------------------------------------------------------------
    // Sweeps
    // ------------------------------------------------------------------------

    /// Reconfigure for `start_khz..end_khz` and return the echoed plan.
    fn prepare_sweep(&mut self, start_khz: u32, end_khz: u32) -> RfeResult<FrequencyPlan> {
        let sweep = SweepConfig::new(start_khz, end_khz, &self.config.amp_top, &self.config.amp_bottom)?;
        self.require_ready()?;
        self.resync()?;
        self.apply_sweep_config(&sweep)?;
        self.read_frequency_plan()
    }

    /// Sweep `start_khz..end_khz` once.
    ///
    /// The first valid frame wins. Invalid frames are retried until the
    /// quick-sweep budget (30 s by default) runs out.
    pub fn quick_sweep(&mut self, start_khz: u32, end_khz: u32) -> RfeResult<SweepResult> {
        let plan = self.prepare_sweep(start_khz, end_khz)?;
        let frame = self.collect_within_budget()?;
        Ok(SweepResult::from_frame(&plan, &frame)?)
    }

    /// Sweep `start_khz..end_khz` for `duration`, keeping the maximum per frequency.
    ///
    /// Never returns successfully before `duration` has elapsed since the
    /// device was configured, and always folds in at least one frame. A
    /// poll that fails `poll_retries + 1` times fails the whole sweep.
    pub fn timed_sweep(
        &mut self,
        start_khz: u32,
        end_khz: u32,
        duration: Duration,
    ) -> RfeResult<SweepResult> {
        let plan = self.prepare_sweep(start_khz, end_khz)?;
        let started = Instant::now();
        let mut aggregator = ResultAggregator::new(plan);
        loop {
            let frame = self.poll_frame()?;
            aggregator.push(&frame)?;
            if started.elapsed() >= duration {
                break;
            }
        }
        log::debug!(
            "timed sweep {}-{} kHz held {} frames over {:?}",
            start_khz,
            end_khz,
            aggregator.frame_count(),
            started.elapsed()
        );
        Ok(aggregator.finish())
    }

    // ------------------------------------------------------------------------
    // Link Helpers
    // ------------------------------------------------------------------------

    fn require_ready(&self) -> RfeResult<()> {
        if self.state != ConnectionState::Ready {
            return Err(ProtocolError::NotReady(self.state).into());
        }
        Ok(())
    }

    fn send(&mut self, command: &Command) -> RfeResult<()> {
        let bytes = command.encode();
        log::trace!("-> {} {:?}", command.name(), printable(&bytes));
        self.link(|t| t.write(&bytes))
    }

    fn read_line(&mut self) -> RfeResult<Vec<u8>> {
        let line = self.link(|t| t.read_line())?;
        log::trace!("<- {:?}", printable(&line));
        Ok(line)
    }

    /// Run a transport operation; failures fault the session.
    fn link<R>(&mut self, op: impl FnOnce(&mut T) -> std::io::Result<R>) -> RfeResult<R> {
        op(&mut self.transport).map_err(|e| {
            log::warn!("transport failure: {}", e);
            self.state = ConnectionState::Faulted;
            RfeError::Transport(TransportError::Io(e))
        })
    }

    fn pause(&self) {
        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }
    }
}
