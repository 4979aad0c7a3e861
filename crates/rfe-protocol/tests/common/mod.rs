//! Scripted stand-in for the analyzer used by the session tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::thread;
use std::time::Duration;

use rfe_protocol::{SessionConfig, Transport, SWEEP_POINTS};

pub const SETUP_LINE: &[u8] = b"#C2-M:003,255,01.12B26\r\n";

/// Configuration line for `steps` points starting at `start_khz`.
pub fn config_line(start_khz: u64, step_hz: u64, steps: u32) -> Vec<u8> {
    format!(
        "#C2-F:{:07},{:07},-010,-100,{:04},0,000,0015000,2700000,0600000,00110\r\n",
        start_khz, step_hz, steps
    )
    .into_bytes()
}

/// Data line carrying `samples` as raw bytes.
pub fn data_line(samples: &[u8]) -> Vec<u8> {
    let mut line = b"$Sp".to_vec();
    line.extend_from_slice(samples);
    line.extend_from_slice(b"\r\n");
    line
}

/// Data line with every sample set to `value`.
pub fn flat_line(value: u8) -> Vec<u8> {
    data_line(&[value; SWEEP_POINTS])
}

/// Session settings without sleeps and with short budgets.
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        read_timeout: Duration::from_millis(10),
        max_handshake_attempts: 5,
        handshake_timeout: Duration::from_secs(5),
        max_skipped_lines: 4,
        quick_sweep_budget: Duration::from_millis(200),
        ..SessionConfig::default()
    }
}

/// Reacts to commands the way the analyzer does.
///
/// `GO` queues the next scripted reply (or the default setup + config) and
/// starts streaming, `STOP` halts it, `SET_SWEEP` echoes a configuration
/// frame for the requested window. While streaming, reads with nothing
/// queued return scripted data lines, then `frame_default` forever.
pub struct FakeAnalyzer {
    pub written: Vec<Vec<u8>>,
    pub pending: VecDeque<Vec<u8>>,
    pub go_replies: VecDeque<Vec<Vec<u8>>>,
    pub default_go_reply: Vec<Vec<u8>>,
    pub frames: VecDeque<Vec<u8>>,
    pub frame_default: Option<Vec<u8>>,
    pub sweep_steps: u32,
    pub fail_writes: bool,
    /// Time every read blocks before returning, like a serial read timeout.
    pub read_delay: Duration,
    pub streaming: bool,
    pub open: bool,
    pub opens: usize,
    pub closes: usize,
    pub flushes: usize,
}

impl Default for FakeAnalyzer {
    fn default() -> Self {
        FakeAnalyzer {
            written: Vec::new(),
            pending: VecDeque::new(),
            go_replies: VecDeque::new(),
            default_go_reply: vec![SETUP_LINE.to_vec(), config_line(100_000, 892_857, 112)],
            frames: VecDeque::new(),
            frame_default: Some(flat_line(100)),
            sweep_steps: 112,
            fail_writes: false,
            read_delay: Duration::ZERO,
            streaming: false,
            open: true,
            opens: 0,
            closes: 0,
            flushes: 0,
        }
    }
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times a command with this code was written.
    pub fn count(&self, code: &[u8]) -> usize {
        self.written.iter().filter(|w| w.get(2..4) == Some(code)).count()
    }

    /// Codes of every written command, in order.
    pub fn codes(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|w| String::from_utf8_lossy(&w[2..4]).to_string())
            .collect()
    }

    fn check_open(&self) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        }
        Ok(())
    }

    fn echo_sweep(&mut self, payload: &str) {
        let fields: Vec<u64> = payload
            .split(',')
            .take(2)
            .filter_map(|f| f.parse().ok())
            .collect();
        if let [start, end] = fields[..] {
            let step = (end - start) * 1000 / SWEEP_POINTS as u64;
            self.pending.push_back(config_line(start, step, self.sweep_steps));
        }
    }
}

impl Transport for FakeAnalyzer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.check_open()?;
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        self.written.push(bytes.to_vec());

        match &bytes[2..4] {
            b"C0" => {
                let reply = self
                    .go_replies
                    .pop_front()
                    .unwrap_or_else(|| self.default_go_reply.clone());
                self.pending.extend(reply);
                self.streaming = true;
            }
            b"CH" => {
                self.pending.clear();
                self.streaming = false;
            }
            b"C2" => {
                let text = String::from_utf8_lossy(&bytes[2..]).to_string();
                if let Some(payload) = text.strip_prefix("C2-F:") {
                    self.echo_sweep(payload);
                }
                self.streaming = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.check_open()?;
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        if let Some(line) = self.pending.pop_front() {
            return Ok(line);
        }
        if !self.streaming {
            return Ok(Vec::new());
        }
        Ok(self
            .frames
            .pop_front()
            .or_else(|| self.frame_default.clone())
            .unwrap_or_default())
    }

    fn open(&mut self) -> io::Result<()> {
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        self.closes += 1;
        self.pending.clear();
        Ok(())
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.check_open()?;
        self.flushes += 1;
        self.pending.clear();
        Ok(())
    }
}
