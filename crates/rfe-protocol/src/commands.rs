//! Commands that can be sent to the analyzer.
//!
//! Every command is framed as `#`, a length byte counting the whole command,
//! then an ASCII payload starting with a two-character code.

use crate::config::SweepConfig;
use crate::constants::*;

/// Commands the driver sends to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start sweeping. The device answers with its setup and configuration.
    Go,
    /// Halt sweeping.
    Stop,
    /// Switch the LCD off.
    LcdOff,
    /// Switch the LCD on.
    LcdOn,
    /// Reconfigure the sweep window and amplitude scale.
    SetSweep(SweepConfig),
}

impl Command {
    /// Short name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Go => "GO",
            Command::Stop => "STOP",
            Command::LcdOff => "LCD_OFF",
            Command::LcdOn => "LCD_ON",
            Command::SetSweep(_) => "SET_SWEEP",
        }
    }

    /// Encode the command into its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let payload: Vec<u8> = match self {
            Command::Go => CODE_GO.to_vec(),
            Command::Stop => CODE_STOP.to_vec(),
            Command::LcdOff => CODE_LCD_OFF.to_vec(),
            Command::LcdOn => CODE_LCD_ON.to_vec(),
            Command::SetSweep(config) => format!(
                "{}{},{},{},{}",
                CODE_SET_SWEEP,
                config.start_field(),
                config.end_field(),
                config.amp_top(),
                config.amp_bottom()
            )
            .into_bytes(),
        };

        let mut buf = Vec::with_capacity(payload.len() + 2);
        buf.push(COMMAND_MARKER);
        // Marker and length byte count towards the length.
        buf.push((payload.len() + 2) as u8);
        buf.extend_from_slice(&payload);
        buf
    }
}
