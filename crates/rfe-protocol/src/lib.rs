//! RF Explorer Serial Protocol
//!
//! This crate drives an RF Explorer handheld spectrum analyzer over its USB
//! serial link. The protocol is line oriented and only loosely framed:
//! commands are short `#`-prefixed byte strings, replies are text lines for
//! configuration and raw binary lines for sweep data.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → device): `#`, a length byte, a two-character code
//!   and an optional ASCII payload (`GO`, `STOP`, `LCD_ON`, `LCD_OFF`,
//!   `SET_SWEEP`)
//! - **Setup** (device → host): `#C2-M:` acknowledgement, then the current
//!   configuration as `#C2-F:` with 11 comma separated fields
//! - **Data** (device → host): `$Sp` followed by 112 raw sample bytes, each
//!   decoding to `-(byte / 2)` dBm
//!
//! Every sweep reports exactly 112 points; the frequency of each point is
//! derived from the start and step echoed in the configuration frame.
//!
//! # Example
//!
//! ```rust,ignore
//! use rfe_protocol::{ProtocolSession, SerialTransport, SessionConfig, to_delimited_text};
//!
//! let transport = SerialTransport::open_default("/dev/ttyUSB0")?;
//! let mut session = ProtocolSession::new(transport, SessionConfig::default());
//! let setup = session.initialize()?;
//!
//! let result = session.timed_sweep(100_000, 200_000, std::time::Duration::from_secs(5))?;
//! print!("{}", to_delimited_text(&result));
//! ```

mod commands;
mod config;
mod constants;
mod error;
mod frame;
mod output;
mod plan;
mod result;
mod session;
mod transport;

pub use commands::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use output::*;
pub use plan::*;
pub use result::*;
pub use session::*;
pub use transport::*;
