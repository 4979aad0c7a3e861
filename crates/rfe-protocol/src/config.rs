//! Sweep configuration: validation and field encoding.
//!
//! The sweep command carries two 7-digit zero-padded frequencies in kHz and
//! two 4-character signed amplitudes in dBm:
//!
//! ```text
//! C2-F:<start7>,<end7>,<ampTop4>,<ampBottom4>
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigurationError;

/// A validated sweep window and amplitude scale.
///
/// Amplitudes are kept as the exact text sent to the device (e.g. `-010`),
/// since the wire format depends on their rendering, not just their value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    start_khz: u32,
    end_khz: u32,
    amp_top: String,
    amp_bottom: String,
}

impl SweepConfig {
    /// Validate and build a sweep configuration.
    ///
    /// Frequencies must lie within 15 MHz..27 GHz, `amp_top` within
    /// -110..=5 dBm and `amp_bottom` within -120..=-5 dBm. Both amplitude
    /// fields must be exactly four characters including the sign.
    pub fn new(
        start_khz: u32,
        end_khz: u32,
        amp_top: &str,
        amp_bottom: &str,
    ) -> Result<Self, ConfigurationError> {
        check_frequency("start", start_khz)?;
        check_frequency("end", end_khz)?;
        check_amplitude("amp_top", amp_top, AMP_TOP_RANGE)?;
        check_amplitude("amp_bottom", amp_bottom, AMP_BOTTOM_RANGE)?;
        check_width("amp_top", amp_top)?;
        check_width("amp_bottom", amp_bottom)?;

        if !(NOMINAL_MIN_FREQ_KHZ..=NOMINAL_MAX_FREQ_KHZ).contains(&start_khz)
            || !(NOMINAL_MIN_FREQ_KHZ..=NOMINAL_MAX_FREQ_KHZ + SWEEP_POINTS as u32)
                .contains(&end_khz)
        {
            log::debug!(
                "sweep {}-{} kHz is outside the nominal 7-digit field range",
                start_khz,
                end_khz
            );
        }

        Ok(SweepConfig {
            start_khz,
            end_khz,
            amp_top: amp_top.to_string(),
            amp_bottom: amp_bottom.to_string(),
        })
    }

    /// Build a configuration from raw text fields, e.g. `("0100000", "0200000", "-010", "-100")`.
    pub fn parse(
        start_khz: &str,
        end_khz: &str,
        amp_top: &str,
        amp_bottom: &str,
    ) -> Result<Self, ConfigurationError> {
        let start = parse_field("start", start_khz)?;
        let end = parse_field("end", end_khz)?;
        Self::new(start, end, amp_top, amp_bottom)
    }

    /// Build a configuration with the amplitude scale the sweep operations use.
    pub fn with_default_scale(start_khz: u32, end_khz: u32) -> Result<Self, ConfigurationError> {
        Self::new(start_khz, end_khz, DEFAULT_AMP_TOP, DEFAULT_AMP_BOTTOM)
    }

    /// Start frequency in kHz.
    pub fn start_khz(&self) -> u32 {
        self.start_khz
    }

    /// End frequency in kHz.
    pub fn end_khz(&self) -> u32 {
        self.end_khz
    }

    /// Top amplitude field as sent.
    pub fn amp_top(&self) -> &str {
        &self.amp_top
    }

    /// Bottom amplitude field as sent.
    pub fn amp_bottom(&self) -> &str {
        &self.amp_bottom
    }

    /// Start frequency zero-padded to the field width.
    pub fn start_field(&self) -> String {
        pad_frequency(self.start_khz)
    }

    /// End frequency zero-padded to the field width.
    pub fn end_field(&self) -> String {
        pad_frequency(self.end_khz)
    }
}

/// Zero-pad a kHz value to 7 digits. Wider values are left as they are.
pub fn pad_frequency(khz: u32) -> String {
    format!("{:0width$}", khz, width = FREQ_FIELD_WIDTH)
}

fn check_frequency(field: &'static str, value: u32) -> Result<(), ConfigurationError> {
    if !(MIN_FREQ_KHZ..=MAX_FREQ_KHZ).contains(&value) {
        return Err(ConfigurationError::FrequencyOutOfBounds {
            field,
            value,
            min: MIN_FREQ_KHZ,
            max: MAX_FREQ_KHZ,
        });
    }
    Ok(())
}

fn check_amplitude(
    field: &'static str,
    text: &str,
    (min, max): (i32, i32),
) -> Result<(), ConfigurationError> {
    let value: i32 = parse_field(field, text)?;
    if value < min || value > max {
        return Err(ConfigurationError::AmplitudeOutOfBounds {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_width(field: &'static str, text: &str) -> Result<(), ConfigurationError> {
    if text.chars().count() != AMP_FIELD_WIDTH {
        return Err(ConfigurationError::FieldWidth {
            field,
            expected: AMP_FIELD_WIDTH,
            actual: text.to_string(),
        });
    }
    Ok(())
}

fn parse_field<T: std::str::FromStr>(field: &'static str, text: &str) -> Result<T, ConfigurationError> {
    text.trim()
        .parse()
        .map_err(|_| ConfigurationError::NotANumber {
            field,
            value: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        let config = SweepConfig::new(15_000, 2_700_000, "-010", "-100").unwrap();
        assert_eq!(config.start_field(), "0015000");
        assert_eq!(config.end_field(), "2700000");
    }

    #[test]
    fn test_end_padded_on_its_own_length() {
        let config = SweepConfig::new(1_000_000, 20_000, "-010", "-100").unwrap();
        assert_eq!(config.start_field(), "1000000");
        assert_eq!(config.end_field(), "0020000");
    }

    #[test]
    fn test_eight_digit_frequency_is_not_truncated() {
        let config = SweepConfig::new(15_000, 27_000_000, "+005", "-120").unwrap();
        assert_eq!(config.end_field(), "27000000");
    }

    #[test]
    fn test_parse_text_fields() {
        let config = SweepConfig::parse("0100000", "0200000", "-010", "-100").unwrap();
        assert_eq!(config.start_khz(), 100_000);
        assert_eq!(config.end_khz(), 200_000);
    }

    #[test]
    fn test_frequency_bounds() {
        assert!(matches!(
            SweepConfig::new(14_999, 200_000, "-010", "-100"),
            Err(ConfigurationError::FrequencyOutOfBounds { field: "start", .. })
        ));
        assert!(matches!(
            SweepConfig::new(100_000, 27_000_001, "-010", "-100"),
            Err(ConfigurationError::FrequencyOutOfBounds { field: "end", .. })
        ));
        assert!(SweepConfig::new(15_000, 27_000_000, "-010", "-100").is_ok());
    }

    #[test]
    fn test_amplitude_bounds() {
        assert!(matches!(
            SweepConfig::new(100_000, 200_000, "+006", "-100"),
            Err(ConfigurationError::AmplitudeOutOfBounds { field: "amp_top", .. })
        ));
        assert!(matches!(
            SweepConfig::new(100_000, 200_000, "-111", "-100"),
            Err(ConfigurationError::AmplitudeOutOfBounds { field: "amp_top", .. })
        ));
        assert!(matches!(
            SweepConfig::new(100_000, 200_000, "-010", "-004"),
            Err(ConfigurationError::AmplitudeOutOfBounds { field: "amp_bottom", .. })
        ));
        assert!(matches!(
            SweepConfig::new(100_000, 200_000, "-010", "-121"),
            Err(ConfigurationError::AmplitudeOutOfBounds { field: "amp_bottom", .. })
        ));
    }

    #[test]
    fn test_amp_top_width() {
        assert!(matches!(
            SweepConfig::new(100_000, 200_000, "-10", "-100"),
            Err(ConfigurationError::FieldWidth { field: "amp_top", expected: 4, .. })
        ));
    }

    #[test]
    fn test_non_numeric_fields() {
        assert!(matches!(
            SweepConfig::parse("abc", "0200000", "-010", "-100"),
            Err(ConfigurationError::NotANumber { field: "start", .. })
        ));
        assert!(matches!(
            SweepConfig::new(100_000, 200_000, "low", "-100"),
            Err(ConfigurationError::NotANumber { field: "amp_top", .. })
        ));
    }
}
