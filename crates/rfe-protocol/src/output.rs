//! Rendering sweep results.
//!
//! The text format is one `<freqMHz>,<amplitudeDBm>` row per frequency in
//! ascending order. Frequencies are rendered from their decimal Hz string
//! as characters `0..3`, a `.`, then characters `4..7`; the fourth digit is
//! dropped. Consumers of existing logs depend on this exact rendering.

use std::io::{self, Write};

use crate::result::SweepResult;

/// Amplitudes in ascending frequency order.
pub fn to_ordered_amplitudes(result: &SweepResult) -> Vec<i32> {
    result.iter().map(|(_, amp)| amp).collect()
}

/// All rows of the text format, each terminated by `\n`.
pub fn to_delimited_text(result: &SweepResult) -> String {
    result
        .iter()
        .map(|(freq, amp)| format!("{},{}\n", format_frequency(freq), amp))
        .collect()
}

/// Render a frequency in Hz with the digit-dropping rule.
///
/// `100000000` renders as `100.000`, `123456789` as `123.567`. Short
/// values are clamped rather than padded.
pub fn format_frequency(frequency_hz: u64) -> String {
    let digits = frequency_hz.to_string();
    format!("{}.{}", clamp_slice(&digits, 0, 3), clamp_slice(&digits, 4, 7))
}

fn clamp_slice(s: &str, start: usize, end: usize) -> &str {
    let end = end.min(s.len());
    let start = start.min(end);
    &s[start..end]
}

/// Write the text format to `out`.
pub fn write_csv<W: Write>(out: &mut W, result: &SweepResult) -> io::Result<()> {
    out.write_all(to_delimited_text(result).as_bytes())?;
    out.flush()
}

/// Append `.csv` unless the name already ends with it.
pub fn csv_file_name(name: &str) -> String {
    if name.ends_with(".csv") {
        name.to_string()
    } else {
        format!("{}.csv", name)
    }
}
