//! Band log file: one row of chunk maxima per location.
//!
//! ```text
//! latitude,longitude,100000kHz,200000kHz,...
//! 44.97,-93.26,-61,-74,...
//! ```

use std::io::{self, Write};

use crate::band::{BandPlan, BandSweep};

/// Where a band pass was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Decimal degrees, north positive.
    pub latitude: f64,
    /// Decimal degrees, east positive.
    pub longitude: f64,
}

/// Writes the header and rows of a band log.
pub struct BandLog<W: Write> {
    out: W,
    columns: usize,
    rows: usize,
}

impl<W: Write> BandLog<W> {
    /// Start a log for `plan`, writing the header immediately.
    pub fn create(mut out: W, plan: &BandPlan) -> io::Result<Self> {
        let starts = plan.chunk_starts();
        let mut header = vec!["latitude".to_string(), "longitude".to_string()];
        header.extend(starts.iter().map(|f| format!("{}kHz", f)));
        writeln!(out, "{}", header.join(","))?;
        out.flush()?;
        Ok(BandLog {
            out,
            columns: starts.len(),
            rows: 0,
        })
    }

    /// Append one band pass.
    pub fn write_row(&mut self, location: Location, band: &BandSweep) -> io::Result<()> {
        let amplitudes = band.amplitudes();
        if amplitudes.len() != self.columns {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row has {} values, header has {}", amplitudes.len(), self.columns),
            ));
        }
        let mut row = vec![location.latitude.to_string(), location.longitude.to_string()];
        row.extend(amplitudes.iter().map(i32::to_string));
        writeln!(self.out, "{}", row.join(","))?;
        // Keep the file usable if the run is interrupted.
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::{sweep_band, ChunkSweeper};
    use rfe_protocol::{RfeResult, SweepResult};
    use std::time::Duration;

    struct Flat(i32);

    impl ChunkSweeper for Flat {
        fn sweep_chunk(&mut self, start_khz: u32, _: u32, _: Duration) -> RfeResult<SweepResult> {
            Ok([(start_khz as u64 * 1000, self.0)].into_iter().collect())
        }
    }

    fn plan() -> BandPlan {
        BandPlan {
            start_khz: 100_000,
            end_khz: 300_000,
            chunk_khz: 100_000,
            dwell: Duration::ZERO,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let mut log = BandLog::create(Vec::new(), &plan()).unwrap();
        let band = sweep_band(&mut Flat(-64), &plan(), None).unwrap();
        log.write_row(Location { latitude: 44.97, longitude: -93.26 }, &band)
            .unwrap();
        assert_eq!(log.rows(), 1);

        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(
            text,
            "latitude,longitude,100000kHz,200000kHz\n44.97,-93.26,-64,-64\n"
        );
    }

    #[test]
    fn test_row_width_must_match_header() {
        let mut log = BandLog::create(Vec::new(), &plan()).unwrap();
        let err = log
            .write_row(Location { latitude: 0.0, longitude: 0.0 }, &BandSweep::default())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
