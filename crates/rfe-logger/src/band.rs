//! Chunked band sweeps.
//!
//! A band wider than the analyzer's span is split into fixed-width chunks.
//! Each chunk gets a timed max-hold sweep and is reduced to its strongest
//! amplitude, keyed by the chunk's start frequency.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{info, warn};

use rfe_protocol::{DataIntegrityError, ProtocolSession, RfeResult, SweepResult, Transport};

use crate::error::LoggerResult;

/// Anything that can run a timed sweep over one chunk.
pub trait ChunkSweeper {
    /// Max-hold sweep of `start_khz..end_khz` for `dwell`.
    fn sweep_chunk(&mut self, start_khz: u32, end_khz: u32, dwell: Duration) -> RfeResult<SweepResult>;
}

impl<T: Transport> ChunkSweeper for ProtocolSession<T> {
    fn sweep_chunk(&mut self, start_khz: u32, end_khz: u32, dwell: Duration) -> RfeResult<SweepResult> {
        self.timed_sweep(start_khz, end_khz, dwell)
    }
}

/// A band split into equal chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPlan {
    /// First frequency, kHz.
    pub start_khz: u32,
    /// End of the band, kHz. A partial last chunk is not swept.
    pub end_khz: u32,
    /// Chunk width, kHz.
    pub chunk_khz: u32,
    /// Max-hold time per chunk.
    pub dwell: Duration,
}

impl BandPlan {
    /// Start frequency of every whole chunk in the band.
    pub fn chunk_starts(&self) -> Vec<u32> {
        let chunks = (self.end_khz - self.start_khz) / self.chunk_khz;
        (0..chunks).map(|i| self.start_khz + i * self.chunk_khz).collect()
    }
}

/// How a chunk's amplitude was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkReading {
    /// Strongest amplitude seen by the sweep.
    Measured(i32),
    /// Configured fallback used because the sweep never delivered data.
    Fallback(i32),
}

impl ChunkReading {
    /// The amplitude, however it was obtained.
    pub fn dbm(&self) -> i32 {
        match self {
            ChunkReading::Measured(v) | ChunkReading::Fallback(v) => *v,
        }
    }
}

/// One amplitude per chunk, in ascending chunk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandSweep {
    readings: BTreeMap<u32, ChunkReading>,
}

impl BandSweep {
    /// Reading of the chunk starting at `start_khz`.
    pub fn get(&self, start_khz: u32) -> Option<ChunkReading> {
        self.readings.get(&start_khz).copied()
    }

    /// Amplitudes in ascending chunk order.
    pub fn amplitudes(&self) -> Vec<i32> {
        self.readings.values().map(ChunkReading::dbm).collect()
    }

    /// Number of chunks that used the fallback.
    pub fn fallback_count(&self) -> usize {
        self.readings
            .values()
            .filter(|r| matches!(r, ChunkReading::Fallback(_)))
            .count()
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether no chunk was swept.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Sweep every chunk of `plan` once.
///
/// A chunk whose sweep fails with a data-integrity error takes `fallback`
/// if one is given. Every other error, and data errors without a
/// fallback, abort the pass.
pub fn sweep_band<S: ChunkSweeper>(
    sweeper: &mut S,
    plan: &BandPlan,
    fallback: Option<i32>,
) -> LoggerResult<BandSweep> {
    Ok(sweep_band_until(sweeper, plan, fallback, || false)?.unwrap_or_default())
}

/// [`sweep_band`], checking `stop` before each chunk.
///
/// Returns `None` when `stop` ends the pass early; the partial pass is
/// dropped so every logged row covers the whole band.
pub fn sweep_band_until<S, F>(
    sweeper: &mut S,
    plan: &BandPlan,
    fallback: Option<i32>,
    mut stop: F,
) -> LoggerResult<Option<BandSweep>>
where
    S: ChunkSweeper,
    F: FnMut() -> bool,
{
    let mut band = BandSweep::default();
    for start in plan.chunk_starts() {
        if stop() {
            info!("Pass stopped before {} kHz", start);
            return Ok(None);
        }
        let end = start + plan.chunk_khz;
        info!("Sweeping from {} to {} kHz...", start, end);

        let swept = sweeper.sweep_chunk(start, end, plan.dwell).and_then(|result| {
            result.max_amplitude().ok_or_else(|| {
                DataIntegrityError::EmptySweep {
                    start_khz: start,
                    end_khz: end,
                }
                .into()
            })
        });
        let reading = match swept {
            Ok(max) => ChunkReading::Measured(max),
            Err(e) if e.is_data_integrity() => match fallback {
                Some(value) => {
                    warn!("chunk {} kHz failed ({}), using fallback {} dBm", start, e, value);
                    ChunkReading::Fallback(value)
                }
                None => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        };

        info!("\tMax: {} dBm", reading.dbm());
        band.readings.insert(start, reading);
    }
    Ok(Some(band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoggerError;
    use rfe_protocol::{ProtocolError, RfeError};
    use std::collections::VecDeque;

    /// Replays canned chunk results and records the requested windows.
    struct Replay {
        results: VecDeque<RfeResult<SweepResult>>,
        calls: Vec<(u32, u32, Duration)>,
    }

    impl ChunkSweeper for Replay {
        fn sweep_chunk(&mut self, start_khz: u32, end_khz: u32, dwell: Duration) -> RfeResult<SweepResult> {
            self.calls.push((start_khz, end_khz, dwell));
            self.results.pop_front().unwrap()
        }
    }

    fn result(values: &[i32]) -> RfeResult<SweepResult> {
        Ok(values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as u64 * 1000, v))
            .collect())
    }

    fn no_data() -> RfeResult<SweepResult> {
        Err(RfeError::DataIntegrity(DataIntegrityError::NoValidFrame {
            expected: 112,
            attempts: 3,
            elapsed: Duration::ZERO,
        }))
    }

    fn plan() -> BandPlan {
        BandPlan {
            start_khz: 100_000,
            end_khz: 400_000,
            chunk_khz: 100_000,
            dwell: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_chunk_starts() {
        assert_eq!(plan().chunk_starts(), vec![100_000, 200_000, 300_000]);
        let partial = BandPlan { end_khz: 450_000, ..plan() };
        assert_eq!(partial.chunk_starts().len(), 3);
    }

    #[test]
    fn test_sweep_band_takes_chunk_maximum() {
        let mut replay = Replay {
            results: VecDeque::from(vec![result(&[-80, -45, -90]), result(&[-70]), result(&[-100, -99])]),
            calls: Vec::new(),
        };
        let band = sweep_band(&mut replay, &plan(), None).unwrap();

        assert_eq!(band.amplitudes(), vec![-45, -70, -99]);
        assert_eq!(band.get(200_000), Some(ChunkReading::Measured(-70)));
        assert_eq!(replay.calls[0], (100_000, 200_000, Duration::from_secs(5)));
        assert_eq!(replay.calls[2], (300_000, 400_000, Duration::from_secs(5)));
    }

    #[test]
    fn test_fallback_for_failed_chunk() {
        let mut replay = Replay {
            results: VecDeque::from(vec![result(&[-60]), no_data(), result(&[-75])]),
            calls: Vec::new(),
        };
        let band = sweep_band(&mut replay, &plan(), Some(-120)).unwrap();

        assert_eq!(band.get(200_000), Some(ChunkReading::Fallback(-120)));
        assert_eq!(band.amplitudes(), vec![-60, -120, -75]);
        assert_eq!(band.fallback_count(), 1);
    }

    #[test]
    fn test_failed_chunk_without_fallback_aborts() {
        let mut replay = Replay {
            results: VecDeque::from(vec![result(&[-60]), no_data()]),
            calls: Vec::new(),
        };
        let err = sweep_band(&mut replay, &plan(), None).unwrap_err();
        assert!(matches!(err, LoggerError::Rfe(RfeError::DataIntegrity(_))));
        assert_eq!(replay.calls.len(), 2);
    }

    #[test]
    fn test_empty_chunk_result() {
        let mut replay = Replay {
            results: VecDeque::from(vec![result(&[]), result(&[-70]), result(&[])]),
            calls: Vec::new(),
        };
        let band = sweep_band(&mut replay, &plan(), Some(-120)).unwrap();
        assert_eq!(band.amplitudes(), vec![-120, -70, -120]);

        let mut replay = Replay {
            results: VecDeque::from(vec![result(&[])]),
            calls: Vec::new(),
        };
        let err = sweep_band(&mut replay, &plan(), None).unwrap_err();
        assert!(matches!(
            err,
            LoggerError::Rfe(RfeError::DataIntegrity(DataIntegrityError::EmptySweep {
                start_khz: 100_000,
                end_khz: 200_000,
            }))
        ));
    }

    #[test]
    fn test_stop_between_chunks() {
        let mut replay = Replay {
            results: VecDeque::from(vec![result(&[-60]), result(&[-70]), result(&[-80])]),
            calls: Vec::new(),
        };
        let mut checks = 0;
        let band = sweep_band_until(&mut replay, &plan(), None, || {
            checks += 1;
            checks > 1
        })
        .unwrap();

        assert_eq!(band, None);
        assert_eq!(replay.calls.len(), 1);
    }

    #[test]
    fn test_protocol_errors_ignore_fallback() {
        let mut replay = Replay {
            results: VecDeque::from(vec![Err(RfeError::Protocol(ProtocolError::NotReady(
                rfe_protocol::ConnectionState::Faulted,
            )))]),
            calls: Vec::new(),
        };
        let err = sweep_band(&mut replay, &plan(), Some(-120)).unwrap_err();
        assert!(matches!(err, LoggerError::Rfe(RfeError::Protocol(_))));
    }
}
