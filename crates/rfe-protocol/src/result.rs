//! Sweep results and their aggregation over time.

use std::collections::BTreeMap;

use crate::error::DataIntegrityError;
use crate::frame::DataFrame;
use crate::plan::FrequencyPlan;

/// Amplitude per absolute frequency.
///
/// Keys are frequencies in Hz, values amplitudes in dBm. Iteration is in
/// ascending frequency order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepResult {
    readings: BTreeMap<u64, i32>,
}

impl SweepResult {
    /// An empty result.
    pub fn new() -> Self {
        SweepResult::default()
    }

    /// Pair each plan frequency with the frame sample at the same index.
    pub fn from_frame(plan: &FrequencyPlan, frame: &DataFrame) -> Result<Self, DataIntegrityError> {
        if plan.len() != frame.len() {
            return Err(DataIntegrityError::LengthMismatch {
                expected: plan.len(),
                actual: frame.len(),
            });
        }
        let readings = plan
            .frequencies()
            .iter()
            .copied()
            .zip(frame.amplitudes())
            .collect();
        Ok(SweepResult { readings })
    }

    /// Record a reading, replacing any previous value for that frequency.
    ///
    /// This is also how a caller-supplied fallback amplitude enters a result.
    pub fn insert(&mut self, frequency_hz: u64, amplitude_dbm: i32) {
        self.readings.insert(frequency_hz, amplitude_dbm);
    }

    /// Keep the larger amplitude for every frequency present in either result.
    pub fn merge_max(&mut self, other: &SweepResult) {
        for (&freq, &amp) in &other.readings {
            self.readings
                .entry(freq)
                .and_modify(|current| *current = (*current).max(amp))
                .or_insert(amp);
        }
    }

    /// Amplitude at a frequency.
    pub fn get(&self, frequency_hz: u64) -> Option<i32> {
        self.readings.get(&frequency_hz).copied()
    }

    /// Strongest amplitude in the result.
    pub fn max_amplitude(&self) -> Option<i32> {
        self.readings.values().copied().max()
    }

    /// `(frequency_hz, amplitude_dbm)` pairs in ascending frequency order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, i32)> + '_ {
        self.readings.iter().map(|(&f, &a)| (f, a))
    }

    /// Number of frequencies.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the result holds no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromIterator<(u64, i32)> for SweepResult {
    fn from_iter<I: IntoIterator<Item = (u64, i32)>>(iter: I) -> Self {
        SweepResult {
            readings: iter.into_iter().collect(),
        }
    }
}

/// Max-hold over any number of frames that share one frequency plan.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    plan: FrequencyPlan,
    maxima: Option<Vec<i32>>,
    frames: usize,
}

impl ResultAggregator {
    /// Start aggregating against `plan`.
    pub fn new(plan: FrequencyPlan) -> Self {
        ResultAggregator {
            plan,
            maxima: None,
            frames: 0,
        }
    }

    /// Fold a frame into the running maxima.
    pub fn push(&mut self, frame: &DataFrame) -> Result<(), DataIntegrityError> {
        if frame.len() != self.plan.len() {
            return Err(DataIntegrityError::LengthMismatch {
                expected: self.plan.len(),
                actual: frame.len(),
            });
        }
        let amplitudes = frame.amplitudes();
        match &mut self.maxima {
            Some(maxima) => {
                for (held, amp) in maxima.iter_mut().zip(amplitudes) {
                    *held = (*held).max(amp);
                }
            }
            None => self.maxima = Some(amplitudes),
        }
        self.frames += 1;
        Ok(())
    }

    /// Frames folded in so far.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// The plan frames are aggregated against.
    pub fn plan(&self) -> &FrequencyPlan {
        &self.plan
    }

    /// The max-hold result. Empty if no frame was pushed.
    pub fn finish(self) -> SweepResult {
        match self.maxima {
            Some(maxima) => self
                .plan
                .frequencies()
                .iter()
                .copied()
                .zip(maxima)
                .collect(),
            None => SweepResult::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SWEEP_POINTS;

    fn plan() -> FrequencyPlan {
        FrequencyPlan::build(100_000_000, 1_000_000, SWEEP_POINTS as u32).unwrap()
    }

    fn frame(fill: u8) -> DataFrame {
        DataFrame::new(vec![fill; SWEEP_POINTS]).unwrap()
    }

    #[test]
    fn test_from_frame_zips_in_order() {
        let mut samples = vec![100u8; SWEEP_POINTS];
        samples[0] = 20;
        samples[111] = 255;
        let result = SweepResult::from_frame(&plan(), &DataFrame::new(samples).unwrap()).unwrap();
        assert_eq!(result.len(), SWEEP_POINTS);
        assert_eq!(result.get(100_000_000), Some(-10));
        assert_eq!(result.get(101_000_000), Some(-50));
        assert_eq!(result.get(211_000_000), Some(-127));
    }

    #[test]
    fn test_aggregator_keeps_maximum() {
        let mut agg = ResultAggregator::new(plan());
        agg.push(&frame(100)).unwrap();

        let mut samples = vec![160u8; SWEEP_POINTS];
        samples[5] = 40;
        agg.push(&DataFrame::new(samples).unwrap()).unwrap();
        assert_eq!(agg.frame_count(), 2);

        let result = agg.finish();
        assert_eq!(result.get(100_000_000), Some(-50));
        assert_eq!(result.get(105_000_000), Some(-20));
    }

    #[test]
    fn test_aggregator_without_frames_is_empty() {
        assert!(ResultAggregator::new(plan()).finish().is_empty());
    }

    #[test]
    fn test_merge_max() {
        let mut a: SweepResult = [(1, -50), (2, -70)].into_iter().collect();
        let b: SweepResult = [(2, -60), (3, -90)].into_iter().collect();
        a.merge_max(&b);
        assert_eq!(a.get(1), Some(-50));
        assert_eq!(a.get(2), Some(-60));
        assert_eq!(a.get(3), Some(-90));
        assert_eq!(a.max_amplitude(), Some(-50));
    }
}
