//! Frequency plan derived from the device's configuration frame.

use crate::constants::SWEEP_POINTS;
use crate::error::ConfigurationError;
use crate::frame::ConfigFrame;

/// The ordered set of absolute frequencies a sweep reports against.
///
/// Always holds exactly [`SWEEP_POINTS`] entries, spaced by `step_hz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyPlan {
    frequencies: Vec<u64>,
    start_hz: u64,
    step_hz: u64,
}

impl FrequencyPlan {
    /// Build the plan from a start frequency, step and point count.
    ///
    /// Entry 0 is `start_hz`, every following entry adds `step_hz` to the
    /// previous one. Fails unless the result has [`SWEEP_POINTS`] entries.
    pub fn build(start_hz: u64, step_hz: u64, steps: u32) -> Result<FrequencyPlan, ConfigurationError> {
        // The first entry is always present, so zero steps still yields one point.
        let count = (steps as usize).max(1);
        if count != SWEEP_POINTS {
            return Err(ConfigurationError::PlanLength {
                expected: SWEEP_POINTS,
                actual: count,
            });
        }

        let mut frequencies = Vec::with_capacity(count);
        frequencies.push(start_hz);
        for i in 1..count {
            let next = frequencies[i - 1] + step_hz;
            frequencies.push(next);
        }

        Ok(FrequencyPlan {
            frequencies,
            start_hz,
            step_hz,
        })
    }

    /// Build the plan a configuration frame describes.
    pub fn from_config(config: &ConfigFrame) -> Result<FrequencyPlan, ConfigurationError> {
        Self::build(config.start_hz(), config.step_hz, config.sweep_steps)
    }

    /// Frequencies in Hz, ascending.
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    /// Number of points (always [`SWEEP_POINTS`]).
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Always false for a built plan.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// First frequency in Hz.
    pub fn start_hz(&self) -> u64 {
        self.start_hz
    }

    /// Distance between points in Hz.
    pub fn step_hz(&self) -> u64 {
        self.step_hz
    }

    /// Sweep span: step times the point count.
    pub fn span_hz(&self) -> u64 {
        self.step_hz * self.frequencies.len() as u64
    }

    /// `start + span`.
    pub fn end_hz(&self) -> u64 {
        self.start_hz + self.span_hz()
    }

    /// `start + span / 2`.
    pub fn center_hz(&self) -> u64 {
        self.start_hz + self.span_hz() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_plan() {
        let plan = FrequencyPlan::build(100_000_000, 892_857, 112).unwrap();
        assert_eq!(plan.len(), SWEEP_POINTS);
        assert_eq!(plan.frequencies()[0], 100_000_000);
        assert_eq!(plan.frequencies()[1], 100_892_857);
        assert_eq!(plan.frequencies()[111], 100_000_000 + 111 * 892_857);
        assert!(plan.frequencies().windows(2).all(|w| w[1] - w[0] == 892_857));
    }

    #[test]
    fn test_derived_values() {
        let plan = FrequencyPlan::build(100_000_000, 1_000_000, 112).unwrap();
        assert_eq!(plan.span_hz(), 112_000_000);
        assert_eq!(plan.end_hz(), 212_000_000);
        assert_eq!(plan.center_hz(), 156_000_000);
    }

    #[test]
    fn test_wrong_point_count() {
        assert_eq!(
            FrequencyPlan::build(100_000_000, 1_000, 111),
            Err(ConfigurationError::PlanLength { expected: 112, actual: 111 })
        );
        assert_eq!(
            FrequencyPlan::build(100_000_000, 1_000, 0),
            Err(ConfigurationError::PlanLength { expected: 112, actual: 1 })
        );
    }

    #[test]
    fn test_from_config() {
        let config = ConfigFrame::parse_payload(
            "0240000,0100000,-010,-100,0112,0,000,0015000,2700000,0600000,00110",
        )
        .unwrap();
        let plan = FrequencyPlan::from_config(&config).unwrap();
        assert_eq!(plan.start_hz(), 240_000_000);
        assert_eq!(plan.step_hz(), 100_000);
    }
}
