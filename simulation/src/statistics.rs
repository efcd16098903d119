//! Detection-rate statistics.
//!
//! Rates are percentages throughout: `100 * detected / total`.

use crate::{SimulationError, SimulationResult};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Confidence level used for reported intervals
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Percentage of `total` that `detected` represents; zero when nothing was attempted
pub fn detection_rate(detected: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * detected as f64 / total as f64
}

/// Confidence interval on a detection rate, in percent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateInterval {
    pub lower: f64,
    pub upper: f64,
    pub confidence: f64,
}

impl RateInterval {
    pub fn contains(&self, rate: f64) -> bool {
        (self.lower..=self.upper).contains(&rate)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Wilson score interval for `successes` out of `trials` Bernoulli draws
pub fn wilson_interval(successes: usize, trials: usize, confidence: f64) -> SimulationResult<RateInterval> {
    if trials == 0 {
        return Err(SimulationError::Statistics(
            "cannot build an interval over zero trials".to_string(),
        ));
    }
    if successes > trials {
        return Err(SimulationError::Statistics(format!(
            "{} successes exceed {} trials",
            successes, trials
        )));
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(SimulationError::Statistics(format!(
            "confidence must lie in (0, 1), got {}",
            confidence
        )));
    }

    let standard = Normal::new(0.0, 1.0).map_err(|e| SimulationError::Statistics(e.to_string()))?;
    let z = standard.inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;

    let denominator = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denominator;
    let half_width = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denominator;

    Ok(RateInterval {
        lower: 100.0 * (center - half_width).max(0.0),
        upper: 100.0 * (center + half_width).min(1.0),
        confidence,
    })
}

/// Spread of per-trial detection rates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RateStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
}

/// Summarize per-trial rates; all zero for an empty slice
pub fn rate_statistics(rates: &[f64]) -> RateStatistics {
    if rates.is_empty() {
        return RateStatistics::default();
    }

    let mut sorted: Vec<OrderedFloat<f64>> = rates.iter().copied().map(OrderedFloat).collect();
    sorted.sort();

    let min = sorted.first().map(|v| v.0).unwrap_or(0.0);
    let max = sorted.last().map(|v| v.0).unwrap_or(0.0);
    let p95_index = ((rates.len() as f64) * 0.95) as usize;
    let p95 = sorted.get(p95_index).map(|v| v.0).unwrap_or(max);

    RateStatistics {
        mean: rates.iter().mean(),
        std_dev: if rates.len() > 1 { rates.iter().population_std_dev() } else { 0.0 },
        min,
        max,
        p95,
    }
}

/// Interval estimates and per-trial spread for baseline and ensemble
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectionStatistics {
    pub baseline_interval: RateInterval,
    pub ensemble_interval: RateInterval,
    pub baseline_per_trial: RateStatistics,
    pub ensemble_per_trial: RateStatistics,
}

impl DetectionStatistics {
    /// `per_trial` holds `(baseline_detected, ensemble_detected)` per trial
    pub fn compute(per_trial: &[(usize, usize)], attacks_per_trial: usize) -> SimulationResult<Self> {
        let total = per_trial.len() * attacks_per_trial;
        let baseline: usize = per_trial.iter().map(|(b, _)| b).sum();
        let ensemble: usize = per_trial.iter().map(|(_, e)| e).sum();

        let baseline_rates: Vec<f64> = per_trial
            .iter()
            .map(|&(b, _)| detection_rate(b, attacks_per_trial))
            .collect();
        let ensemble_rates: Vec<f64> = per_trial
            .iter()
            .map(|&(_, e)| detection_rate(e, attacks_per_trial))
            .collect();

        Ok(Self {
            baseline_interval: wilson_interval(baseline, total, DEFAULT_CONFIDENCE)?,
            ensemble_interval: wilson_interval(ensemble, total, DEFAULT_CONFIDENCE)?,
            baseline_per_trial: rate_statistics(&baseline_rates),
            ensemble_per_trial: rate_statistics(&ensemble_rates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_rate() {
        assert_eq!(detection_rate(50, 200), 25.0);
        assert_eq!(detection_rate(0, 10), 0.0);
        assert_eq!(detection_rate(10, 10), 100.0);
        assert_eq!(detection_rate(0, 0), 0.0);
    }

    #[test]
    fn test_wilson_interval_brackets_rate() {
        let interval = wilson_interval(30, 100, 0.95).unwrap();
        assert!(interval.contains(30.0));
        assert!(interval.lower > 20.0 && interval.upper < 41.0);
        assert_eq!(interval.confidence, 0.95);

        let narrow = wilson_interval(3000, 10000, 0.95).unwrap();
        assert!(narrow.width() < interval.width());
    }

    #[test]
    fn test_wilson_interval_extremes_stay_in_bounds() {
        let none = wilson_interval(0, 50, 0.95).unwrap();
        assert!(none.lower < 1e-9);
        assert!(none.upper > 0.0);

        let all = wilson_interval(50, 50, 0.95).unwrap();
        assert!(all.upper <= 100.0 && all.upper > 99.999);
        assert!(all.lower < 100.0);
    }

    #[test]
    fn test_wilson_interval_rejects_bad_input() {
        assert!(wilson_interval(1, 0, 0.95).is_err());
        assert!(wilson_interval(5, 4, 0.95).is_err());
        assert!(wilson_interval(1, 4, 1.0).is_err());
    }

    #[test]
    fn test_rate_statistics() {
        let stats = rate_statistics(&[20.0, 40.0, 60.0, 80.0]);
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.min, 20.0);
        assert_eq!(stats.max, 80.0);
        assert_eq!(stats.p95, 80.0);
        assert!((stats.std_dev - 500.0_f64.sqrt()).abs() < 1e-9);

        assert_eq!(rate_statistics(&[]), RateStatistics::default());
        assert_eq!(rate_statistics(&[7.0]).std_dev, 0.0);
    }

    #[test]
    fn test_detection_statistics() {
        let stats = DetectionStatistics::compute(&[(1, 2), (0, 2)], 2).unwrap();
        assert_eq!(stats.baseline_per_trial.mean, 25.0);
        assert_eq!(stats.ensemble_per_trial.min, 100.0);
        assert!(stats.ensemble_interval.upper > 99.999);
        assert!(stats.baseline_interval.contains(25.0));
    }
}
