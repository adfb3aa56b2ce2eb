//! Rhythm analysis on detected spike times.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Burst {
    /// Time of the first spike, ms.
    pub start: f64,
    /// Time of the last spike, ms.
    pub end: f64,
    pub num_spikes: usize,
}

impl Burst {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmStats {
    pub period_mean: f64,
    pub period_std_dev: f64,
    pub duty_cycle_mean: f64,
    pub spikes_per_burst_mean: f64,
}

/// Groups ordered spike times into bursts. Consecutive spikes belong to the same burst if they
/// are at most `max_intra_burst_interval` apart; an isolated spike forms a burst of its own.
pub fn detect_bursts(spike_times: &[f64], max_intra_burst_interval: f64) -> Vec<Burst> {
    spike_times
        .iter()
        .map(|&t| Burst {
            start: t,
            end: t,
            num_spikes: 1,
        })
        .coalesce(|current, next| {
            if next.start - current.end <= max_intra_burst_interval {
                Ok(Burst {
                    start: current.start,
                    end: next.end,
                    num_spikes: current.num_spikes + 1,
                })
            } else {
                Err((current, next))
            }
        })
        .collect()
}

/// Cycle statistics over consecutive bursts. `None` with fewer than two bursts.
pub fn rhythm_stats(bursts: &[Burst]) -> Option<RhythmStats> {
    if bursts.len() < 2 {
        return None;
    }

    let periods: Vec<f64> = bursts
        .iter()
        .tuple_windows()
        .map(|(current, next)| next.start - current.start)
        .collect();

    let duty_cycles: Vec<f64> = bursts
        .iter()
        .zip(&periods)
        .map(|(burst, period)| burst.duration() / period)
        .collect();

    Some(RhythmStats {
        period_mean: periods.iter().mean(),
        period_std_dev: periods.iter().population_std_dev(),
        duty_cycle_mean: duty_cycles.iter().mean(),
        spikes_per_burst_mean: bursts.iter().map(|burst| burst.num_spikes as f64).mean(),
    })
}

/// Phase in `[0, 1)` of each burst onset of `other` within the enclosing cycle of `reference`.
/// Onsets outside of any complete reference cycle are skipped.
pub fn onset_phases(reference: &[Burst], other: &[Burst]) -> Vec<f64> {
    let cycles: Vec<(f64, f64)> = reference
        .iter()
        .tuple_windows()
        .map(|(current, next)| (current.start, next.start))
        .collect();

    other
        .iter()
        .filter_map(|burst| {
            let cycle_idx = cycles.partition_point(|(_, cycle_end)| *cycle_end <= burst.start);

            cycles
                .get(cycle_idx)
                .filter(|(cycle_start, _)| *cycle_start <= burst.start)
                .map(|(cycle_start, cycle_end)| {
                    (burst.start - cycle_start) / (cycle_end - cycle_start)
                })
        })
        .collect()
}

/// Mean firing rate in Hz within `[t_start, t_end)` (times in ms).
pub fn firing_rate(spike_times: &[f64], t_start: f64, t_end: f64) -> f64 {
    if t_end <= t_start {
        return 0.0;
    }

    let count = spike_times
        .iter()
        .filter(|&&t| t_start <= t && t < t_end)
        .count();

    1000.0 * count as f64 / (t_end - t_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use itertools::assert_equal;

    fn burst(start: f64, end: f64, num_spikes: usize) -> Burst {
        Burst {
            start,
            end,
            num_spikes,
        }
    }

    #[test]
    fn bursts() {
        let spike_times = [10.0, 15.0, 20.0, 200.0, 230.0, 500.0];

        assert_equal(
            detect_bursts(&spike_times, 50.0),
            [
                burst(10.0, 20.0, 3),
                burst(200.0, 230.0, 2),
                burst(500.0, 500.0, 1),
            ],
        );

        assert_eq!(detect_bursts(&spike_times, 1.0).len(), 6);
        assert!(detect_bursts(&[], 1.0).is_empty());
    }

    #[test]
    fn stats() {
        let bursts = [
            burst(0.0, 100.0, 4),
            burst(400.0, 600.0, 6),
            burst(1000.0, 1200.0, 8),
        ];

        let stats = rhythm_stats(&bursts).unwrap();

        assert_approx_eq!(f64, stats.period_mean, 500.0);
        assert_approx_eq!(f64, stats.period_std_dev, 100.0);
        assert_approx_eq!(
            f64,
            stats.duty_cycle_mean,
            (0.25 + 200.0 / 600.0) / 2.0,
            epsilon = 1e-12
        );
        assert_approx_eq!(f64, stats.spikes_per_burst_mean, 6.0);

        assert!(rhythm_stats(&bursts[..1]).is_none());
    }

    #[test]
    fn phases() {
        let reference = [
            burst(0.0, 10.0, 2),
            burst(100.0, 110.0, 2),
            burst(200.0, 210.0, 2),
        ];
        let other = [
            burst(-10.0, 0.0, 1),
            burst(25.0, 30.0, 2),
            burst(100.0, 105.0, 2),
            burst(175.0, 180.0, 2),
            burst(250.0, 260.0, 2),
        ];

        assert_equal(onset_phases(&reference, &other), [0.25, 0.0, 0.75]);
    }

    #[test]
    fn rate() {
        let spike_times = [5.0, 10.0, 250.0, 999.0, 1000.0];

        assert_approx_eq!(f64, firing_rate(&spike_times, 0.0, 1000.0), 4.0);
        assert_approx_eq!(f64, firing_rate(&spike_times, 0.0, 500.0), 6.0);
        assert_approx_eq!(f64, firing_rate(&spike_times, 10.0, 10.0), 0.0);
    }
}
