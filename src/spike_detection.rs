use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::params::SpikeDetectionParams;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub nid: usize,
    pub t: f64,
}

/// Lazy pass over `(t, voltage)` samples yielding upward threshold crossing times.
///
/// Crossing times are linearly interpolated between the last sample below and the first sample
/// at or above the threshold. A crossing within the refractory period of the last emitted event
/// is merged into that event.
pub struct SpikeTimes<I> {
    samples: I,
    threshold: f64,
    refractory_period: f64,
    prev_sample: Option<(f64, f64)>,
    last_spike_t: Option<f64>,
}

pub fn spike_times<I>(samples: I, params: &SpikeDetectionParams) -> SpikeTimes<I::IntoIter>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    SpikeTimes {
        samples: samples.into_iter(),
        threshold: params.threshold,
        refractory_period: params.refractory_period,
        prev_sample: None,
        last_spike_t: None,
    }
}

impl<I> Iterator for SpikeTimes<I>
where
    I: Iterator<Item = (f64, f64)>,
{
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        for (t, voltage) in self.samples.by_ref() {
            let prev_sample = self.prev_sample.replace((t, voltage));

            let (prev_t, prev_voltage) = match prev_sample {
                Some(prev_sample) => prev_sample,
                None => continue,
            };

            if prev_voltage >= self.threshold || voltage < self.threshold {
                continue;
            }

            let fraction = (self.threshold - prev_voltage) / (voltage - prev_voltage);
            let crossing_t = prev_t + fraction * (t - prev_t);

            if let Some(last_spike_t) = self.last_spike_t {
                if crossing_t - last_spike_t < self.refractory_period {
                    continue;
                }
            }

            self.last_spike_t = Some(crossing_t);
            return Some(crossing_t);
        }

        None
    }
}

/// Per-neuron spike times of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeTable {
    spike_times: Vec<Vec<f64>>,
}

impl SpikeTable {
    pub fn new(spike_times: Vec<Vec<f64>>) -> Self {
        Self { spike_times }
    }

    pub fn num_neurons(&self) -> usize {
        self.spike_times.len()
    }

    pub fn spike_times(&self, nid: usize) -> &[f64] {
        &self.spike_times[nid]
    }

    pub fn spike_count(&self, nid: usize) -> usize {
        self.spike_times[nid].len()
    }

    pub fn total_spike_count(&self) -> usize {
        self.spike_times.iter().map(Vec::len).sum()
    }

    /// All events of all neurons, ordered by time. Simultaneous events are ordered by neuron.
    pub fn events(&self) -> Vec<SpikeEvent> {
        self.spike_times
            .iter()
            .enumerate()
            .map(|(nid, spike_times)| spike_times.iter().map(move |&t| SpikeEvent { nid, t }))
            .kmerge_by(|a, b| a.t < b.t || (a.t == b.t && a.nid < b.nid))
            .collect()
    }

    /// Events at or after `t_start`.
    pub fn events_after(&self, t_start: f64) -> Vec<SpikeEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.t >= t_start)
            .collect()
    }
}
