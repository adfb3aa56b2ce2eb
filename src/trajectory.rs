use log::warn;
use simple_error::SimpleError;

use crate::{
    error::Result,
    neuron::NUM_CORE_STATE_VARS,
    network::{Network, StateLayout},
    params::SpikeDetectionParams,
    spike_detection::{self, SpikeTable},
    state_snapshot::{NeuronState, StateSnapshot, SynapseState},
};

/// Uniformly sampled run output, stored as one contiguous `num_samples × state_len` buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    dt: f64,
    layout: StateLayout,
    synapse_endpoints: Vec<(usize, usize)>,
    data: Vec<f64>,
}

impl Trajectory {
    /// Fails if the buffer for `num_samples` samples cannot be sized or allocated.
    pub(crate) fn with_capacity(network: &Network, dt: f64, num_samples: usize) -> Result<Self> {
        let capacity = num_samples
            .checked_mul(network.state_len())
            .ok_or_else(|| {
                SimpleError::new(format!(
                    "trajectory of {} samples exceeds the addressable size",
                    num_samples
                ))
            })?;

        let mut data: Vec<f64> = Vec::new();
        data.try_reserve_exact(capacity).map_err(|err| {
            SimpleError::new(format!(
                "cannot allocate trajectory of {} samples: {}",
                num_samples, err
            ))
        })?;

        Ok(Self {
            dt,
            layout: network.layout().clone(),
            synapse_endpoints: network
                .synapses()
                .map(|synapse| (synapse.pre_syn_nid, synapse.post_syn_nid))
                .collect(),
            data,
        })
    }

    pub(crate) fn push(&mut self, state: &[f64]) {
        debug_assert_eq!(state.len(), self.state_len());
        self.data.extend_from_slice(state);
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn state_len(&self) -> usize {
        self.layout.len()
    }

    pub fn num_neurons(&self) -> usize {
        self.layout.num_neurons()
    }

    pub fn num_samples(&self) -> usize {
        if self.state_len() == 0 {
            0
        } else {
            self.data.len() / self.state_len()
        }
    }

    pub fn time(&self, sample_idx: usize) -> f64 {
        sample_idx as f64 * self.dt
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num_samples()).map(|sample_idx| self.time(sample_idx))
    }

    pub fn sample(&self, sample_idx: usize) -> &[f64] {
        let start = sample_idx * self.state_len();
        &self.data[start..start + self.state_len()]
    }

    pub fn samples(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.state_len().max(1))
    }

    pub fn last_sample(&self) -> Option<&[f64]> {
        self.num_samples()
            .checked_sub(1)
            .map(|sample_idx| self.sample(sample_idx))
    }

    fn trace(&self, state_idx: usize) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .skip(state_idx)
            .step_by(self.state_len())
            .copied()
    }

    pub fn voltage_trace(&self, nid: usize) -> impl Iterator<Item = f64> + '_ {
        self.trace(self.layout.voltage_idx(nid))
    }

    pub fn calcium_trace(&self, nid: usize) -> impl Iterator<Item = f64> + '_ {
        self.trace(self.layout.calcium_idx(nid))
    }

    /// `None` for synapses without activation kinetics.
    pub fn synapse_activation_trace(
        &self,
        synapse_id: usize,
    ) -> Option<impl Iterator<Item = f64> + '_> {
        self.layout
            .synapse_idx(synapse_id)
            .map(|state_idx| self.trace(state_idx))
    }

    /// Mean membrane potential over all samples at or after `t_start`.
    pub fn mean_voltage(&self, nid: usize, t_start: f64) -> Option<f64> {
        let (count, sum) = self
            .times()
            .zip(self.voltage_trace(nid))
            .filter(|(t, _)| *t >= t_start)
            .fold((0usize, 0.0), |(count, sum), (_, voltage)| {
                (count + 1, sum + voltage)
            });

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn snapshot(&self, sample_idx: usize) -> StateSnapshot {
        let state = self.sample(sample_idx);

        let neuron_states = (0..self.num_neurons())
            .map(|nid| {
                let block = &state[self.layout.neuron_range(nid)];
                NeuronState {
                    voltage: block[0],
                    calcium: block[1],
                    gates: block[NUM_CORE_STATE_VARS..].to_vec(),
                }
            })
            .collect();

        let synapse_states = self
            .synapse_endpoints
            .iter()
            .enumerate()
            .map(|(synapse_id, (pre_syn_nid, post_syn_nid))| SynapseState {
                pre_syn_nid: *pre_syn_nid,
                post_syn_nid: *post_syn_nid,
                activation: self
                    .layout
                    .synapse_idx(synapse_id)
                    .map(|state_idx| state[state_idx]),
            })
            .collect();

        StateSnapshot {
            t: self.time(sample_idx),
            neuron_states,
            synapse_states,
        }
    }

    /// Runs a fresh detection pass over every neuron's voltage trace.
    pub fn detect_spikes(&self, params: &SpikeDetectionParams) -> SpikeTable {
        let spike_times: Vec<Vec<f64>> = (0..self.num_neurons())
            .map(|nid| {
                spike_detection::spike_times(self.times().zip(self.voltage_trace(nid)), params)
                    .collect()
            })
            .collect();

        for (nid, times) in spike_times.iter().enumerate() {
            if times.is_empty() {
                warn!(
                    "neuron {} never crossed the spike threshold of {} mV",
                    nid, params.threshold
                );
            }
        }

        SpikeTable::new(spike_times)
    }
}
