use std::ops::Range;

use log::debug;
use simple_error::{try_with, SimpleError};

use crate::{
    error::Result,
    neuron::{Neuron, CALCIUM_IDX, VOLTAGE_IDX},
    params::{self, InitialConditions, NetworkParams},
    synapse::Synapse,
};

/// Owner of a state vector entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOwner {
    Neuron(usize),
    Synapse(usize),
}

/// Offsets of every neuron and synapse block within the flat state vector. Neuron blocks come
/// first in construction order, followed by one activation entry per chemical synapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    neuron_offsets: Vec<usize>,
    synapse_idxs: Vec<Option<usize>>,
    neuron_block_end: usize,
    len: usize,
}

impl StateLayout {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_neurons(&self) -> usize {
        self.neuron_offsets.len()
    }

    pub fn num_synapses(&self) -> usize {
        self.synapse_idxs.len()
    }

    pub fn neuron_range(&self, nid: usize) -> Range<usize> {
        let start = self.neuron_offsets[nid];
        let end = self
            .neuron_offsets
            .get(nid + 1)
            .copied()
            .unwrap_or(self.neuron_block_end);
        start..end
    }

    pub fn voltage_idx(&self, nid: usize) -> usize {
        self.neuron_offsets[nid] + VOLTAGE_IDX
    }

    pub fn calcium_idx(&self, nid: usize) -> usize {
        self.neuron_offsets[nid] + CALCIUM_IDX
    }

    /// `None` for synapses without kinetics of their own.
    pub fn synapse_idx(&self, synapse_id: usize) -> Option<usize> {
        self.synapse_idxs[synapse_id]
    }

    pub fn owner_of(&self, idx: usize) -> Option<StateOwner> {
        if idx >= self.len {
            return None;
        }

        if idx < self.neuron_block_end {
            let nid = self.neuron_offsets.partition_point(|&offset| offset <= idx) - 1;
            Some(StateOwner::Neuron(nid))
        } else {
            self.synapse_idxs
                .iter()
                .position(|synapse_idx| *synapse_idx == Some(idx))
                .map(StateOwner::Synapse)
        }
    }
}

pub struct Network {
    neurons: Vec<Neuron>,
    synapses: Vec<Synapse>,
    layout: StateLayout,
}

pub fn create_network(params: &NetworkParams) -> Result<Network> {
    try_with!(
        params::validate_network_params(params),
        "invalid network parameters"
    );

    let neurons: Vec<Neuron> = params.neurons.iter().map(Neuron::new).collect();

    let mut neuron_offsets = Vec::with_capacity(neurons.len());
    let mut next_offset = 0;

    for neuron in &neurons {
        neuron_offsets.push(next_offset);
        next_offset += neuron.state_size();
    }

    let neuron_block_end = next_offset;

    let mut synapses = Vec::with_capacity(params.synapses.len());
    let mut synapse_idxs = Vec::with_capacity(params.synapses.len());

    for synapse_params in &params.synapses {
        let mut synapse = Synapse::new(
            synapse_params.pre_syn_nid,
            synapse_params.post_syn_nid,
            synapse_params.kind.clone(),
        );

        if synapse.num_state_vars() > 0 {
            synapse.assign_state_idx(next_offset);
            next_offset += synapse.num_state_vars();
        }

        synapse_idxs.push(synapse.state_idx());
        synapses.push(synapse);
    }

    let layout = StateLayout {
        neuron_offsets,
        synapse_idxs,
        neuron_block_end,
        len: next_offset,
    };

    debug!(
        "created network with {} neurons, {} synapses, state length {}",
        neurons.len(),
        synapses.len(),
        layout.len()
    );

    Ok(Network {
        neurons,
        synapses,
        layout,
    })
}

impl Network {
    pub fn num_neurons(&self) -> usize {
        self.neurons.len()
    }

    pub fn num_synapses(&self) -> usize {
        self.synapses.len()
    }

    pub fn neurons(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter()
    }

    pub fn synapses(&self) -> impl Iterator<Item = &Synapse> {
        self.synapses.iter()
    }

    pub fn neuron(&self, nid: usize) -> &Neuron {
        &self.neurons[nid]
    }

    pub fn synapse(&self, synapse_id: usize) -> &Synapse {
        &self.synapses[synapse_id]
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn state_len(&self) -> usize {
        self.layout.len()
    }

    pub fn resting_state(&self) -> Vec<f64> {
        let voltages: Vec<f64> = self
            .neurons
            .iter()
            .map(|neuron| neuron.initial_voltage())
            .collect();
        self.state_at_voltages(&voltages)
    }

    pub fn initial_state(&self, initial_conditions: &InitialConditions) -> Result<Vec<f64>> {
        match initial_conditions {
            InitialConditions::Resting => Ok(self.resting_state()),
            InitialConditions::Voltages(voltages) => {
                if voltages.len() != self.num_neurons() {
                    return Err(SimpleError::new(format!(
                        "expected {} initial voltages, got {}",
                        self.num_neurons(),
                        voltages.len()
                    ))
                    .into());
                }
                Ok(self.state_at_voltages(voltages))
            }
            InitialConditions::StateVector(state) => {
                if state.len() != self.state_len() {
                    return Err(SimpleError::new(format!(
                        "expected initial state vector of length {}, got {}",
                        self.state_len(),
                        state.len()
                    ))
                    .into());
                }

                if state.iter().any(|value| !value.is_finite()) {
                    return Err(SimpleError::new("initial state vector must be finite").into());
                }

                Ok(state.clone())
            }
        }
    }

    fn state_at_voltages(&self, voltages: &[f64]) -> Vec<f64> {
        let mut state = vec![0.0; self.state_len()];

        for (nid, neuron) in self.neurons.iter().enumerate() {
            let range = self.layout.neuron_range(nid);
            neuron.write_resting_state(voltages[nid], &mut state[range]);
        }

        for synapse in &self.synapses {
            if let (Some(state_idx), Some(activation)) = (
                synapse.state_idx(),
                synapse.steady_state_activation(voltages[synapse.pre_syn_nid]),
            ) {
                state[state_idx] = activation;
            }
        }

        state
    }

    /// Assembles the derivative of the full state vector at time `t`.
    ///
    /// `noise_currents` holds one additional injected current per neuron.
    pub fn write_derivative(
        &self,
        t: f64,
        state: &[f64],
        noise_currents: &[f64],
        d_state: &mut [f64],
    ) {
        for (nid, neuron) in self.neurons.iter().enumerate() {
            let range = self.layout.neuron_range(nid);
            let injected_current = neuron.injected_current(t) + noise_currents[nid];
            neuron.write_derivative(&state[range.clone()], injected_current, &mut d_state[range]);
        }

        for synapse in &self.synapses {
            let pre_syn_voltage = state[self.layout.voltage_idx(synapse.pre_syn_nid)];
            let post_syn_voltage = state[self.layout.voltage_idx(synapse.post_syn_nid)];

            let activation = match synapse.state_idx() {
                Some(state_idx) => {
                    d_state[state_idx] =
                        synapse.activation_derivative(pre_syn_voltage, state[state_idx]);
                    state[state_idx]
                }
                None => 0.0,
            };

            let currents = synapse.currents(pre_syn_voltage, post_syn_voltage, activation);

            d_state[self.layout.voltage_idx(synapse.post_syn_nid)] -=
                currents.post_syn / self.neurons[synapse.post_syn_nid].capacitance();
            d_state[self.layout.voltage_idx(synapse.pre_syn_nid)] -=
                currents.pre_syn / self.neurons[synapse.pre_syn_nid].capacitance();
        }
    }
}
