use crate::{
    channel::{self, Channel},
    params::{CalciumParams, NeuronParams, StimulusParams},
};

pub const VOLTAGE_IDX: usize = 0;
pub const CALCIUM_IDX: usize = 1;
pub const NUM_CORE_STATE_VARS: usize = 2;

/// Conductance-based single-compartment neuron.
///
/// Its state block is `[V, Ca, gates...]`, with the gates of each channel stored contiguously
/// in channel order.
#[derive(Debug, Clone)]
pub struct Neuron {
    capacitance: f64,
    leak_conductance: f64,
    leak_reversal_potential: f64,
    channels: Vec<Channel>,
    calcium_params: CalciumParams,
    stimulus: StimulusParams,
    initial_voltage: f64,
    state_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembraneCurrents {
    pub leak: f64,
    pub channels: Vec<f64>,
    pub calcium: f64,
}

impl MembraneCurrents {
    pub fn total(&self) -> f64 {
        self.leak + self.channels.iter().sum::<f64>()
    }
}

impl Neuron {
    pub fn new(neuron_params: &NeuronParams) -> Self {
        let mut channels = Vec::with_capacity(neuron_params.channels.len());
        let mut gate_offset = NUM_CORE_STATE_VARS;

        for channel_params in &neuron_params.channels {
            let channel = channel::create(channel_params, gate_offset);
            gate_offset += channel.num_gates();
            channels.push(channel);
        }

        Self {
            capacitance: neuron_params.capacitance,
            leak_conductance: neuron_params.leak.conductance,
            leak_reversal_potential: neuron_params.leak.reversal_potential,
            channels,
            calcium_params: neuron_params.calcium.clone(),
            stimulus: neuron_params.stimulus.clone(),
            initial_voltage: neuron_params.initial_voltage,
            state_size: gate_offset,
        }
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn initial_voltage(&self) -> f64 {
        self.initial_voltage
    }

    pub fn stimulus(&self) -> &StimulusParams {
        &self.stimulus
    }

    /// Deterministic part of the injected current at time `t`.
    pub fn injected_current(&self, t: f64) -> f64 {
        self.stimulus.bias_current
            + self
                .stimulus
                .pulses
                .iter()
                .filter(|pulse| pulse.start <= t && t < pulse.end)
                .map(|pulse| pulse.amplitude)
                .sum::<f64>()
    }

    /// Writes the state at `voltage` with every gate at its steady state and calcium at baseline.
    pub fn write_resting_state(&self, voltage: f64, state: &mut [f64]) {
        let calcium = self.calcium_params.baseline;
        state[VOLTAGE_IDX] = voltage;
        state[CALCIUM_IDX] = calcium;

        for channel in &self.channels {
            let gates = gate_slice_mut(channel, state);
            channel.write_steady_state(voltage, calcium, gates);
        }
    }

    pub fn calcium_reversal_potential(&self, calcium: f64) -> f64 {
        self.calcium_params.nernst_factor
            * (self.calcium_params.extracellular_concentration / calcium).ln()
    }

    pub fn membrane_currents(&self, state: &[f64]) -> MembraneCurrents {
        let voltage = state[VOLTAGE_IDX];
        let e_ca = self.calcium_reversal_potential(state[CALCIUM_IDX]);
        let mut calcium = 0.0;

        let channels = self
            .channels
            .iter()
            .map(|channel| {
                let current = channel.current(voltage, e_ca, gate_slice(channel, state));
                if channel.carries_calcium() {
                    calcium += current;
                }
                current
            })
            .collect();

        MembraneCurrents {
            leak: self.leak_conductance * (voltage - self.leak_reversal_potential),
            channels,
            calcium,
        }
    }

    /// Writes the time derivative of this neuron's state block without synaptic input.
    ///
    /// `injected_current` is inward positive. Synaptic currents enter `dV/dt` linearly and are
    /// added by the network.
    pub fn write_derivative(&self, state: &[f64], injected_current: f64, d_state: &mut [f64]) {
        let voltage = state[VOLTAGE_IDX];
        let calcium = state[CALCIUM_IDX];
        let e_ca = self.calcium_reversal_potential(calcium);

        let mut ionic_current = self.leak_conductance * (voltage - self.leak_reversal_potential);
        let mut calcium_current = 0.0;

        for channel in &self.channels {
            let offset = channel.gate_offset();
            let range = offset..offset + channel.num_gates();
            let gates = &state[range.clone()];

            channel.write_gate_derivatives(voltage, calcium, gates, &mut d_state[range]);

            let current = channel.current(voltage, e_ca, gates);
            ionic_current += current;

            if channel.carries_calcium() {
                calcium_current += current;
            }
        }

        d_state[VOLTAGE_IDX] = (injected_current - ionic_current) / self.capacitance;

        d_state[CALCIUM_IDX] = (-self.calcium_params.current_to_concentration * calcium_current
            - calcium
            + self.calcium_params.baseline)
            / self.calcium_params.tau;
    }
}

fn gate_slice<'a>(channel: &Channel, state: &'a [f64]) -> &'a [f64] {
    &state[channel.gate_offset()..channel.gate_offset() + channel.num_gates()]
}

fn gate_slice_mut<'a>(channel: &Channel, state: &'a mut [f64]) -> &'a mut [f64] {
    &mut state[channel.gate_offset()..channel.gate_offset() + channel.num_gates()]
}
