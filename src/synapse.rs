use crate::{channel::boltzmann, params::SynapseKind};

#[derive(Debug, Clone)]
pub struct Synapse {
    pub pre_syn_nid: usize,
    pub post_syn_nid: usize,
    pub kind: SynapseKind,
    state_idx: Option<usize>,
}

/// Currents delivered by a synapse, outward positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapticCurrents {
    pub post_syn: f64,
    pub pre_syn: f64,
}

impl Synapse {
    pub fn new(pre_syn_nid: usize, post_syn_nid: usize, kind: SynapseKind) -> Self {
        Self {
            pre_syn_nid,
            post_syn_nid,
            kind,
            state_idx: None,
        }
    }

    pub fn num_state_vars(&self) -> usize {
        match self.kind {
            SynapseKind::Electrical { .. } => 0,
            SynapseKind::ChemicalGraded { .. } => 1,
        }
    }

    pub fn state_idx(&self) -> Option<usize> {
        self.state_idx
    }

    pub(crate) fn assign_state_idx(&mut self, state_idx: usize) {
        self.state_idx = Some(state_idx);
    }

    /// Steady state of the activation kinetics while the presynaptic voltage is held constant.
    pub fn steady_state_activation(&self, pre_syn_voltage: f64) -> Option<f64> {
        match self.kind {
            SynapseKind::Electrical { .. } => None,
            SynapseKind::ChemicalGraded {
                half_activation_voltage,
                slope,
                tau_rise,
                tau_decay,
                ..
            } => {
                let rise_rate =
                    release_fraction(pre_syn_voltage, half_activation_voltage, slope) / tau_rise;
                Some(rise_rate / (rise_rate + 1.0 / tau_decay))
            }
        }
    }

    pub fn activation_derivative(&self, pre_syn_voltage: f64, activation: f64) -> f64 {
        match self.kind {
            SynapseKind::Electrical { .. } => 0.0,
            SynapseKind::ChemicalGraded {
                half_activation_voltage,
                slope,
                tau_rise,
                tau_decay,
                ..
            } => {
                release_fraction(pre_syn_voltage, half_activation_voltage, slope)
                    * (1.0 - activation)
                    / tau_rise
                    - activation / tau_decay
            }
        }
    }

    /// `activation` is ignored for electrical synapses.
    pub fn currents(
        &self,
        pre_syn_voltage: f64,
        post_syn_voltage: f64,
        activation: f64,
    ) -> SynapticCurrents {
        match self.kind {
            SynapseKind::Electrical {
                conductance,
                bidirectional,
            } => {
                let post_syn = conductance * (post_syn_voltage - pre_syn_voltage);
                let pre_syn = if bidirectional { -post_syn } else { 0.0 };
                SynapticCurrents { post_syn, pre_syn }
            }
            SynapseKind::ChemicalGraded {
                conductance,
                reversal_potential,
                ..
            } => SynapticCurrents {
                post_syn: conductance * activation * (post_syn_voltage - reversal_potential),
                pre_syn: 0.0,
            },
        }
    }
}

/// Sigmoidal transmitter release, rising with presynaptic voltage.
fn release_fraction(pre_syn_voltage: f64, half_activation_voltage: f64, slope: f64) -> f64 {
    boltzmann(half_activation_voltage, pre_syn_voltage, slope)
}
