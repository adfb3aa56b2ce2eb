//! Voltage-gated ionic channels.
//!
//! Every channel contributes `g * m^p * h^q * (V - E)` where `m` and `h` relax towards their
//! voltage-dependent steady states. The built-in kinds form the stomatogastric current set;
//! `Boltzmann` channels let callers plug in their own gating curves.

use crate::params::{BoltzmannGateParams, ChannelKind, ChannelParams};

const E_NA: f64 = 50.0;
const E_K: f64 = -80.0;
const E_H: f64 = -20.0;

/// Steady state and time constant of a gate at a given membrane potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateKinetics {
    pub steady_state: f64,
    pub tau: f64,
}

/// Voltage (and calcium) dependent gating shared by every channel kind.
pub trait Gating {
    fn activation(&self, voltage: f64, calcium: f64) -> GateKinetics;

    fn inactivation(&self, voltage: f64) -> Option<GateKinetics>;

    fn activation_exponent(&self) -> i32;

    fn has_inactivation(&self) -> bool;

    fn carries_calcium(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ReversalPotential {
    Fixed(f64),
    Calcium,
}

#[derive(Debug, Clone)]
pub struct Channel {
    kind: ChannelKind,
    conductance: f64,
    reversal_potential: ReversalPotential,
    tau_scale: f64,
    gate_offset: usize,
}

pub fn create(channel_params: &ChannelParams, gate_offset: usize) -> Channel {
    let reversal_potential = match channel_params.reversal_potential {
        Some(reversal_potential) => ReversalPotential::Fixed(reversal_potential),
        None => default_reversal_potential(&channel_params.kind),
    };

    Channel {
        kind: channel_params.kind.clone(),
        conductance: channel_params.conductance,
        reversal_potential,
        tau_scale: channel_params.tau_scale,
        gate_offset,
    }
}

fn default_reversal_potential(kind: &ChannelKind) -> ReversalPotential {
    match kind {
        ChannelKind::Na => ReversalPotential::Fixed(E_NA),
        ChannelKind::CaT | ChannelKind::CaS => ReversalPotential::Calcium,
        ChannelKind::KA | ChannelKind::KCa | ChannelKind::Kd => ReversalPotential::Fixed(E_K),
        ChannelKind::H => ReversalPotential::Fixed(E_H),
        // validation guarantees an explicit potential for non-calcium Boltzmann channels
        ChannelKind::Boltzmann(_) => ReversalPotential::Calcium,
    }
}

impl Channel {
    pub fn kind(&self) -> &ChannelKind {
        &self.kind
    }

    pub fn num_gates(&self) -> usize {
        if self.kind.has_inactivation() {
            2
        } else {
            1
        }
    }

    pub fn gate_offset(&self) -> usize {
        self.gate_offset
    }

    pub fn carries_calcium(&self) -> bool {
        self.kind.carries_calcium()
    }

    pub fn write_steady_state(&self, voltage: f64, calcium: f64, gates: &mut [f64]) {
        gates[0] = self.kind.activation(voltage, calcium).steady_state;

        if let Some(inactivation) = self.kind.inactivation(voltage) {
            gates[1] = inactivation.steady_state;
        }
    }

    pub fn write_gate_derivatives(
        &self,
        voltage: f64,
        calcium: f64,
        gates: &[f64],
        d_gates: &mut [f64],
    ) {
        let activation = self.kind.activation(voltage, calcium);
        d_gates[0] = (activation.steady_state - gates[0]) / (activation.tau * self.tau_scale);

        if let Some(inactivation) = self.kind.inactivation(voltage) {
            d_gates[1] =
                (inactivation.steady_state - gates[1]) / (inactivation.tau * self.tau_scale);
        }
    }

    /// Outward-positive membrane current in µA/cm².
    pub fn current(&self, voltage: f64, calcium_reversal_potential: f64, gates: &[f64]) -> f64 {
        let mut open_fraction = gates[0].powi(self.kind.activation_exponent());

        if self.kind.has_inactivation() {
            open_fraction *= gates[1];
        }

        let reversal_potential = match self.reversal_potential {
            ReversalPotential::Fixed(reversal_potential) => reversal_potential,
            ReversalPotential::Calcium => calcium_reversal_potential,
        };

        self.conductance * open_fraction * (voltage - reversal_potential)
    }
}

impl Gating for ChannelKind {
    fn activation(&self, v: f64, calcium: f64) -> GateKinetics {
        match self {
            ChannelKind::Na => GateKinetics {
                steady_state: boltzmann(v, -25.5, -5.29),
                tau: 2.64 - 2.52 * boltzmann(v, -120.0, -25.0),
            },
            ChannelKind::CaT => GateKinetics {
                steady_state: boltzmann(v, -27.1, -7.2),
                tau: 43.4 - 42.6 * boltzmann(v, -68.1, -20.5),
            },
            ChannelKind::CaS => GateKinetics {
                steady_state: boltzmann(v, -33.0, -8.1),
                tau: 1.4 + 7.0 / (((v + 27.0) / 10.0).exp() + ((v + 70.0) / -13.0).exp()),
            },
            ChannelKind::KA => GateKinetics {
                steady_state: boltzmann(v, -27.2, -8.7),
                tau: 11.6 - 10.4 * boltzmann(v, -32.9, -15.2),
            },
            ChannelKind::KCa => GateKinetics {
                steady_state: (calcium / (calcium + 3.0)) * boltzmann(v, -28.3, -12.6),
                tau: 90.3 - 75.1 * boltzmann(v, -46.0, -22.7),
            },
            ChannelKind::Kd => GateKinetics {
                steady_state: boltzmann(v, -12.3, -11.8),
                tau: 7.2 - 6.4 * boltzmann(v, -28.3, -19.2),
            },
            ChannelKind::H => GateKinetics {
                steady_state: boltzmann(v, -70.0, 6.0),
                tau: 272.0 + 1499.0 * boltzmann(v, -42.2, -8.73),
            },
            ChannelKind::Boltzmann(params) => boltzmann_gate(v, &params.activation),
        }
    }

    fn inactivation(&self, v: f64) -> Option<GateKinetics> {
        match self {
            ChannelKind::Na => Some(GateKinetics {
                steady_state: boltzmann(v, -48.9, 5.18),
                tau: (1.34 * boltzmann(v, -62.9, -10.0)) * (1.5 + boltzmann(v, -34.9, 3.6)),
            }),
            ChannelKind::CaT => Some(GateKinetics {
                steady_state: boltzmann(v, -32.1, 5.5),
                tau: 210.0 - 179.6 * boltzmann(v, -55.0, -16.9),
            }),
            ChannelKind::CaS => Some(GateKinetics {
                steady_state: boltzmann(v, -60.0, 6.2),
                tau: 60.0 + 150.0 / (((v + 55.0) / 9.0).exp() + ((v + 65.0) / -16.0).exp()),
            }),
            ChannelKind::KA => Some(GateKinetics {
                steady_state: boltzmann(v, -56.9, 4.9),
                tau: 38.6 - 29.2 * boltzmann(v, -38.9, -26.5),
            }),
            ChannelKind::KCa | ChannelKind::Kd | ChannelKind::H => None,
            ChannelKind::Boltzmann(params) => params
                .inactivation
                .as_ref()
                .map(|gate_params| boltzmann_gate(v, gate_params)),
        }
    }

    fn activation_exponent(&self) -> i32 {
        match self {
            ChannelKind::Na | ChannelKind::CaT | ChannelKind::CaS | ChannelKind::KA => 3,
            ChannelKind::KCa | ChannelKind::Kd => 4,
            ChannelKind::H => 1,
            ChannelKind::Boltzmann(params) => params.activation_exponent as i32,
        }
    }

    fn has_inactivation(&self) -> bool {
        match self {
            ChannelKind::Na | ChannelKind::CaT | ChannelKind::CaS | ChannelKind::KA => true,
            ChannelKind::KCa | ChannelKind::Kd | ChannelKind::H => false,
            ChannelKind::Boltzmann(params) => params.inactivation.is_some(),
        }
    }

    fn carries_calcium(&self) -> bool {
        match self {
            ChannelKind::CaT | ChannelKind::CaS => true,
            ChannelKind::Boltzmann(params) => params.carries_calcium,
            _ => false,
        }
    }
}

/// `1 / (1 + exp((v - v_half) / slope))`
pub fn boltzmann(v: f64, v_half: f64, slope: f64) -> f64 {
    1.0 / (1.0 + ((v - v_half) / slope).exp())
}

fn boltzmann_gate(v: f64, gate_params: &BoltzmannGateParams) -> GateKinetics {
    GateKinetics {
        steady_state: boltzmann(v, gate_params.half_activation_voltage, gate_params.slope),
        tau: gate_params.tau,
    }
}
