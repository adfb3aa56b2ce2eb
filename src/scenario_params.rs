use stg_net::params::SimulationParams;

/// Three tonically firing neurons coupled by reciprocal inhibition in a ring.
pub fn get_scenario_params() -> SimulationParams {
    let params_yaml_str = r#"
network:
  neurons:
  - capacitance: 1.0
    leak:
      conductance: 0.01
      reversal_potential: -50.0
    channels:
    - kind: Na
      conductance: 100.0
      reversal_potential: null
      tau_scale: 1.0
    - kind: Kd
      conductance: 50.0
      reversal_potential: null
      tau_scale: 1.0
    calcium:
      tau: 200.0
      baseline: 0.05
      current_to_concentration: 9.395
      extracellular_concentration: 3000.0
      nernst_factor: 12.193
    stimulus:
      bias_current: 3.0
      pulses: []
      noise: null
    initial_voltage: -65.0
  - capacitance: 1.0
    leak:
      conductance: 0.01
      reversal_potential: -50.0
    channels:
    - kind: Na
      conductance: 100.0
      reversal_potential: null
      tau_scale: 1.0
    - kind: Kd
      conductance: 50.0
      reversal_potential: null
      tau_scale: 1.0
    calcium:
      tau: 200.0
      baseline: 0.05
      current_to_concentration: 9.395
      extracellular_concentration: 3000.0
      nernst_factor: 12.193
    stimulus:
      bias_current: 3.0
      pulses: []
      noise: null
    initial_voltage: -55.0
  - capacitance: 1.0
    leak:
      conductance: 0.01
      reversal_potential: -50.0
    channels:
    - kind: Na
      conductance: 100.0
      reversal_potential: null
      tau_scale: 1.0
    - kind: Kd
      conductance: 50.0
      reversal_potential: null
      tau_scale: 1.0
    calcium:
      tau: 200.0
      baseline: 0.05
      current_to_concentration: 9.395
      extracellular_concentration: 3000.0
      nernst_factor: 12.193
    stimulus:
      bias_current: 3.0
      pulses: []
      noise: null
    initial_voltage: -45.0
  synapses:
  - pre_syn_nid: 0
    post_syn_nid: 1
    kind: !ChemicalGraded
      conductance: 0.2
      reversal_potential: -80.0
      half_activation_voltage: -35.0
      slope: 5.0
      tau_rise: 2.0
      tau_decay: 50.0
  - pre_syn_nid: 1
    post_syn_nid: 2
    kind: !ChemicalGraded
      conductance: 0.2
      reversal_potential: -80.0
      half_activation_voltage: -35.0
      slope: 5.0
      tau_rise: 2.0
      tau_decay: 50.0
  - pre_syn_nid: 2
    post_syn_nid: 0
    kind: !ChemicalGraded
      conductance: 0.2
      reversal_potential: -80.0
      half_activation_voltage: -35.0
      slope: 5.0
      tau_rise: 2.0
      tau_decay: 50.0
run:
  duration: 2000.0
  dt: 0.01
  method: RungeKutta4
  initial_conditions: Resting
  spike_detection:
    threshold: -20.0
    refractory_period: 5.0
"#;

    serde_yaml::from_str(params_yaml_str).unwrap()
}
