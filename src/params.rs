use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

/// Upper bound on `round(duration / dt)` for a single run.
pub const MAX_NUM_STEPS: usize = u32::MAX as usize;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    pub network: NetworkParams,
    pub run: RunParams,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct NetworkParams {
    pub neurons: Vec<NeuronParams>,
    pub synapses: Vec<SynapseParams>,
}

impl NetworkParams {
    pub fn add_neuron(&mut self, neuron_params: NeuronParams) -> usize {
        self.neurons.push(neuron_params);
        self.neurons.len() - 1
    }

    pub fn connect(&mut self, pre_syn_nid: usize, post_syn_nid: usize, kind: SynapseKind) {
        self.synapses.push(SynapseParams {
            pre_syn_nid,
            post_syn_nid,
            kind,
        });
    }

    /// Connects every neuron of `pre_syn_nids` to every neuron of `post_syn_nids`, skipping
    /// self pairs.
    pub fn connect_populations(
        &mut self,
        pre_syn_nids: &[usize],
        post_syn_nids: &[usize],
        kind: &SynapseKind,
    ) {
        for &post_syn_nid in post_syn_nids {
            for &pre_syn_nid in pre_syn_nids {
                if pre_syn_nid != post_syn_nid {
                    self.connect(pre_syn_nid, post_syn_nid, kind.clone());
                }
            }
        }
    }
}

/// Single-compartment neuron. Units: mV, ms, µF/cm², mS/cm², µA/cm².
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronParams {
    pub capacitance: f64,
    pub leak: LeakParams,
    pub channels: Vec<ChannelParams>,
    pub calcium: CalciumParams,
    pub stimulus: StimulusParams,
    pub initial_voltage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakParams {
    pub conductance: f64,
    pub reversal_potential: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelParams {
    pub kind: ChannelKind,
    pub conductance: f64,
    /// Overrides the kind's reversal potential. Calcium channels default to the Nernst potential.
    pub reversal_potential: Option<f64>,
    /// Multiplies every time constant of the channel's gates.
    pub tau_scale: f64,
}

impl ChannelParams {
    pub fn new(kind: ChannelKind, conductance: f64) -> Self {
        Self {
            kind,
            conductance,
            reversal_potential: None,
            tau_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelKind {
    Na,
    CaT,
    CaS,
    KA,
    KCa,
    Kd,
    H,
    Boltzmann(BoltzmannChannelParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltzmannChannelParams {
    pub activation: BoltzmannGateParams,
    pub inactivation: Option<BoltzmannGateParams>,
    pub activation_exponent: u8,
    pub carries_calcium: bool,
}

/// Steady state `1 / (1 + exp((V - half_activation_voltage) / slope))`, so a negative slope
/// gives an activation curve and a positive slope an inactivation curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltzmannGateParams {
    pub half_activation_voltage: f64,
    pub slope: f64,
    pub tau: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalciumParams {
    pub tau: f64,
    pub baseline: f64,
    /// µM per µA/cm² of calcium current
    pub current_to_concentration: f64,
    pub extracellular_concentration: f64,
    /// RT/zF in mV
    pub nernst_factor: f64,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct StimulusParams {
    pub bias_current: f64,
    pub pulses: Vec<CurrentPulse>,
    pub noise: Option<NoiseParams>,
}

/// Rectangular current injection, active on `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPulse {
    pub start: f64,
    pub end: f64,
    pub amplitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseParams {
    pub mean: f64,
    pub std_dev: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynapseParams {
    pub pre_syn_nid: usize,
    pub post_syn_nid: usize,
    pub kind: SynapseKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynapseKind {
    Electrical {
        conductance: f64,
        bidirectional: bool,
    },
    ChemicalGraded {
        conductance: f64,
        reversal_potential: f64,
        half_activation_voltage: f64,
        slope: f64,
        tau_rise: f64,
        tau_decay: f64,
    },
}

impl SynapseKind {
    pub fn electrical(conductance: f64) -> Self {
        SynapseKind::Electrical {
            conductance,
            bidirectional: true,
        }
    }

    pub fn chemical_graded(conductance: f64, reversal_potential: f64) -> Self {
        SynapseKind::ChemicalGraded {
            conductance,
            reversal_potential,
            half_activation_voltage: -35.0,
            slope: 5.0,
            tau_rise: 2.0,
            tau_decay: 50.0,
        }
    }

    pub fn inhibitory(conductance: f64) -> Self {
        Self::chemical_graded(conductance, -80.0)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SynapseKind::Electrical { .. } => "electrical",
            SynapseKind::ChemicalGraded { .. } => "chemical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    /// ms
    pub duration: f64,
    /// ms
    pub dt: f64,
    pub method: IntegrationMethod,
    pub initial_conditions: InitialConditions,
    pub spike_detection: Option<SpikeDetectionParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    Euler,
    RungeKutta4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitialConditions {
    Resting,
    Voltages(Vec<f64>),
    StateVector(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeDetectionParams {
    pub threshold: f64,
    pub refractory_period: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalParams {
    pub num_threads: Option<usize>,
    pub pin_threads: bool,
}

impl NeuronParams {
    pub fn with_channels(channels: Vec<ChannelParams>) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    /// Fires tonically at roughly 45 Hz without synaptic input.
    pub fn tonic_spiker() -> Self {
        let mut params = Self::default();
        params.leak.conductance = 0.01;
        params.stimulus.bias_current = 3.0;
        params
    }

    /// Intrinsic burster built from the full stomatogastric current set.
    pub fn stg_burster() -> Self {
        let mut params = Self::with_channels(vec![
            ChannelParams::new(ChannelKind::Na, 100.0),
            ChannelParams::new(ChannelKind::CaT, 2.5),
            ChannelParams::new(ChannelKind::CaS, 6.0),
            ChannelParams::new(ChannelKind::KA, 50.0),
            ChannelParams::new(ChannelKind::KCa, 5.0),
            ChannelParams::new(ChannelKind::Kd, 100.0),
            ChannelParams::new(ChannelKind::H, 0.01),
        ]);
        params.leak.conductance = 0.0;
        params
    }
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            capacitance: 1.0,
            leak: LeakParams::default(),
            channels: vec![
                ChannelParams::new(ChannelKind::Na, 100.0),
                ChannelParams::new(ChannelKind::Kd, 50.0),
            ],
            calcium: CalciumParams::default(),
            stimulus: StimulusParams::default(),
            initial_voltage: -65.0,
        }
    }
}

impl Default for LeakParams {
    fn default() -> Self {
        Self {
            conductance: 0.05,
            reversal_potential: -50.0,
        }
    }
}

impl Default for CalciumParams {
    fn default() -> Self {
        Self {
            tau: 200.0,
            baseline: 0.05,
            current_to_concentration: 9.395,
            extracellular_concentration: 3000.0,
            nernst_factor: 12.193,
        }
    }
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            duration: 1000.0,
            dt: 0.01,
            method: IntegrationMethod::default(),
            initial_conditions: InitialConditions::default(),
            spike_detection: Some(SpikeDetectionParams::default()),
        }
    }
}

impl Default for IntegrationMethod {
    fn default() -> Self {
        IntegrationMethod::RungeKutta4
    }
}

impl Default for InitialConditions {
    fn default() -> Self {
        InitialConditions::Resting
    }
}

impl Default for SpikeDetectionParams {
    fn default() -> Self {
        Self {
            threshold: -20.0,
            refractory_period: 5.0,
        }
    }
}

impl Default for TechnicalParams {
    fn default() -> Self {
        Self {
            num_threads: None,
            pin_threads: false,
        }
    }
}

pub fn validate_simulation_params(params: &SimulationParams) -> Result<(), SimpleError> {
    validate_network_params(&params.network)?;
    validate_run_params(&params.run, params.network.neurons.len())
}

pub fn validate_network_params(network_params: &NetworkParams) -> Result<(), SimpleError> {
    if network_params.neurons.is_empty() {
        return Err(SimpleError::new(
            "network must contain at least one neuron",
        ));
    }

    for neuron_params in &network_params.neurons {
        validate_neuron_params(neuron_params)?;
    }

    let num_neurons = network_params.neurons.len();
    let mut seen_edges = FxHashSet::default();

    for synapse_params in &network_params.synapses {
        if synapse_params.pre_syn_nid >= num_neurons {
            return Err(SimpleError::new(format!(
                "invalid pre_syn_nid: {}",
                synapse_params.pre_syn_nid
            )));
        }

        if synapse_params.post_syn_nid >= num_neurons {
            return Err(SimpleError::new(format!(
                "invalid post_syn_nid: {}",
                synapse_params.post_syn_nid
            )));
        }

        if synapse_params.pre_syn_nid == synapse_params.post_syn_nid {
            return Err(SimpleError::new(format!(
                "self-synapse on neuron {} is not allowed",
                synapse_params.pre_syn_nid
            )));
        }

        let type_name = synapse_params.kind.type_name();

        if !seen_edges.insert((
            synapse_params.pre_syn_nid,
            synapse_params.post_syn_nid,
            type_name,
        )) {
            return Err(SimpleError::new(format!(
                "duplicate {} synapse from neuron {} to neuron {}",
                type_name, synapse_params.pre_syn_nid, synapse_params.post_syn_nid
            )));
        }

        validate_synapse_kind(&synapse_params.kind)?;
    }

    Ok(())
}

pub fn validate_run_params(run_params: &RunParams, num_neurons: usize) -> Result<(), SimpleError> {
    if !is_positive(run_params.duration) {
        return Err(SimpleError::new("duration must be strictly positive"));
    }

    if !is_positive(run_params.dt) {
        return Err(SimpleError::new("dt must be strictly positive"));
    }

    if run_params.dt > run_params.duration {
        return Err(SimpleError::new("dt must not be greater than duration"));
    }

    if (run_params.duration / run_params.dt).round() > MAX_NUM_STEPS as f64 {
        return Err(SimpleError::new(format!(
            "duration / dt must not exceed {} steps",
            MAX_NUM_STEPS
        )));
    }

    if let InitialConditions::Voltages(voltages) = &run_params.initial_conditions {
        if voltages.len() != num_neurons {
            return Err(SimpleError::new(format!(
                "expected {} initial voltages, got {}",
                num_neurons,
                voltages.len()
            )));
        }

        if voltages.iter().any(|voltage| !voltage.is_finite()) {
            return Err(SimpleError::new("initial voltages must be finite"));
        }
    }

    if let Some(spike_detection_params) = &run_params.spike_detection {
        validate_spike_detection_params(spike_detection_params)?;
    }

    Ok(())
}

pub fn validate_spike_detection_params(
    spike_detection_params: &SpikeDetectionParams,
) -> Result<(), SimpleError> {
    if !spike_detection_params.threshold.is_finite() {
        return Err(SimpleError::new("spike threshold must be finite"));
    }

    if !is_non_negative(spike_detection_params.refractory_period) {
        return Err(SimpleError::new("refractory_period must not be negative"));
    }

    Ok(())
}

pub fn validate_technical_params(technical_params: &TechnicalParams) -> Result<(), SimpleError> {
    if let Some(num_threads) = technical_params.num_threads {
        if num_threads == 0 {
            return Err(SimpleError::new("num_threads must be strictly positive"));
        }

        if num_cpus::get() < num_threads {
            return Err(SimpleError::new(
                "num_threads must not be greater than number of available CPUs",
            ));
        }
    }

    Ok(())
}

fn validate_neuron_params(neuron_params: &NeuronParams) -> Result<(), SimpleError> {
    if !is_positive(neuron_params.capacitance) {
        return Err(SimpleError::new("capacitance must be strictly positive"));
    }

    if !is_non_negative(neuron_params.leak.conductance) {
        return Err(SimpleError::new("leak conductance must not be negative"));
    }

    if !neuron_params.leak.reversal_potential.is_finite() {
        return Err(SimpleError::new("leak reversal_potential must be finite"));
    }

    if !neuron_params.initial_voltage.is_finite() {
        return Err(SimpleError::new("initial_voltage must be finite"));
    }

    for channel_params in &neuron_params.channels {
        validate_channel_params(channel_params)?;
    }

    validate_calcium_params(&neuron_params.calcium)?;
    validate_stimulus_params(&neuron_params.stimulus)?;

    Ok(())
}

fn validate_channel_params(channel_params: &ChannelParams) -> Result<(), SimpleError> {
    if !is_non_negative(channel_params.conductance) {
        return Err(SimpleError::new("channel conductance must not be negative"));
    }

    if !is_positive(channel_params.tau_scale) {
        return Err(SimpleError::new("tau_scale must be strictly positive"));
    }

    if let Some(reversal_potential) = channel_params.reversal_potential {
        if !reversal_potential.is_finite() {
            return Err(SimpleError::new("channel reversal_potential must be finite"));
        }
    }

    if let ChannelKind::Boltzmann(boltzmann_params) = &channel_params.kind {
        validate_boltzmann_gate_params(&boltzmann_params.activation)?;

        if let Some(inactivation) = &boltzmann_params.inactivation {
            validate_boltzmann_gate_params(inactivation)?;
        }

        if boltzmann_params.activation_exponent == 0 {
            return Err(SimpleError::new(
                "boltzmann channel: activation_exponent must be strictly positive",
            ));
        }

        if channel_params.reversal_potential.is_none() && !boltzmann_params.carries_calcium {
            return Err(SimpleError::new(
                "boltzmann channel requires a reversal_potential",
            ));
        }
    }

    Ok(())
}

fn validate_boltzmann_gate_params(gate_params: &BoltzmannGateParams) -> Result<(), SimpleError> {
    if !is_positive(gate_params.tau) {
        return Err(SimpleError::new(
            "boltzmann gate: tau must be strictly positive",
        ));
    }

    if gate_params.slope == 0.0 || !gate_params.slope.is_finite() {
        return Err(SimpleError::new("boltzmann gate: slope must not be zero"));
    }

    if !gate_params.half_activation_voltage.is_finite() {
        return Err(SimpleError::new(
            "boltzmann gate: half_activation_voltage must be finite",
        ));
    }

    Ok(())
}

fn validate_calcium_params(calcium_params: &CalciumParams) -> Result<(), SimpleError> {
    if !is_positive(calcium_params.tau) {
        return Err(SimpleError::new("calcium tau must be strictly positive"));
    }

    if !is_positive(calcium_params.baseline) {
        return Err(SimpleError::new("calcium baseline must be strictly positive"));
    }

    if !is_positive(calcium_params.extracellular_concentration) {
        return Err(SimpleError::new(
            "extracellular calcium concentration must be strictly positive",
        ));
    }

    if !is_non_negative(calcium_params.current_to_concentration) {
        return Err(SimpleError::new(
            "current_to_concentration must not be negative",
        ));
    }

    if !calcium_params.nernst_factor.is_finite() {
        return Err(SimpleError::new("nernst_factor must be finite"));
    }

    Ok(())
}

fn validate_stimulus_params(stimulus_params: &StimulusParams) -> Result<(), SimpleError> {
    if !stimulus_params.bias_current.is_finite() {
        return Err(SimpleError::new("bias_current must be finite"));
    }

    for pulse in &stimulus_params.pulses {
        if !pulse.start.is_finite() || !pulse.end.is_finite() || !pulse.amplitude.is_finite() {
            return Err(SimpleError::new("current pulse values must be finite"));
        }

        if pulse.end <= pulse.start {
            return Err(SimpleError::new(
                "current pulse end must be greater than start",
            ));
        }
    }

    if let Some(noise_params) = &stimulus_params.noise {
        if !noise_params.mean.is_finite() {
            return Err(SimpleError::new("noise mean must be finite"));
        }

        if !is_non_negative(noise_params.std_dev) {
            return Err(SimpleError::new("noise std_dev must not be negative"));
        }
    }

    Ok(())
}

fn validate_synapse_kind(kind: &SynapseKind) -> Result<(), SimpleError> {
    match *kind {
        SynapseKind::Electrical { conductance, .. } => {
            if !is_non_negative(conductance) {
                return Err(SimpleError::new(
                    "electrical synapse: conductance must not be negative",
                ));
            }
        }
        SynapseKind::ChemicalGraded {
            conductance,
            reversal_potential,
            half_activation_voltage,
            slope,
            tau_rise,
            tau_decay,
        } => {
            if !is_non_negative(conductance) {
                return Err(SimpleError::new(
                    "chemical synapse: conductance must not be negative",
                ));
            }

            if !reversal_potential.is_finite() || !half_activation_voltage.is_finite() {
                return Err(SimpleError::new(
                    "chemical synapse: potentials must be finite",
                ));
            }

            if !is_positive(slope) {
                return Err(SimpleError::new(
                    "chemical synapse: slope must be strictly positive",
                ));
            }

            if !is_positive(tau_rise) {
                return Err(SimpleError::new(
                    "chemical synapse: tau_rise must be strictly positive",
                ));
            }

            if !is_positive(tau_decay) {
                return Err(SimpleError::new(
                    "chemical synapse: tau_decay must be strictly positive",
                ));
            }
        }
    }

    Ok(())
}

// NaN fails both
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
