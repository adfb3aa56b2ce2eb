use log::{error, info};
use rand::{prelude::Distribution, rngs::StdRng, SeedableRng};
use simple_error::{try_with, SimpleError};
use statrs::distribution::Normal;

use crate::{
    error::{Error, Result},
    integrator::Integrator,
    network::{self, Network, StateOwner},
    params::{self, NoiseParams, RunParams, SimulationParams},
    spike_detection::SpikeTable,
    trajectory::Trajectory,
};

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub trajectory: Trajectory,
    /// Present when spike detection was requested in the run parameters.
    pub spikes: Option<SpikeTable>,
}

/// Builds the network described by `params` and runs it to completion.
pub fn simulate(params: &SimulationParams) -> Result<SimulationResult> {
    try_with!(
        params::validate_simulation_params(params),
        "invalid simulation parameters"
    );

    let network = network::create_network(&params.network)?;
    run(&network, &params.run)
}

pub fn run(network: &Network, run_params: &RunParams) -> Result<SimulationResult> {
    Simulation::new(network, run_params)?.finish()
}

/// Incremental driver over one run. Dropping it before it is finished cancels the run.
pub struct Simulation<'a> {
    network: &'a Network,
    run_params: RunParams,
    integrator: Integrator,
    state: Vec<f64>,
    next_state: Vec<f64>,
    noise_sources: Vec<Option<NoiseSource>>,
    noise_currents: Vec<f64>,
    trajectory: Trajectory,
    step_index: usize,
    num_steps: usize,
    failure: Option<Error>,
}

impl<'a> Simulation<'a> {
    pub fn new(network: &'a Network, run_params: &RunParams) -> Result<Self> {
        try_with!(
            params::validate_run_params(run_params, network.num_neurons()),
            "invalid run parameters"
        );

        let state = network.initial_state(&run_params.initial_conditions)?;
        // bounded by validation
        let num_steps = (run_params.duration / run_params.dt).round() as usize;
        let num_samples = num_steps
            .checked_add(1)
            .ok_or_else(|| SimpleError::new("number of samples overflows"))?;

        let noise_sources = network
            .neurons()
            .enumerate()
            .map(|(nid, neuron)| {
                neuron
                    .stimulus()
                    .noise
                    .as_ref()
                    .map(|noise_params| NoiseSource::new(noise_params, nid))
            })
            .collect();

        let mut trajectory = Trajectory::with_capacity(network, run_params.dt, num_samples)?;
        trajectory.push(&state);

        info!(
            "starting run: {} neurons, {} synapses, {} steps of {} ms ({:?})",
            network.num_neurons(),
            network.num_synapses(),
            num_steps,
            run_params.dt,
            run_params.method
        );

        Ok(Self {
            network,
            run_params: run_params.clone(),
            integrator: Integrator::new(run_params.method, network.state_len()),
            next_state: vec![0.0; state.len()],
            state,
            noise_sources,
            noise_currents: vec![0.0; network.num_neurons()],
            trajectory,
            step_index: 0,
            num_steps,
            failure: None,
        })
    }

    pub fn t(&self) -> f64 {
        self.trajectory.time(self.step_index)
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Samples recorded so far.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn is_finished(&self) -> bool {
        self.step_index >= self.num_steps
    }

    /// The error that aborted this run, if any. A failed run cannot be stepped further.
    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Advances by one integration step. Does nothing once the run is finished.
    ///
    /// After a failed step the state and trajectory stay at the last finite sample, and every
    /// further call returns the same error.
    pub fn step(&mut self) -> Result<()> {
        self.check_failure()?;

        if self.is_finished() {
            return Ok(());
        }

        for (noise_current, noise_source) in
            self.noise_currents.iter_mut().zip(&mut self.noise_sources)
        {
            if let Some(noise_source) = noise_source {
                *noise_current = noise_source.sample();
            }
        }

        let t = self.t();
        let network = self.network;
        let noise_currents = &self.noise_currents;

        self.integrator.step(
            t,
            self.run_params.dt,
            &self.state,
            &mut self.next_state,
            |t, state, d_state| network.write_derivative(t, state, noise_currents, d_state),
        );

        if let Err(err) = self.check_finite() {
            self.failure = Some(err.clone());
            return Err(err);
        }

        self.step_index += 1;
        std::mem::swap(&mut self.state, &mut self.next_state);
        self.trajectory.push(&self.state);

        Ok(())
    }

    /// Steps until the current time reaches `t_stop` or the run is finished.
    pub fn run_until(&mut self, t_stop: f64) -> Result<()> {
        self.check_failure()?;
        let half_dt = 0.5 * self.run_params.dt;

        while !self.is_finished() && self.t() < t_stop - half_dt {
            self.step()?;
        }

        Ok(())
    }

    /// Runs the remaining steps and performs spike detection if requested.
    pub fn finish(mut self) -> Result<SimulationResult> {
        self.check_failure()?;

        while !self.is_finished() {
            self.step()?;
        }

        let spikes = self
            .run_params
            .spike_detection
            .as_ref()
            .map(|spike_detection_params| self.trajectory.detect_spikes(spike_detection_params));

        info!(
            "finished run: {} samples, {} spikes",
            self.trajectory.num_samples(),
            spikes.as_ref().map_or(0, SpikeTable::total_spike_count)
        );

        Ok(SimulationResult {
            trajectory: self.trajectory,
            spikes,
        })
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    /// Checks the candidate state of the step following `step_index`.
    fn check_finite(&self) -> Result<()> {
        let mut value = None;
        let mut neuron_nids = Vec::new();
        let mut synapse_ids = Vec::new();

        for (idx, entry) in self.next_state.iter().enumerate() {
            if entry.is_finite() {
                continue;
            }

            value.get_or_insert(*entry);

            match self.network.layout().owner_of(idx) {
                Some(StateOwner::Neuron(nid)) => {
                    if neuron_nids.last() != Some(&nid) {
                        neuron_nids.push(nid);
                    }
                }
                Some(StateOwner::Synapse(synapse_id)) => synapse_ids.push(synapse_id),
                None => {}
            }
        }

        match value {
            None => Ok(()),
            Some(value) => {
                let step = self.step_index + 1;
                let t = self.trajectory.time(step);

                error!(
                    "aborting run at step {} (t = {} ms): non-finite state in neurons {:?}, synapses {:?}",
                    step, t, neuron_nids, synapse_ids
                );

                Err(Error::Simulation {
                    step,
                    t,
                    neuron_nids,
                    synapse_ids,
                    value,
                })
            }
        }
    }
}

/// Gaussian noise current of one neuron, sampled once per step and held over it.
struct NoiseSource {
    rng: StdRng,
    mean: f64,
    distribution: Option<Normal>,
}

impl NoiseSource {
    fn new(noise_params: &NoiseParams, nid: usize) -> Self {
        let seed = noise_params.seed.unwrap_or(0);

        Self {
            rng: StdRng::seed_from_u64(neuron_seed(seed, nid)),
            mean: noise_params.mean,
            // validation guarantees a finite, non-negative standard deviation
            distribution: Normal::new(noise_params.mean, noise_params.std_dev).ok(),
        }
    }

    fn sample(&mut self) -> f64 {
        match &self.distribution {
            Some(distribution) => distribution.sample(&mut self.rng),
            None => self.mean,
        }
    }
}

fn neuron_seed(seed: u64, nid: usize) -> u64 {
    seed ^ (nid as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
