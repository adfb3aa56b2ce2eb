use float_cmp::assert_approx_eq;
use itertools::{assert_equal, Itertools};
use stg_net::{
    analysis,
    network::{self, Network},
    params::{
        InitialConditions, IntegrationMethod, NetworkParams, NeuronParams, RunParams,
        SimulationParams, SpikeDetectionParams, SynapseKind, TechnicalParams,
    },
    simulation::{self, SimulationResult},
    spike_detection::{self, SpikeTable},
    sweep, Error,
};

fn run_params(duration: f64, dt: f64) -> RunParams {
    RunParams {
        duration,
        dt,
        method: IntegrationMethod::RungeKutta4,
        initial_conditions: InitialConditions::Resting,
        spike_detection: Some(SpikeDetectionParams::default()),
    }
}

fn single_neuron_network(neuron_params: NeuronParams) -> Network {
    let mut params = NetworkParams::default();
    params.add_neuron(neuron_params);
    network::create_network(&params).unwrap()
}

// Each neuron only receives its constant bias current, so the slow rotation is produced by the
// reciprocal inhibition alone. Uncoupled, the same neurons fire at about 45 Hz.
fn make_ring_params(duration: f64, dt: f64) -> SimulationParams {
    let mut network = NetworkParams::default();

    for _ in 0..3 {
        network.add_neuron(NeuronParams::tonic_spiker());
    }

    network.connect(0, 1, SynapseKind::inhibitory(0.2));
    network.connect(1, 2, SynapseKind::inhibitory(0.2));
    network.connect(2, 0, SynapseKind::inhibitory(0.2));

    let mut run = run_params(duration, dt);
    run.initial_conditions = InitialConditions::Voltages(vec![-65.0, -55.0, -45.0]);

    SimulationParams { network, run }
}

fn late_spike_times(spikes: &SpikeTable, nid: usize, t_start: f64) -> Vec<f64> {
    spikes
        .spike_times(nid)
        .iter()
        .copied()
        .filter(|t| *t >= t_start)
        .collect()
}

#[test]
fn layout_length_matches_declared_state_sizes() {
    let mut params = NetworkParams::default();
    params.add_neuron(NeuronParams::default());
    params.add_neuron(NeuronParams::stg_burster());
    params.add_neuron(NeuronParams::tonic_spiker());
    params.add_neuron(NeuronParams::with_channels(vec![]));
    params.connect_populations(&[0, 1], &[2, 3], &SynapseKind::inhibitory(0.1));
    params.connect(3, 0, SynapseKind::electrical(0.05));

    let network = network::create_network(&params).unwrap();

    let neuron_state_size: usize = network.neurons().map(|neuron| neuron.state_size()).sum();
    let synapse_state_size: usize = network
        .synapses()
        .map(|synapse| synapse.num_state_vars())
        .sum();

    assert_eq!(network.num_synapses(), 5);
    assert_eq!(neuron_state_size, 5 + 13 + 5 + 2);
    assert_eq!(synapse_state_size, 4);
    assert_eq!(network.state_len(), neuron_state_size + synapse_state_size);
    assert_eq!(network.resting_state().len(), network.state_len());
}

#[test]
fn isolated_neuron_settles_at_resting_potential() {
    let network = single_neuron_network(NeuronParams::default());
    let mut params = run_params(1000.0, 0.025);
    params.spike_detection = None;

    let result = simulation::run(&network, &params).unwrap();
    let trajectory = &result.trajectory;

    let late_voltages: Vec<f64> = trajectory
        .times()
        .zip(trajectory.voltage_trace(0))
        .filter(|(t, _)| *t >= 500.0)
        .map(|(_, voltage)| voltage)
        .collect();

    let (v_min, v_max) = late_voltages.iter().copied().minmax().into_option().unwrap();

    assert!(v_max - v_min < 1e-6);
    assert_approx_eq!(f64, v_max, -49.972, epsilon = 1e-3);
    assert_approx_eq!(
        f64,
        trajectory.mean_voltage(0, 500.0).unwrap(),
        -49.972,
        epsilon = 1e-3
    );
}

#[test]
fn electrical_coupling_pulls_potentials_together() {
    let final_differences: Vec<f64> = [0.0, 0.01, 0.05, 0.2]
        .iter()
        .map(|conductance| {
            let mut params = NetworkParams::default();
            params.add_neuron(NeuronParams::default());
            params.add_neuron(NeuronParams::default());
            params.connect(0, 1, SynapseKind::electrical(*conductance));
            let network = network::create_network(&params).unwrap();

            let mut run_params = run_params(20.0, 0.01);
            run_params.initial_conditions = InitialConditions::Voltages(vec![-65.0, -55.0]);
            run_params.spike_detection = None;

            let result = simulation::run(&network, &run_params).unwrap();
            let last_sample = result.trajectory.last_sample().unwrap();
            let layout = result.trajectory.layout();

            (last_sample[layout.voltage_idx(1)] - last_sample[layout.voltage_idx(0)]).abs()
        })
        .collect();

    for (weaker, stronger) in final_differences.iter().tuple_windows() {
        assert!(stronger < weaker, "{:?}", final_differences);
    }

    assert!(final_differences[3] < 0.01);
}

#[test]
fn runs_are_deterministic() {
    let params = make_ring_params(200.0, 0.025);

    let first = simulation::simulate(&params).unwrap();
    let second = simulation::simulate(&params).unwrap();

    assert_eq!(first.trajectory, second.trajectory);
    assert_eq!(first.spikes, second.spikes);
}

#[test]
fn spike_detection_is_restartable() {
    let params = make_ring_params(300.0, 0.025);
    let result = simulation::simulate(&params).unwrap();
    let detection_params = SpikeDetectionParams::default();

    let first = result.trajectory.detect_spikes(&detection_params);
    let second = result.trajectory.detect_spikes(&detection_params);

    assert_eq!(first, second);
    assert_eq!(Some(&first), result.spikes.as_ref());
    assert!(first.total_spike_count() > 0);

    let direct: Vec<f64> = spike_detection::spike_times(
        result.trajectory.times().zip(result.trajectory.voltage_trace(2)),
        &detection_params,
    )
    .collect();

    assert_eq!(direct, first.spike_times(2));
}

#[test]
fn refractory_merging() {
    let dt = 0.1;
    let params = SpikeDetectionParams {
        threshold: -20.0,
        refractory_period: 5.0,
    };

    // two brief excursions above threshold whose upward crossings lie `gap` ms apart
    let trace = |gap: f64| -> Vec<(f64, f64)> {
        (0..400)
            .map(|i| {
                let t = i as f64 * dt;
                let above = (t >= 10.05 && t < 10.55) || (t >= 10.05 + gap && t < 10.55 + gap);
                (t, if above { 0.0 } else { -60.0 })
            })
            .collect()
    };

    let merged: Vec<f64> = spike_detection::spike_times(trace(1.0), &params).collect();
    let separate: Vec<f64> = spike_detection::spike_times(trace(10.0), &params).collect();

    assert_eq!(merged.len(), 1);
    assert_eq!(separate.len(), 2);
    assert_approx_eq!(f64, separate[1] - separate[0], 10.0, epsilon = 1e-9);
}

#[test]
fn inhibitory_ring_fires_in_stable_rotation() {
    let params = make_ring_params(2000.0, 0.01);

    let ring = network::create_network(&params.network).unwrap();

    for neuron in ring.neurons() {
        let stimulus = neuron.stimulus();
        assert!(stimulus.pulses.is_empty() && stimulus.noise.is_none());
        assert_equal(
            (0..20).map(|k| neuron.injected_current(k as f64 * 100.0)),
            std::iter::repeat(stimulus.bias_current).take(20),
        );
    }

    let result = simulation::simulate(&params).unwrap();
    let spikes = result.spikes.unwrap();
    let t_settle = 500.0;

    let mut periods = Vec::new();

    for nid in 0..3 {
        let spike_times = late_spike_times(&spikes, nid, t_settle);
        assert!(spike_times.len() >= 10, "neuron {}: {:?}", nid, spike_times);

        let bursts = analysis::detect_bursts(&spike_times, 20.0);
        let stats = analysis::rhythm_stats(&bursts).unwrap();

        assert!(stats.period_mean > 50.0 && stats.period_mean < 300.0);
        assert!(stats.period_std_dev < 0.05 * stats.period_mean);

        for (a, b) in spike_times.iter().tuple_windows() {
            let isi = b - a;
            assert!((isi - stats.period_mean).abs() < 0.05 * stats.period_mean);
        }

        periods.push(stats.period_mean);
    }

    // all neurons share one period
    for period in &periods[1..] {
        assert_approx_eq!(f64, *period, periods[0], epsilon = 0.02 * periods[0]);
    }

    // neurons take turns: any three consecutive events involve three distinct neurons
    let events = spikes.events_after(t_settle);
    assert!(events.len() >= 30);

    for (a, b, c) in events.iter().tuple_windows() {
        assert!(a.nid != b.nid && b.nid != c.nid && a.nid != c.nid);
    }

    // inhibition delays each postsynaptic neuron by two thirds of a cycle
    let reference = analysis::detect_bursts(&late_spike_times(&spikes, 0, t_settle), 20.0);

    for (nid, expected_phase) in [(1, 2.0 / 3.0), (2, 1.0 / 3.0)] {
        let bursts = analysis::detect_bursts(&late_spike_times(&spikes, nid, t_settle), 20.0);
        let phases = analysis::onset_phases(&reference, &bursts);

        assert!(!phases.is_empty());

        for phase in phases {
            assert_approx_eq!(f64, phase, expected_phase, epsilon = 0.05);
        }
    }
}

#[test]
fn uncoupled_tonic_spiker_fires_fast() {
    let network = single_neuron_network(NeuronParams::tonic_spiker());
    let result = simulation::run(&network, &run_params(1000.0, 0.025)).unwrap();
    let spikes = result.spikes.unwrap();

    let rate = analysis::firing_rate(spikes.spike_times(0), 200.0, 1000.0);

    assert!(rate > 30.0 && rate < 60.0, "{}", rate);
}

#[test]
fn stg_neuron_bursts() {
    let network = single_neuron_network(NeuronParams::stg_burster());
    let result = simulation::run(&network, &run_params(3000.0, 0.05)).unwrap();
    let spikes = result.spikes.unwrap();

    let spike_times = late_spike_times(&spikes, 0, 1000.0);
    let bursts = analysis::detect_bursts(&spike_times, 100.0);

    assert!(bursts.len() >= 2, "{:?}", bursts);

    for burst in &bursts {
        assert!(burst.num_spikes >= 5, "{:?}", bursts);
    }

    let stats = analysis::rhythm_stats(&bursts).unwrap();
    assert!(stats.period_mean > 400.0 && stats.period_mean < 900.0);
    assert!(stats.duty_cycle_mean > 0.0 && stats.duty_cycle_mean < 1.0);

    let max_calcium = result
        .trajectory
        .calcium_trace(0)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(max_calcium > 0.05);
}

#[test]
fn out_of_range_synapse_rejected_before_stepping() {
    let mut params = make_ring_params(100.0, 0.01);
    params.network.connect(0, 5, SynapseKind::inhibitory(0.2));

    let network_result = network::create_network(&params.network);
    assert!(network_result.err().unwrap().is_configuration());

    match simulation::simulate(&params) {
        Err(Error::Configuration(err)) => assert!(err.as_str().contains("5")),
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn numerical_blow_up_aborts_run() {
    let mut neuron_params = NeuronParams::with_channels(vec![]);
    neuron_params.capacitance = 1e-3;
    neuron_params.leak.conductance = 10.0;
    neuron_params.initial_voltage = -40.0;

    let network = single_neuron_network(neuron_params);
    let result = simulation::run(&network, &run_params(100.0, 1.0));

    match result {
        Err(Error::Simulation {
            step,
            t,
            neuron_nids,
            ..
        }) => {
            assert!(step > 0);
            assert_approx_eq!(f64, t, step as f64);
            assert_equal(neuron_nids, [0]);
        }
        other => panic!("expected simulation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn sweep_matches_sequential_runs() {
    let sweep_params: Vec<SimulationParams> = [0.0, 0.1, 0.2]
        .iter()
        .map(|conductance| {
            let mut params = make_ring_params(150.0, 0.025);
            for synapse in &mut params.network.synapses {
                synapse.kind = SynapseKind::inhibitory(*conductance);
            }
            params
        })
        .collect();

    let results = sweep::run_sweep(&sweep_params, &TechnicalParams::default()).unwrap();
    let sequential: Vec<SimulationResult> = sweep_params
        .iter()
        .map(|params| simulation::simulate(params).unwrap())
        .collect();

    assert_eq!(results.len(), 3);

    for (result, expected) in results.into_iter().zip(sequential) {
        let result = result.unwrap();
        assert_eq!(result.trajectory, expected.trajectory);
        assert_eq!(result.spikes, expected.spikes);
    }
}

#[test]
fn euler_and_rk4_agree_on_resting_potential() {
    let network = single_neuron_network(NeuronParams::default());

    let mut params = run_params(500.0, 0.01);
    params.spike_detection = None;
    let rk4 = simulation::run(&network, &params).unwrap();

    params.method = IntegrationMethod::Euler;
    let euler = simulation::run(&network, &params).unwrap();

    let v_rk4 = rk4.trajectory.last_sample().unwrap()[0];
    let v_euler = euler.trajectory.last_sample().unwrap()[0];

    assert_approx_eq!(f64, v_rk4, v_euler, epsilon = 1e-6);
    assert_ne!(rk4.trajectory, euler.trajectory);
}

#[test]
fn stepping_can_be_cancelled() {
    let params = make_ring_params(1000.0, 0.025);
    let network = network::create_network(&params.network).unwrap();

    let mut sim = simulation::Simulation::new(&network, &params.run).unwrap();
    let step_budget = 400;

    while !sim.is_finished() && sim.step_index() < step_budget {
        sim.step().unwrap();
    }

    assert_eq!(sim.step_index(), step_budget);
    assert_approx_eq!(f64, sim.t(), 10.0, epsilon = 1e-9);
    assert_eq!(sim.trajectory().num_samples(), step_budget + 1);
    assert_eq!(sim.state(), sim.trajectory().last_sample().unwrap());
}

#[test]
fn snapshot_serializes_to_json() {
    let params = make_ring_params(50.0, 0.025);
    let result = simulation::simulate(&params).unwrap();
    let trajectory = &result.trajectory;

    let snapshot = trajectory.snapshot(trajectory.num_samples() - 1);
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: stg_net::state_snapshot::StateSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.neuron_states.len(), 3);
    assert_approx_eq!(
        f64,
        restored.neuron_states[2].voltage,
        snapshot.neuron_states[2].voltage,
        epsilon = 1e-12
    );
    assert_eq!(restored.synapse_states[1].post_syn_nid, 2);
    assert_eq!(snapshot.neuron_states[0].gates.len(), 3);
    assert!(snapshot
        .synapse_states
        .iter()
        .all(|synapse_state| synapse_state.activation.is_some()));
}
