use std::time::Instant;

use stg_net::{analysis, network, simulation};

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    let params = scenario_params::get_scenario_params();
    let network = network::create_network(&params.network).unwrap();

    let wall_start = Instant::now();
    let result = simulation::run(&network, &params.run).unwrap();
    let wall_time = wall_start.elapsed();

    let num_steps = result.trajectory.num_samples() - 1;
    let step_throughput = num_steps as f64 / wall_time.as_secs_f64();

    eprintln!(
        "Integration throughput: {:.3e} steps per second ({:.3} µs per step, state length {})",
        step_throughput,
        1e6 / step_throughput,
        result.trajectory.state_len()
    );

    let spikes = result.spikes.unwrap();
    let t_settle = 0.25 * params.run.duration;

    for nid in 0..spikes.num_neurons() {
        let spike_times = spikes.spike_times(nid);
        let bursts = analysis::detect_bursts(spike_times, 20.0);

        eprintln!(
            "Neuron {}: {} spikes, {:.2} Hz after settling",
            nid,
            spike_times.len(),
            analysis::firing_rate(spike_times, t_settle, params.run.duration)
        );

        if let Some(stats) = analysis::rhythm_stats(&bursts) {
            eprintln!(
                "...period {:.2} ± {:.2} ms, duty cycle {:.3}, {:.2} spikes per burst",
                stats.period_mean,
                stats.period_std_dev,
                stats.duty_cycle_mean,
                stats.spikes_per_burst_mean
            );
        }
    }
}
