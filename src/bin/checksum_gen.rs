use stg_net::simulation;

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    let params = scenario_params::get_scenario_params();
    let result = simulation::simulate(&params).unwrap();
    let trajectory = &result.trajectory;

    let voltage_checksum: f64 = (0..trajectory.num_neurons())
        .map(|nid| trajectory.voltage_trace(nid).sum::<f64>())
        .sum();

    let state_checksum: f64 = trajectory
        .samples()
        .enumerate()
        .map(|(sample_idx, sample)| sample_idx as f64 * sample.iter().sum::<f64>())
        .sum();

    let spikes = result.spikes.unwrap();
    let spike_checksum: f64 = spikes
        .events()
        .iter()
        .map(|event| (event.nid + 1) as f64 * event.t)
        .sum();

    println!("trajectory:");
    println!("...samples: {}", trajectory.num_samples());
    println!("...voltage checksum: {}", voltage_checksum);
    println!("...state checksum: {}", state_checksum);
    println!("spikes:");
    println!("...count: {}", spikes.total_spike_count());
    println!("...checksum: {}", spike_checksum);

    let last_sample_idx = trajectory.num_samples() - 1;
    let state_snapshot = trajectory.snapshot(last_sample_idx);

    println!("final state:");
    println!("{}", serde_json::to_string_pretty(&state_snapshot).unwrap());
}
