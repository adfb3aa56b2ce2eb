use std::sync::mpsc::channel as mpsc_channel;
use std::thread;

use core_affinity::CoreId;
use log::debug;
use simple_error::{try_with, SimpleError};

use crate::{
    error::Result,
    params::{self, SimulationParams, TechnicalParams},
    simulation::{self, SimulationResult},
    util,
};

/// Runs independent simulations on worker threads. Each worker takes a contiguous partition of
/// `sweep_params`; results are returned in input order.
///
/// The outer `Result` fails on invalid technical parameters, the inner ones carry the outcome of
/// each run.
pub fn run_sweep(
    sweep_params: &[SimulationParams],
    technical_params: &TechnicalParams,
) -> Result<Vec<Result<SimulationResult>>> {
    try_with!(
        params::validate_technical_params(technical_params),
        "invalid technical parameters"
    );

    if sweep_params.is_empty() {
        return Ok(Vec::new());
    }

    let num_threads = get_num_threads(technical_params).min(sweep_params.len());
    let (result_tx, result_rx) = mpsc_channel();
    let mut join_handles = Vec::with_capacity(num_threads);

    for thread_id in 0..num_threads {
        let range = util::get_partition_range(num_threads, thread_id, sweep_params.len());
        let partition = sweep_params[range.clone()].to_vec();
        let result_tx = result_tx.clone();
        let pin_threads = technical_params.pin_threads;

        debug!("sweep thread {} runs simulations {:?}", thread_id, range);

        join_handles.push(thread::spawn(move || {
            if pin_threads {
                let core_id = CoreId { id: thread_id };
                core_affinity::set_for_current(core_id);
            }

            for (offset, params) in partition.iter().enumerate() {
                let result = simulation::simulate(params);

                if result_tx.send((range.start + offset, result)).is_err() {
                    break;
                }
            }
        }));
    }

    drop(result_tx);

    let mut results: Vec<Option<Result<SimulationResult>>> =
        sweep_params.iter().map(|_| None).collect();

    for (idx, result) in result_rx {
        results[idx] = Some(result);
    }

    for join_handle in join_handles {
        if join_handle.join().is_err() {
            return Err(SimpleError::new("sweep worker thread panicked").into());
        }
    }

    results
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| SimpleError::new("sweep worker exited without reporting all results").into())
}

fn get_num_threads(technical_params: &TechnicalParams) -> usize {
    technical_params
        .num_threads
        .unwrap_or_else(num_cpus::get)
}
