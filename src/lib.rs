pub mod analysis;
pub mod channel;
pub mod error;
pub mod integrator;
pub mod network;
pub mod neuron;
pub mod params;
pub mod simulation;
pub mod spike_detection;
pub mod state_snapshot;
pub mod sweep;
pub mod synapse;
pub mod trajectory;

mod util;

pub use error::{Error, Result};
