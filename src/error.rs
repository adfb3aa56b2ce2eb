use simple_error::SimpleError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Invalid network, run or technical parameters. Raised before any integration step.
    #[error("configuration error: {0}")]
    Configuration(#[from] SimpleError),

    /// The integrator produced a non-finite state value.
    #[error(
        "simulation error at step {step} (t = {t} ms): non-finite value {value} \
         (neurons: {neuron_nids:?}, synapses: {synapse_ids:?})"
    )]
    Simulation {
        step: usize,
        t: f64,
        neuron_nids: Vec<usize>,
        synapse_ids: Vec<usize>,
        value: f64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_simulation(&self) -> bool {
        matches!(self, Error::Simulation { .. })
    }
}
